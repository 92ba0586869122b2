//! Domain types shared across the curation workspace.

mod embedding;
mod score;

use std::collections::HashMap;

use uuid::Uuid;

pub use embedding::{Embedding, Partition};
pub use score::{ResultSet, ScoreKind, ScoreRecord};

/// Scores keyed by inference embedding id. `None` marks an uncomputable score.
pub type ScoreMap = HashMap<Uuid, Option<f64>>;

/// A representative / difficult pair of outlier score maps.
///
/// An embedding scored into one side is null on the other side. Embeddings
/// that could not be scored at all are null on both.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutlierScores {
    pub representative: ScoreMap,
    pub difficult: ScoreMap,
}

impl OutlierScores {
    /// Every id null on both sides.
    pub fn all_null<'a>(ids: impl IntoIterator<Item = &'a Uuid>) -> Self {
        let mut scores = Self::default();
        for id in ids {
            scores.representative.insert(*id, None);
            scores.difficult.insert(*id, None);
        }
        scores
    }
}
