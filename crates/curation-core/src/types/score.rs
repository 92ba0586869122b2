//! Score records and the per-model-space result set.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The score columns persisted for every inference embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreKind {
    ActivationUncertainty,
    BoundaryUncertainty,
    RepresentativeClassOutlier,
    DifficultClassOutlier,
    RepresentativeClusterOutlier,
    DifficultClusterOutlier,
}

impl ScoreKind {
    pub const ALL: [ScoreKind; 6] = [
        ScoreKind::ActivationUncertainty,
        ScoreKind::BoundaryUncertainty,
        ScoreKind::RepresentativeClassOutlier,
        ScoreKind::DifficultClassOutlier,
        ScoreKind::RepresentativeClusterOutlier,
        ScoreKind::DifficultClusterOutlier,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreKind::ActivationUncertainty => "activation_uncertainty",
            ScoreKind::BoundaryUncertainty => "boundary_uncertainty",
            ScoreKind::RepresentativeClassOutlier => "representative_class_outlier",
            ScoreKind::DifficultClassOutlier => "difficult_class_outlier",
            ScoreKind::RepresentativeClusterOutlier => "representative_cluster_outlier",
            ScoreKind::DifficultClusterOutlier => "difficult_cluster_outlier",
        }
    }
}

/// Scores for one inference embedding.
///
/// `None` means no score could be computed, which is not the same as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub embedding_id: Uuid,
    pub scores: BTreeMap<ScoreKind, Option<f64>>,
    pub random_selection: bool,
}

impl ScoreRecord {
    /// Record with every score kind present and null.
    pub fn empty(embedding_id: Uuid) -> Self {
        Self {
            embedding_id,
            scores: ScoreKind::ALL.iter().map(|k| (*k, None)).collect(),
            random_selection: false,
        }
    }

    pub fn get(&self, kind: ScoreKind) -> Option<f64> {
        self.scores.get(&kind).copied().flatten()
    }

    pub fn set(&mut self, kind: ScoreKind, value: Option<f64>) {
        self.scores.insert(kind, value);
    }
}

/// Every score record produced by one orchestrator run for one model space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    pub model_space: String,
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub records: Vec<ScoreRecord>,
}

impl ResultSet {
    pub fn new(model_space: impl Into<String>, records: Vec<ScoreRecord>) -> Self {
        Self {
            model_space: model_space.into(),
            run_id: Uuid::new_v4(),
            created_at: Utc::now(),
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn record(&self, embedding_id: Uuid) -> Option<&ScoreRecord> {
        self.records.iter().find(|r| r.embedding_id == embedding_id)
    }

    pub fn random_selection_count(&self) -> usize {
        self.records.iter().filter(|r| r.random_selection).count()
    }

    /// Score values keyed by embedding id, ignoring run identity.
    ///
    /// Two runs over unchanged inputs with a fixed seed compare equal here.
    pub fn score_table(&self) -> BTreeMap<Uuid, (BTreeMap<ScoreKind, Option<f64>>, bool)> {
        self.records
            .iter()
            .map(|r| (r.embedding_id, (r.scores.clone(), r.random_selection)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_record_has_all_kinds_null() {
        let r = ScoreRecord::empty(Uuid::new_v4());
        assert_eq!(r.scores.len(), 6);
        for kind in ScoreKind::ALL {
            assert_eq!(r.get(kind), None);
        }
        assert!(!r.random_selection);
    }

    #[test]
    fn test_score_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ScoreKind::DifficultClassOutlier).unwrap();
        assert_eq!(json, "\"difficult_class_outlier\"");
        assert_eq!(ScoreKind::DifficultClassOutlier.as_str(), "difficult_class_outlier");
    }

    #[test]
    fn test_score_table_ignores_run_identity() {
        let id = Uuid::new_v4();
        let mut record = ScoreRecord::empty(id);
        record.set(ScoreKind::ActivationUncertainty, Some(0.3));

        let a = ResultSet::new("m", vec![record.clone()]);
        let b = ResultSet::new("m", vec![record]);
        assert_ne!(a.run_id, b.run_id);
        assert_eq!(a.score_table(), b.score_table());
    }
}
