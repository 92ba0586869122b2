//! Approximate nearest-neighbour index trait.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::CoreResult;

/// ANN index over the training partition of each model space.
///
/// Abstracts over HNSW or brute-force implementations.
#[async_trait]
pub trait AnnIndex: Send + Sync {
    /// Build or pull the index for a model space. Idempotent.
    async fn load(&self, model_space: &str) -> CoreResult<()>;

    /// Nearest training neighbours of `query`.
    ///
    /// Returns (embedding_id, distance) pairs, nearest first.
    ///
    /// # Errors
    ///
    /// `CoreError::IndexUnavailable` if `load` has not succeeded for the space.
    async fn search(&self, model_space: &str, query: &[f32], k: usize)
        -> CoreResult<Vec<(Uuid, f32)>>;

    fn is_loaded(&self, model_space: &str) -> bool;

    /// Drop whatever `load` acquired for the space.
    fn release(&self, model_space: &str);
}
