//! Embedding store trait (read side of the ingestion path).

use async_trait::async_trait;

use crate::error::CoreResult;
use crate::types::{Embedding, Partition};

/// Read-only access to stored embeddings, namespaced by model space.
///
/// # Example
///
/// ```rust,ignore
/// use curation_core::traits::EmbeddingStore;
/// use curation_core::types::Partition;
///
/// let training = store.fetch("vision", &Partition::Training).await?;
/// ```
#[async_trait]
pub trait EmbeddingStore: Send + Sync {
    /// Fetch every embedding of one partition in insertion order.
    ///
    /// # Errors
    ///
    /// - `CoreError::MissingModelSpace` if the model space has never been ingested
    /// - `CoreError::StoreUnavailable` if the backend cannot be reached
    async fn fetch(&self, model_space: &str, partition: &Partition) -> CoreResult<Vec<Embedding>>;

    /// List known model spaces.
    async fn model_spaces(&self) -> CoreResult<Vec<String>>;
}
