//! In-memory embedding store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{CoreError, CoreResult};
use crate::traits::EmbeddingStore;
use crate::types::{Embedding, Partition};

/// Embeddings grouped by model space, kept in insertion order.
///
/// Clones share storage. `fail_next_fetches` injects transient
/// `StoreUnavailable` failures for exercising retry paths.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEmbeddingStore {
    spaces: Arc<RwLock<HashMap<String, Vec<Embedding>>>>,
    failures_pending: Arc<AtomicUsize>,
    fetch_calls: Arc<AtomicUsize>,
}

impl InMemoryEmbeddingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append embeddings, each under its own `model_space`.
    pub async fn insert(&self, embeddings: impl IntoIterator<Item = Embedding>) {
        let mut spaces = self.spaces.write().await;
        for e in embeddings {
            spaces.entry(e.model_space.clone()).or_default().push(e);
        }
    }

    /// Drop every embedding of one partition in a model space.
    pub async fn clear_partition(&self, model_space: &str, partition: &Partition) {
        if let Some(rows) = self.spaces.write().await.get_mut(model_space) {
            rows.retain(|e| &e.partition != partition);
        }
    }

    /// Make the next `n` fetches fail with `CoreError::StoreUnavailable`.
    pub fn fail_next_fetches(&self, n: usize) {
        self.failures_pending.store(n, Ordering::SeqCst);
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingStore for InMemoryEmbeddingStore {
    async fn fetch(&self, model_space: &str, partition: &Partition) -> CoreResult<Vec<Embedding>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let injected = self
            .failures_pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(CoreError::StoreUnavailable(format!(
                "injected failure fetching {}/{}",
                model_space, partition
            )));
        }

        let spaces = self.spaces.read().await;
        let rows = spaces
            .get(model_space)
            .ok_or_else(|| CoreError::MissingModelSpace {
                model_space: model_space.to_string(),
            })?;
        let fetched: Vec<Embedding> = rows
            .iter()
            .filter(|e| &e.partition == partition)
            .cloned()
            .collect();
        debug!(model_space, %partition, count = fetched.len(), "Fetched embeddings");
        Ok(fetched)
    }

    async fn model_spaces(&self) -> CoreResult<Vec<String>> {
        let mut names: Vec<String> = self.spaces.read().await.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_filters_partition_in_order() {
        let store = InMemoryEmbeddingStore::new();
        let a = Embedding::training("m", "x", vec![1.0]);
        let b = Embedding::inference("m", vec![2.0]);
        let c = Embedding::training("m", "y", vec![3.0]);
        store.insert([a.clone(), b.clone(), c.clone()]).await;

        let training = store.fetch("m", &Partition::Training).await.unwrap();
        assert_eq!(training.iter().map(|e| e.id).collect::<Vec<_>>(), vec![a.id, c.id]);
        let inference = store.fetch("m", &Partition::Inference).await.unwrap();
        assert_eq!(inference.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_space_is_missing() {
        let store = InMemoryEmbeddingStore::new();
        let err = store.fetch("nope", &Partition::Training).await.unwrap_err();
        assert!(matches!(err, CoreError::MissingModelSpace { .. }));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_injected_failures_are_transient_and_finite() {
        let store = InMemoryEmbeddingStore::new();
        store.insert([Embedding::training("m", "x", vec![1.0])]).await;
        store.fail_next_fetches(2);

        assert!(store.fetch("m", &Partition::Training).await.unwrap_err().is_transient());
        assert!(store.fetch("m", &Partition::Training).await.unwrap_err().is_transient());
        assert_eq!(store.fetch("m", &Partition::Training).await.unwrap().len(), 1);
        assert_eq!(store.fetch_calls(), 3);
    }
}
