//! In-memory result store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::CoreResult;
use crate::traits::ResultStore;
use crate::types::ResultSet;

/// One live `ResultSet` per model space, swapped under a single write lock.
#[derive(Debug, Clone, Default)]
pub struct InMemoryResultStore {
    live: Arc<RwLock<HashMap<String, ResultSet>>>,
}

impl InMemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn model_spaces(&self) -> Vec<String> {
        let mut names: Vec<String> = self.live.read().await.keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl ResultStore for InMemoryResultStore {
    async fn replace_results(&self, result_set: ResultSet) -> CoreResult<()> {
        let mut live = self.live.write().await;
        let previous = live.insert(result_set.model_space.clone(), result_set);
        debug!(
            superseded = ?previous.as_ref().map(|p| p.run_id),
            "Result set swapped"
        );
        Ok(())
    }

    async fn delete_results(&self, model_space: &str) -> CoreResult<usize> {
        Ok(self
            .live
            .write()
            .await
            .remove(model_space)
            .map(|set| set.len())
            .unwrap_or(0))
    }

    async fn current_results(&self, model_space: &str) -> CoreResult<Option<ResultSet>> {
        Ok(self.live.read().await.get(model_space).cloned())
    }
}
