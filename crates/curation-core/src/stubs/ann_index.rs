//! Brute-force ANN index over training embeddings.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::traits::{AnnIndex, EmbeddingStore};
use crate::types::Partition;

type Rows = Arc<Vec<(Uuid, Vec<f32>)>>;

/// Exact L2 nearest-neighbour search with linear scan.
///
/// `load` pulls the training partition from the backing store. Suitable for
/// tests and small model spaces.
pub struct InMemoryAnnIndex {
    store: Arc<dyn EmbeddingStore>,
    loaded: RwLock<HashMap<String, Rows>>,
    loads: AtomicUsize,
    releases: AtomicUsize,
}

impl InMemoryAnnIndex {
    pub fn new(store: Arc<dyn EmbeddingStore>) -> Self {
        Self {
            store,
            loaded: RwLock::new(HashMap::new()),
            loads: AtomicUsize::new(0),
            releases: AtomicUsize::new(0),
        }
    }

    /// Number of loads that actually built an index.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn release_count(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
    }
}

#[async_trait]
impl AnnIndex for InMemoryAnnIndex {
    async fn load(&self, model_space: &str) -> CoreResult<()> {
        if self.is_loaded(model_space) {
            return Ok(());
        }
        let training = self
            .store
            .fetch(model_space, &Partition::Training)
            .await
            .map_err(|e| match e {
                CoreError::StoreUnavailable(msg) => CoreError::IndexUnavailable(msg),
                other => other,
            })?;
        let rows: Rows = Arc::new(training.into_iter().map(|e| (e.id, e.vector)).collect());

        info!(model_space, vectors = rows.len(), "Loaded brute-force index");
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.loaded.write().insert(model_space.to_string(), rows);
        Ok(())
    }

    async fn search(
        &self,
        model_space: &str,
        query: &[f32],
        k: usize,
    ) -> CoreResult<Vec<(Uuid, f32)>> {
        let rows = self
            .loaded
            .read()
            .get(model_space)
            .cloned()
            .ok_or_else(|| {
                CoreError::IndexUnavailable(format!("index for {} is not loaded", model_space))
            })?;

        if let Some((_, first)) = rows.first() {
            if first.len() != query.len() {
                return Err(CoreError::DimensionMismatch {
                    expected: first.len(),
                    actual: query.len(),
                });
            }
        }

        let mut hits: Vec<(Uuid, f32)> = rows
            .iter()
            .map(|(id, v)| (*id, Self::squared_l2(v, query).sqrt()))
            .collect();
        hits.sort_by(|a, b| a.1.total_cmp(&b.1));
        hits.truncate(k);
        Ok(hits)
    }

    fn is_loaded(&self, model_space: &str) -> bool {
        self.loaded.read().contains_key(model_space)
    }

    fn release(&self, model_space: &str) {
        if self.loaded.write().remove(model_space).is_some() {
            self.releases.fetch_add(1, Ordering::SeqCst);
            debug!(model_space, "Released brute-force index");
        }
    }
}
