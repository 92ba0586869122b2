//! HNSW approximate nearest-neighbour index using hnsw_rs.
//!
//! One L2 graph is built per model space from its training partition when the
//! space is loaded, and dropped again on release. Graph node ids are positions
//! in the space's id table.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use hnsw_rs::hnsw::Hnsw;
use hnsw_rs::prelude::*;
use parking_lot::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use curation_core::config::IndexConfig;
use curation_core::traits::{AnnIndex, EmbeddingStore};
use curation_core::types::{Embedding, Partition};
use curation_core::{CoreError, CoreResult};

/// Maximum graph layers, as recommended by hnsw_rs.
const MAX_LAYER: usize = 16;

struct SpaceGraph {
    hnsw: Hnsw<'static, f32, DistL2>,
    ids: Vec<Uuid>,
    dimension: usize,
}

impl SpaceGraph {
    fn build(model_space: &str, training: Vec<Embedding>, config: &IndexConfig) -> Self {
        let dimension = training.first().map_or(0, Embedding::dimension);
        let hnsw = Hnsw::<f32, DistL2>::new(
            config.m,
            training.len().max(1),
            MAX_LAYER,
            config.ef_construction,
            DistL2 {},
        );

        let mut ids = Vec::with_capacity(training.len());
        for e in training {
            if e.dimension() != dimension {
                warn!(
                    model_space,
                    embedding_id = %e.id,
                    expected = dimension,
                    actual = e.dimension(),
                    "Skipping training embedding with mismatched dimension"
                );
                continue;
            }
            hnsw.insert_slice((e.vector.as_slice(), ids.len()));
            ids.push(e.id);
        }

        Self {
            hnsw,
            ids,
            dimension,
        }
    }
}

/// [`AnnIndex`] backed by one in-memory HNSW graph per loaded model space.
pub struct HnswAnnIndex {
    store: Arc<dyn EmbeddingStore>,
    config: IndexConfig,
    graphs: RwLock<HashMap<String, Arc<SpaceGraph>>>,
}

impl HnswAnnIndex {
    pub fn new(store: Arc<dyn EmbeddingStore>, config: IndexConfig) -> Self {
        Self {
            store,
            config,
            graphs: RwLock::new(HashMap::new()),
        }
    }

    /// Number of vectors in the loaded graph of a model space.
    pub fn indexed_count(&self, model_space: &str) -> Option<usize> {
        self.graphs.read().get(model_space).map(|g| g.ids.len())
    }
}

#[async_trait]
impl AnnIndex for HnswAnnIndex {
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

        let space = model_space.to_string();
        let config = self.config.clone();
        let graph = tokio::task::spawn_blocking(move || SpaceGraph::build(&space, training, &config))
            .await
            .map_err(|e| CoreError::IndexUnavailable(format!("HNSW build task failed: {}", e)))?;

        info!(
            model_space,
            vectors = graph.ids.len(),
            dimension = graph.dimension,
            m = self.config.m,
            ef_construction = self.config.ef_construction,
            "Built HNSW index"
        );
        self.graphs
            .write()
            .entry(model_space.to_string())
            .or_insert_with(|| Arc::new(graph));
        Ok(())
    }

    async fn search(
        &self,
        model_space: &str,
        query: &[f32],
        k: usize,
    ) -> CoreResult<Vec<(Uuid, f32)>> {
        let graph = self
            .graphs
            .read()
            .get(model_space)
            .cloned()
            .ok_or_else(|| {
                CoreError::IndexUnavailable(format!("HNSW index for {} is not loaded", model_space))
            })?;

        if graph.ids.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != graph.dimension {
            return Err(CoreError::DimensionMismatch {
                expected: graph.dimension,
                actual: query.len(),
            });
        }

        let ef = self.config.ef_search.max(k);
        let mut hits: Vec<(Uuid, f32)> = graph
            .hnsw
            .search(query, k, ef)
            .into_iter()
            .filter_map(|n| graph.ids.get(n.d_id).map(|id| (*id, n.distance)))
            .collect();
        hits.sort_by(|a, b| a.1.total_cmp(&b.1));
        hits.truncate(k);
        Ok(hits)
    }

    fn is_loaded(&self, model_space: &str) -> bool {
        self.graphs.read().contains_key(model_space)
    }

    fn release(&self, model_space: &str) {
        if self.graphs.write().remove(model_space).is_some() {
            debug!(model_space, "Released HNSW index");
        }
    }
}
