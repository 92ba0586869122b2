//! Scoped ANN index handle.

use std::sync::Arc;

use tracing::debug;

use crate::error::CoreResult;
use crate::traits::AnnIndex;

/// Loads a model space's index on acquire and releases it on drop, whether
/// the run holding it succeeded, failed, or was cancelled mid-await.
///
/// Assumes runs for one model space are serialized; a concurrent run for the
/// same space would have its index released underneath it.
pub struct IndexLease {
    index: Arc<dyn AnnIndex>,
    model_space: String,
}

impl IndexLease {
    pub async fn acquire(index: Arc<dyn AnnIndex>, model_space: &str) -> CoreResult<Self> {
        // Construct the guard first so a load that fails half-way is still released.
        let lease = Self {
            index,
            model_space: model_space.to_string(),
        };
        lease.index.load(model_space).await?;
        debug!(model_space, "Index lease acquired");
        Ok(lease)
    }

    pub fn index(&self) -> &dyn AnnIndex {
        self.index.as_ref()
    }

    pub fn model_space(&self) -> &str {
        &self.model_space
    }
}

impl Drop for IndexLease {
    fn drop(&mut self) {
        self.index.release(&self.model_space);
        debug!(model_space = %self.model_space, "Index lease released");
    }
}
