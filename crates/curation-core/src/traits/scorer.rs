//! Scorer capabilities invoked by the sampling orchestrator.
//!
//! The orchestrator treats each scorer as opaque. An `Err` from one of them
//! nulls that score kind for the run and leaves every other kind intact.

use async_trait::async_trait;

use crate::error::CoreResult;
use crate::traits::AnnIndex;
use crate::types::{Embedding, OutlierScores, ScoreMap};

/// Per-embedding uncertainty from the model's own output activations.
#[async_trait]
pub trait ActivationUncertaintyScorer: Send + Sync {
    async fn score(&self, inference: &[Embedding]) -> CoreResult<ScoreMap>;
}

/// Per-embedding uncertainty about which side of a class boundary it lies on.
///
/// Consumes the ANN index, which the orchestrator has loaded for `model_space`.
#[async_trait]
pub trait BoundaryUncertaintyScorer: Send + Sync {
    async fn score(
        &self,
        model_space: &str,
        index: &dyn AnnIndex,
        training: &[Embedding],
        inference: &[Embedding],
    ) -> CoreResult<ScoreMap>;
}

/// Outlier scores relative to unsupervised clusters of the embedding space.
#[async_trait]
pub trait ClusterOutlierScorer: Send + Sync {
    async fn score(&self, training: &[Embedding], inference: &[Embedding]) -> CoreResult<OutlierScores>;
}
