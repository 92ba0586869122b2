//! Core trait definitions for the curation engine.

mod ann_index;
mod embedding_store;
mod result_store;
mod scorer;

pub use ann_index::AnnIndex;
pub use embedding_store::EmbeddingStore;
pub use result_store::ResultStore;
pub use scorer::{ActivationUncertaintyScorer, BoundaryUncertaintyScorer, ClusterOutlierScorer};
