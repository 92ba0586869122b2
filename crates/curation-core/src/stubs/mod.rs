//! In-memory collaborator implementations.
//!
//! Back the `memory` storage and index backends, and the test suites.

mod ann_index;
mod embedding_store;
mod result_store;

pub use ann_index::InMemoryAnnIndex;
pub use embedding_store::InMemoryEmbeddingStore;
pub use result_store::InMemoryResultStore;
