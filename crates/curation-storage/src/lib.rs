//! Persistent backends for the curation engine.
//!
//! - [`RocksDbEmbeddingStore`]: embeddings per model space and partition
//! - [`RocksDbResultStore`]: live result set per model space, swapped in one
//!   write batch
//! - [`HnswAnnIndex`]: per-space HNSW graph over the training partition
//!
//! Both stores share one [`CurationDb`]:
//!
//! ```rust,ignore
//! let db = Arc::new(CurationDb::open("./data/curation")?);
//! let embeddings = RocksDbEmbeddingStore::new(db.clone());
//! let results = RocksDbResultStore::new(db);
//! ```

pub mod column_families;
pub mod db;
pub mod embedding_store;
pub mod error;
pub mod hnsw_index;
pub mod result_store;
pub mod schema;
pub mod serialization;

pub use db::{CurationDb, CurationDbConfig};
pub use embedding_store::RocksDbEmbeddingStore;
pub use error::{StorageError, StorageResult};
pub use hnsw_index::HnswAnnIndex;
pub use result_store::RocksDbResultStore;
