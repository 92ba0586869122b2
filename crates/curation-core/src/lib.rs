//! Curation Core Library
//!
//! Statistical outlier and uncertainty scoring for active-learning data
//! curation: picks which unlabeled production embeddings are worth labeling
//! next.
//!
//! # Architecture
//!
//! This crate defines:
//! - Domain types (`Embedding`, `ScoreRecord`, `ResultSet`, ...)
//! - Collaborator traits (`EmbeddingStore`, `AnnIndex`, `ResultStore`, scorer capabilities)
//! - Per-category Gaussian fitting and guarded Mahalanobis scoring (`scoring`)
//! - The `SamplingOrchestrator`, which runs one scoring pass per model space
//!   and atomically swaps its live result set
//! - In-memory collaborator stubs, error types and configuration
//!
//! # Example
//!
//! ```
//! use curation_core::scoring::fit;
//!
//! let square = [[0.0f32, 0.0], [2.0, 0.0], [0.0, 2.0], [2.0, 2.0], [1.0, 1.0]];
//! let rows: Vec<&[f32]> = square.iter().map(|r| r.as_slice()).collect();
//! let model = fit("B", &rows).unwrap();
//! assert_eq!(model.distance(model.mean()), Some(0.0));
//! ```

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod scoring;
pub mod stubs;
pub mod traits;
pub mod types;

// Re-exports for convenience
pub use config::Config;
pub use error::{CoreError, CoreResult};
pub use orchestrator::{RunMode, RunReport, RunState, SamplingOrchestrator, ScorerSet};
pub use types::{Embedding, Partition, ResultSet, ScoreKind, ScoreRecord};
