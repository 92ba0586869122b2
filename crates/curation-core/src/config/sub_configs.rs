//! Sub-configuration structures for curation components.
//!
//! Every field carries a serde default so partial TOML files and
//! environment overrides only need to name what they change.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::scoring::SplitPolicy;

/// Logging configuration consumed by the worker binary.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// "pretty" or "compact".
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub include_location: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            include_location: false,
        }
    }
}

impl LoggingConfig {
    pub fn validate(&self) -> CoreResult<()> {
        match self.format.to_lowercase().as_str() {
            "pretty" | "compact" => Ok(()),
            other => Err(CoreError::ConfigError(format!(
                "logging.format must be 'pretty' or 'compact', got '{}'",
                other
            ))),
        }
    }
}

/// Embedding / result store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// "memory" or "rocksdb"
    #[serde(default = "default_storage_backend")]
    pub backend: String,
    #[serde(default = "default_storage_path")]
    pub path: String,
}

fn default_storage_backend() -> String {
    "memory".to_string()
}

fn default_storage_path() -> String {
    "./data/curation".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            path: default_storage_path(),
        }
    }
}

/// ANN index configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexConfig {
    /// "memory" (brute force) or "hnsw"
    #[serde(default = "default_index_backend")]
    pub backend: String,
    /// HNSW max connections per node
    #[serde(default = "default_m")]
    pub m: usize,
    #[serde(default = "default_ef_construction")]
    pub ef_construction: usize,
    #[serde(default = "default_ef_search")]
    pub ef_search: usize,
}

fn default_index_backend() -> String {
    "memory".to_string()
}

fn default_m() -> usize {
    16
}

fn default_ef_construction() -> usize {
    200
}

fn default_ef_search() -> usize {
    64
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            backend: default_index_backend(),
            m: default_m(),
            ef_construction: default_ef_construction(),
            ef_search: default_ef_search(),
        }
    }
}

impl IndexConfig {
    pub fn validate(&self) -> CoreResult<()> {
        match self.backend.as_str() {
            "memory" | "hnsw" => {}
            other => {
                return Err(CoreError::ConfigError(format!(
                    "index.backend must be 'memory' or 'hnsw', got '{}'",
                    other
                )));
            }
        }
        if self.m == 0 || self.ef_construction == 0 || self.ef_search == 0 {
            return Err(CoreError::ConfigError(
                "index.m, index.ef_construction and index.ef_search must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Scoring run configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScoringConfig {
    /// Size of the random baseline control group.
    #[serde(default = "default_n_random_samples")]
    pub n_random_samples: usize,

    /// Seed for the random baseline and k-means seeding; `None` draws from OS entropy.
    #[serde(default)]
    pub random_seed: Option<u64>,

    /// Representative / difficult rule for class outliers.
    #[serde(default)]
    pub class_split: SplitPolicy,

    /// Representative / difficult rule for cluster outliers.
    #[serde(default)]
    pub cluster_split: SplitPolicy,

    #[serde(default = "default_cluster_count")]
    pub cluster_count: usize,

    #[serde(default = "default_cluster_max_iterations")]
    pub cluster_max_iterations: usize,

    /// Neighbours consulted by the boundary-uncertainty scorer.
    #[serde(default = "default_boundary_neighbors")]
    pub boundary_neighbors: usize,

    /// Fit categories and score embeddings with rayon.
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

fn default_n_random_samples() -> usize {
    10
}

fn default_cluster_count() -> usize {
    8
}

fn default_cluster_max_iterations() -> usize {
    50
}

fn default_boundary_neighbors() -> usize {
    10
}

fn default_parallel() -> bool {
    true
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            n_random_samples: default_n_random_samples(),
            random_seed: None,
            class_split: SplitPolicy::default(),
            cluster_split: SplitPolicy::default(),
            cluster_count: default_cluster_count(),
            cluster_max_iterations: default_cluster_max_iterations(),
            boundary_neighbors: default_boundary_neighbors(),
            parallel: default_parallel(),
        }
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> CoreResult<()> {
        self.class_split.validate("scoring.class_split")?;
        self.cluster_split.validate("scoring.cluster_split")?;

        if self.cluster_count == 0 {
            return Err(CoreError::ConfigError(
                "scoring.cluster_count must be > 0".to_string(),
            ));
        }
        if self.cluster_max_iterations == 0 {
            return Err(CoreError::ConfigError(
                "scoring.cluster_max_iterations must be > 0".to_string(),
            ));
        }
        if self.boundary_neighbors == 0 {
            return Err(CoreError::ConfigError(
                "scoring.boundary_neighbors must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Task queue configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TasksConfig {
    /// Broker location. Only the in-process `memory://` broker ships with this workspace.
    #[serde(default = "default_memory_url")]
    pub broker_url: String,

    /// Task status backend location.
    #[serde(default = "default_memory_url")]
    pub result_backend_url: String,

    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Retries after the first attempt, transient failures only.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

fn default_memory_url() -> String {
    "memory://local".to_string()
}

fn default_worker_count() -> usize {
    4
}

fn default_queue_capacity() -> usize {
    256
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            broker_url: default_memory_url(),
            result_backend_url: default_memory_url(),
            worker_count: default_worker_count(),
            queue_capacity: default_queue_capacity(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl TasksConfig {
    /// Validate the task configuration.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::ConfigError` when a URL scheme is not `memory`,
    /// or when `worker_count` / `queue_capacity` is zero.
    pub fn validate(&self) -> CoreResult<()> {
        for (field, url) in [
            ("tasks.broker_url", &self.broker_url),
            ("tasks.result_backend_url", &self.result_backend_url),
        ] {
            let scheme = url.split("://").next().unwrap_or_default();
            if scheme != "memory" || !url.contains("://") {
                return Err(CoreError::ConfigError(format!(
                    "{} must use the memory:// scheme, got '{}'",
                    field, url
                )));
            }
        }

        if self.worker_count == 0 {
            return Err(CoreError::ConfigError(
                "tasks.worker_count must be > 0".to_string(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(CoreError::ConfigError(
                "tasks.queue_capacity must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}
