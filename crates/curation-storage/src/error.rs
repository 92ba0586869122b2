//! Storage error types.
//!
//! Every error carries the operation and column family involved so a failed
//! run can be diagnosed from the log line alone.

use curation_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("RocksDB {operation} failed on CF '{cf}' with key '{key:?}': {source}")]
    RocksDbOperation {
        operation: &'static str,
        cf: &'static str,
        key: Option<String>,
        #[source]
        source: rocksdb::Error,
    },

    #[error("Failed to open RocksDB at '{path}': {message}")]
    OpenFailed { path: String, message: String },

    #[error("Column family '{name}' not found in database")]
    ColumnFamilyNotFound { name: String },

    #[error("Serialization error for {type_name}: {message}")]
    Serialization {
        type_name: &'static str,
        message: String,
    },

    #[error("Deserialization error for key '{key}' in CF '{cf}': {message}")]
    Deserialization {
        cf: &'static str,
        key: String,
        message: String,
    },

    #[error("Version mismatch in CF '{cf}': expected {expected}, got {actual}")]
    VersionMismatch {
        cf: &'static str,
        expected: u8,
        actual: u8,
    },

    #[error("Invalid key component '{value}': {reason}")]
    InvalidKey { value: String, reason: &'static str },

    #[error("Blocking storage task failed: {0}")]
    TaskJoin(String),
}

impl StorageError {
    pub fn rocksdb_op(
        operation: &'static str,
        cf: &'static str,
        key: Option<&str>,
        source: rocksdb::Error,
    ) -> Self {
        Self::RocksDbOperation {
            operation,
            cf,
            key: key.map(str::to_string),
            source,
        }
    }
}

/// Encoding problems are structural and map to `SerializationError`; every
/// other storage failure is an outage the task layer may retry.
impl From<StorageError> for CoreError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::Serialization { .. }
            | StorageError::Deserialization { .. }
            | StorageError::VersionMismatch { .. } => CoreError::SerializationError(e.to_string()),
            StorageError::InvalidKey { .. } => CoreError::validation("model_space", e.to_string()),
            other => CoreError::StoreUnavailable(other.to_string()),
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;
