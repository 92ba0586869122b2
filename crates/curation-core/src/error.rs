//! Error types for curation-core.
//!
//! Only run-level and transient failures are errors. Category-level skips
//! (`SkipReason`) and embedding-level null distances are values that flow
//! through the scoring pipeline and show up as diagnostics.

use thiserror::Error;

/// Top-level error type for curation-core.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The model space has no training-partition embeddings to fit against.
    #[error("Empty training set for model space '{model_space}'")]
    EmptyTrainingSet { model_space: String },

    /// The model space is not known to the embedding store.
    #[error("Model space not found: '{model_space}'")]
    MissingModelSpace { model_space: String },

    /// The embedding or result store could not be reached (retryable).
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// The ANN index could not be loaded or queried (retryable).
    #[error("Index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("Invalid embedding dimension: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Validation error: {field} - {message}")]
    ValidationError { field: String, message: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Whether a retry of the same unit of work may succeed.
    ///
    /// Only collaborator outages are transient. Structural failures such as
    /// an empty training set fail the same way on every attempt.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CoreError::StoreUnavailable(_) | CoreError::IndexUnavailable(_)
        )
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        CoreError::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::SerializationError(err.to_string())
    }
}

impl From<config::ConfigError> for CoreError {
    fn from(err: config::ConfigError) -> Self {
        CoreError::ConfigError(err.to_string())
    }
}

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
