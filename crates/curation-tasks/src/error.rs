//! Task layer errors.

use curation_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Unknown task '{0}'")]
    UnknownTask(String),

    #[error("Task queue is shut down")]
    QueueClosed,
}

pub type TaskResult<T> = Result<T, TaskError>;

impl TaskError {
    pub fn is_transient(&self) -> bool {
        matches!(self, TaskError::Core(e) if e.is_transient())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_follows_core_error() {
        assert!(TaskError::from(CoreError::StoreUnavailable("down".into())).is_transient());
        assert!(!TaskError::from(CoreError::EmptyTrainingSet {
            model_space: "m".into()
        })
        .is_transient());
        assert!(!TaskError::QueueClosed.is_transient());
    }
}
