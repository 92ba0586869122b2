//! Background execution of curation runs.
//!
//! Scoring for a model space is triggered with [`TaskQueue::schedule`], which
//! returns immediately. Workers resolve the task through the
//! [`TaskRegistry`], retry transient failures per the [`RetryPolicy`] and
//! publish progress to a [`TaskStatusBackend`].
//!
//! ```rust,ignore
//! let registry = TaskRegistry::with_orchestrators(embeddings, index, results, config.scoring);
//! let queue = TaskQueue::start(&config.tasks, registry, Arc::new(InMemoryStatusBackend::new()))?;
//! let handle = queue.schedule("vision").await?;
//! assert!(matches!(handle.wait().await, TaskStatus::Succeeded { .. }));
//! ```

pub mod error;
pub mod locks;
pub mod queue;
pub mod registry;
pub mod retry;
pub mod status;

pub use error::{TaskError, TaskResult};
pub use locks::SpaceLocks;
pub use queue::{TaskHandle, TaskQueue};
pub use registry::{ScoringJob, TaskRegistry, SCORE_CLASS_OUTLIERS, SCORE_MODEL_SPACE};
pub use retry::RetryPolicy;
pub use status::{InMemoryStatusBackend, TaskStatus, TaskStatusBackend};
