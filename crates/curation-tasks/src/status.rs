//! Task status tracking.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Lifecycle of one scheduled task.
///
/// ```text
/// Pending -> Running{1} -> Retrying{1} -> Running{2} -> ... -> Succeeded | Failed
/// Pending -> Cancelled
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    Running { attempt: u32 },
    Retrying { attempt: u32, error: String },
    Succeeded { run_id: Uuid },
    Failed { error: String },
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Succeeded { .. } | TaskStatus::Failed { .. } | TaskStatus::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::Running { .. } => "RUNNING",
            TaskStatus::Retrying { .. } => "RETRYING",
            TaskStatus::Succeeded { .. } => "SUCCEEDED",
            TaskStatus::Failed { .. } => "FAILED",
            TaskStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where workers publish task status for out-of-band observers.
#[async_trait]
pub trait TaskStatusBackend: Send + Sync {
    async fn set(&self, task_id: Uuid, status: TaskStatus);

    async fn get(&self, task_id: Uuid) -> Option<TaskStatus>;
}

/// Status backend for `memory://` result backend URLs.
///
/// Keeps every transition, not just the latest.
#[derive(Clone, Default)]
pub struct InMemoryStatusBackend {
    history: Arc<RwLock<HashMap<Uuid, Vec<TaskStatus>>>>,
}

impl InMemoryStatusBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every status a task has passed through, oldest first.
    pub async fn history(&self, task_id: Uuid) -> Vec<TaskStatus> {
        self.history
            .read()
            .await
            .get(&task_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl TaskStatusBackend for InMemoryStatusBackend {
    async fn set(&self, task_id: Uuid, status: TaskStatus) {
        self.history
            .write()
            .await
            .entry(task_id)
            .or_default()
            .push(status);
    }

    async fn get(&self, task_id: Uuid) -> Option<TaskStatus> {
        self.history
            .read()
            .await
            .get(&task_id)
            .and_then(|h| h.last().cloned())
    }
}
