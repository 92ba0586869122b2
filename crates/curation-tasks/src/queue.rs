//! In-process task broker and worker pool.
//!
//! `schedule` is fire-and-forget from the caller's side: it enqueues a task on
//! a bounded channel and returns a [`TaskHandle`]. `worker_count` workers pull
//! from the shared receiver. A task whose model space is already running is
//! parked in that space's backlog in [`SpaceLocks`] and the worker moves on;
//! the worker holding the space drains the backlog in order. Runs for one
//! space are serialized and a busy space never blocks other spaces.
//!
//! A parked task is still pending and can be cancelled.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use curation_core::config::TasksConfig;
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{TaskError, TaskResult};
use crate::locks::SpaceLocks;
use crate::registry::{ScoringJob, TaskRegistry, SCORE_MODEL_SPACE};
use crate::retry::RetryPolicy;
use crate::status::{TaskStatus, TaskStatusBackend};

const PHASE_PENDING: u8 = 0;
const PHASE_STARTED: u8 = 1;
const PHASE_CANCELLED: u8 = 2;

type PendingKey = (String, String);

/// State shared between a handle and the worker that runs its task.
struct TaskShared {
    id: Uuid,
    task_name: String,
    model_space: String,
    phase: AtomicU8,
    status: watch::Sender<TaskStatus>,
    backend: Arc<dyn TaskStatusBackend>,
}

impl TaskShared {
    fn key(&self) -> PendingKey {
        (self.task_name.clone(), self.model_space.clone())
    }

    fn is_pending(&self) -> bool {
        self.phase.load(Ordering::SeqCst) == PHASE_PENDING
    }

    /// Pending -> started. Fails if the task was cancelled first.
    fn claim(&self) -> bool {
        self.phase
            .compare_exchange(PHASE_PENDING, PHASE_STARTED, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    async fn publish(&self, status: TaskStatus) {
        self.backend.set(self.id, status.clone()).await;
        self.status.send_replace(status);
    }
}

/// Caller-side view of a scheduled task.
#[derive(Clone)]
pub struct TaskHandle {
    shared: Arc<TaskShared>,
}

impl TaskHandle {
    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    pub fn task_name(&self) -> &str {
        &self.shared.task_name
    }

    pub fn model_space(&self) -> &str {
        &self.shared.model_space
    }

    pub fn status(&self) -> TaskStatus {
        self.shared.status.borrow().clone()
    }

    /// Drop the task if no run has started for it yet, including while it
    /// waits behind another run for the same space.
    ///
    /// Returns `false` when the task already started; a started run always
    /// completes.
    pub async fn cancel(&self) -> bool {
        let cancelled = self
            .shared
            .phase
            .compare_exchange(PHASE_PENDING, PHASE_CANCELLED, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if cancelled {
            info!(task_id = %self.shared.id, model_space = %self.shared.model_space, "Task cancelled");
            self.shared.publish(TaskStatus::Cancelled).await;
        }
        cancelled
    }

    /// Wait for a terminal status.
    pub async fn wait(&self) -> TaskStatus {
        let mut rx = self.shared.status.subscribe();
        loop {
            let current = rx.borrow_and_update().clone();
            if current.is_terminal() {
                return current;
            }
            if rx.changed().await.is_err() {
                return self.status();
            }
        }
    }
}

struct WorkerContext {
    registry: TaskRegistry,
    retry: RetryPolicy,
    locks: SpaceLocks<Arc<TaskShared>>,
    pending: Arc<Mutex<HashMap<PendingKey, Arc<TaskShared>>>>,
}

impl WorkerContext {
    fn forget_pending(&self, task: &TaskShared) {
        let mut pending = self.pending.lock();
        if pending.get(&task.key()).is_some_and(|t| t.id == task.id) {
            pending.remove(&task.key());
        }
    }

    /// Run `task`, or park it if its space is busy. The worker that holds a
    /// space keeps it until the space's backlog is empty.
    async fn dispatch(&self, worker: usize, task: Arc<TaskShared>) {
        let model_space = task.model_space.clone();
        let Some(task) = self.locks.enter(&model_space, task) else {
            debug!(worker, model_space = %model_space, "Space busy, task parked");
            return;
        };

        let mut next = Some(task);
        while let Some(task) = next {
            self.execute(worker, task).await;
            next = self.locks.next(&model_space);
        }
    }

    async fn execute(&self, worker: usize, task: Arc<TaskShared>) {
        self.forget_pending(&task);
        if !task.claim() {
            debug!(worker, task_id = %task.id, "Skipping cancelled task");
            return;
        }

        let job = match self.registry.get(&task.task_name) {
            Ok(job) => job,
            Err(e) => {
                error!(worker, task_id = %task.id, error = %e, "Task failed");
                task.publish(TaskStatus::Failed { error: e.to_string() }).await;
                return;
            }
        };

        info!(
            worker,
            task_id = %task.id,
            task = %task.task_name,
            model_space = %task.model_space,
            "Task started"
        );

        let shared: &TaskShared = &task;
        let job: &dyn ScoringJob = job.as_ref();
        let mut attempts = 0;
        let outcome = self
            .retry
            .run_notify(
                |attempt| {
                    attempts = attempt;
                    async move {
                        shared.publish(TaskStatus::Running { attempt }).await;
                        job.run(&shared.model_space).await
                    }
                },
                |attempt, e| {
                    shared.publish(TaskStatus::Retrying {
                        attempt,
                        error: e.to_string(),
                    })
                },
            )
            .await;

        match outcome {
            Ok(report) => {
                info!(
                    worker,
                    task_id = %task.id,
                    model_space = %task.model_space,
                    run_id = %report.run_id,
                    attempts,
                    "Task succeeded"
                );
                task.publish(TaskStatus::Succeeded { run_id: report.run_id }).await;
            }
            Err(e) => {
                error!(
                    worker,
                    task_id = %task.id,
                    model_space = %task.model_space,
                    attempts,
                    error = %e,
                    "Task failed"
                );
                task.publish(TaskStatus::Failed { error: e.to_string() }).await;
            }
        }
    }
}

/// Bounded in-process broker with a fixed worker pool.
pub struct TaskQueue {
    sender: Mutex<Option<mpsc::Sender<Arc<TaskShared>>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    pending: Arc<Mutex<HashMap<PendingKey, Arc<TaskShared>>>>,
    registry: TaskRegistry,
    backend: Arc<dyn TaskStatusBackend>,
}

impl TaskQueue {
    /// Spawn the worker pool. Must be called inside a tokio runtime.
    pub fn start(
        config: &TasksConfig,
        registry: TaskRegistry,
        backend: Arc<dyn TaskStatusBackend>,
    ) -> TaskResult<Self> {
        config.validate()?;
        let (sender, receiver) = mpsc::channel(config.queue_capacity);
        let receiver = Arc::new(AsyncMutex::new(receiver));
        let pending = Arc::new(Mutex::new(HashMap::new()));
        let context = Arc::new(WorkerContext {
            registry: registry.clone(),
            retry: RetryPolicy::from_config(config),
            locks: SpaceLocks::new(),
            pending: Arc::clone(&pending),
        });

        let workers = (0..config.worker_count)
            .map(|worker| {
                let receiver = Arc::clone(&receiver);
                let context = Arc::clone(&context);
                tokio::spawn(async move {
                    loop {
                        let next = receiver.lock().await.recv().await;
                        match next {
                            Some(task) => context.dispatch(worker, task).await,
                            None => break,
                        }
                    }
                    debug!(worker, "Worker stopped");
                })
            })
            .collect();

        info!(
            broker = %config.broker_url,
            result_backend = %config.result_backend_url,
            workers = config.worker_count,
            capacity = config.queue_capacity,
            "Task queue started"
        );

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
            pending,
            registry,
            backend,
        })
    }

    /// Schedule a full scoring run for `model_space`.
    pub async fn schedule(&self, model_space: &str) -> TaskResult<TaskHandle> {
        self.schedule_named(SCORE_MODEL_SPACE, model_space).await
    }

    /// Schedule the task registered as `task_name` for `model_space`.
    ///
    /// A task for the same name and space that is still pending absorbs the
    /// request and its handle is returned instead.
    pub async fn schedule_named(&self, task_name: &str, model_space: &str) -> TaskResult<TaskHandle> {
        if !self.registry.contains(task_name) {
            return Err(TaskError::UnknownTask(task_name.to_string()));
        }
        let sender = self.sender.lock().clone().ok_or(TaskError::QueueClosed)?;

        let key: PendingKey = (task_name.to_string(), model_space.to_string());
        let task = {
            let mut pending = self.pending.lock();
            if let Some(existing) = pending.get(&key).filter(|t| t.is_pending()) {
                debug!(task_id = %existing.id, model_space, "Coalesced onto pending task");
                return Ok(TaskHandle {
                    shared: Arc::clone(existing),
                });
            }
            let (status, _) = watch::channel(TaskStatus::Pending);
            let task = Arc::new(TaskShared {
                id: Uuid::new_v4(),
                task_name: task_name.to_string(),
                model_space: model_space.to_string(),
                phase: AtomicU8::new(PHASE_PENDING),
                status,
                backend: Arc::clone(&self.backend),
            });
            pending.insert(key.clone(), Arc::clone(&task));
            task
        };

        self.backend.set(task.id, TaskStatus::Pending).await;
        if sender.send(Arc::clone(&task)).await.is_err() {
            self.pending.lock().remove(&key);
            return Err(TaskError::QueueClosed);
        }
        debug!(task_id = %task.id, task = task_name, model_space, "Task scheduled");
        Ok(TaskHandle { shared: task })
    }

    /// Stop accepting tasks, let workers drain the queue, and join them.
    pub async fn shutdown(&self) {
        self.sender.lock().take();
        let workers: Vec<JoinHandle<()>> = std::mem::take(&mut *self.workers.lock());
        for worker in workers {
            if let Err(e) = worker.await {
                warn!(error = %e, "Worker exited abnormally");
            }
        }
        info!("Task queue stopped");
    }
}
