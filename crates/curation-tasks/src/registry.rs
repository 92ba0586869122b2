//! Stable task names mapped to scoring jobs.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use curation_core::config::ScoringConfig;
use curation_core::traits::{AnnIndex, EmbeddingStore, ResultStore};
use curation_core::{CoreResult, RunMode, RunReport, SamplingOrchestrator};
use tracing::debug;

use crate::error::{TaskError, TaskResult};

/// Full orchestrator run: every score kind plus random selection.
pub const SCORE_MODEL_SPACE: &str = "curation.score_model_space";

/// Reduced run persisting only class-outlier scores and random selection.
pub const SCORE_CLASS_OUTLIERS: &str = "curation.score_class_outliers";

/// One unit of work a worker executes for a model space.
#[async_trait]
pub trait ScoringJob: Send + Sync {
    async fn run(&self, model_space: &str) -> CoreResult<RunReport>;
}

#[async_trait]
impl ScoringJob for SamplingOrchestrator {
    async fn run(&self, model_space: &str) -> CoreResult<RunReport> {
        SamplingOrchestrator::run(self, model_space).await
    }
}

#[derive(Clone, Default)]
pub struct TaskRegistry {
    jobs: HashMap<String, Arc<dyn ScoringJob>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with both orchestrator tasks wired to the given collaborators.
    pub fn with_orchestrators(
        embeddings: Arc<dyn EmbeddingStore>,
        index: Arc<dyn AnnIndex>,
        results: Arc<dyn ResultStore>,
        config: ScoringConfig,
    ) -> Self {
        let full = SamplingOrchestrator::new(
            Arc::clone(&embeddings),
            Arc::clone(&index),
            Arc::clone(&results),
            config.clone(),
        );
        let class_only = SamplingOrchestrator::new(embeddings, index, results, config)
            .with_mode(RunMode::ClassOutliersOnly);

        let mut registry = Self::new();
        registry.register(SCORE_MODEL_SPACE, Arc::new(full));
        registry.register(SCORE_CLASS_OUTLIERS, Arc::new(class_only));
        registry
    }

    /// Register a job under `name`, returning the job it replaced.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        job: Arc<dyn ScoringJob>,
    ) -> Option<Arc<dyn ScoringJob>> {
        let name = name.into();
        debug!(task = %name, "Registered task");
        self.jobs.insert(name, job)
    }

    pub fn get(&self, name: &str) -> TaskResult<Arc<dyn ScoringJob>> {
        self.jobs
            .get(name)
            .cloned()
            .ok_or_else(|| TaskError::UnknownTask(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.jobs.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.jobs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
