//! Sampling orchestrator: one scoring run for one model space.
//!
//! A run fetches the training and inference partitions, computes every score
//! kind independently, and swaps the model space's live [`ResultSet`] in one
//! `replace_results` call. A fetch failure aborts before anything is written,
//! so the previous result set stays visible.
//!
//! Collaborators are injected at construction. Nothing is cached across runs.

mod lease;
mod state;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::ScoringConfig;
use crate::error::{CoreError, CoreResult};
use crate::scoring::{
    ClassOutlierBuilder, ClassOutlierReport, KMeansOutlierScorer, LeastConfidenceScorer,
    NeighborDisagreementScorer, RandomSampler, SkipReason,
};
use crate::traits::{
    ActivationUncertaintyScorer, AnnIndex, BoundaryUncertaintyScorer, ClusterOutlierScorer,
    EmbeddingStore, ResultStore,
};
use crate::types::{Embedding, OutlierScores, Partition, ResultSet, ScoreKind, ScoreMap, ScoreRecord};

pub use lease::IndexLease;
pub use state::RunState;

/// The external scorer capabilities a full run invokes.
#[derive(Clone)]
pub struct ScorerSet {
    pub activation: Arc<dyn ActivationUncertaintyScorer>,
    pub boundary: Arc<dyn BoundaryUncertaintyScorer>,
    pub cluster: Arc<dyn ClusterOutlierScorer>,
}

impl ScorerSet {
    /// Default scorers parameterized from configuration.
    pub fn from_config(config: &ScoringConfig) -> Self {
        Self {
            activation: Arc::new(LeastConfidenceScorer),
            boundary: Arc::new(NeighborDisagreementScorer::new(config.boundary_neighbors)),
            cluster: Arc::new(KMeansOutlierScorer::new(
                config.cluster_count,
                config.cluster_max_iterations,
                config.random_seed,
                config.cluster_split,
            )),
        }
    }
}

/// Which score kinds a run computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Every score kind plus random selection.
    #[default]
    Full,
    /// Class-outlier scores plus random selection. Skips the index and the
    /// external scorers; their kinds are persisted as null.
    ClassOutliersOnly,
}

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub model_space: String,
    pub state: RunState,
    pub inference_count: usize,
    pub scored_class_outliers: usize,
    pub skipped_categories: Vec<(String, SkipReason)>,
    pub null_distance_count: usize,
    /// Score kinds nulled for the whole run because their scorer failed.
    pub failed_scorers: Vec<ScoreKind>,
}

/// Scores computed during `SCORING`, before assembly into records.
#[derive(Default)]
struct Scores {
    activation: ScoreMap,
    boundary: ScoreMap,
    class: ClassOutlierReport,
    cluster: OutlierScores,
    random: HashSet<Uuid>,
    failed: Vec<ScoreKind>,
}

pub struct SamplingOrchestrator {
    embeddings: Arc<dyn EmbeddingStore>,
    index: Arc<dyn AnnIndex>,
    results: Arc<dyn ResultStore>,
    config: ScoringConfig,
    scorers: ScorerSet,
    mode: RunMode,
}

impl SamplingOrchestrator {
    pub fn new(
        embeddings: Arc<dyn EmbeddingStore>,
        index: Arc<dyn AnnIndex>,
        results: Arc<dyn ResultStore>,
        config: ScoringConfig,
    ) -> Self {
        let scorers = ScorerSet::from_config(&config);
        Self {
            embeddings,
            index,
            results,
            config,
            scorers,
            mode: RunMode::Full,
        }
    }

    pub fn with_scorers(mut self, scorers: ScorerSet) -> Self {
        self.scorers = scorers;
        self
    }

    pub fn with_mode(mut self, mode: RunMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    /// Execute one run for `model_space`.
    ///
    /// # Errors
    ///
    /// - `CoreError::MissingModelSpace` / `CoreError::EmptyTrainingSet` from `FETCHING`
    /// - `CoreError::StoreUnavailable` / `CoreError::IndexUnavailable` (transient)
    /// - Any error from `replace_results`
    ///
    /// In every error case the previous result set is left in place.
    pub async fn run(&self, model_space: &str) -> CoreResult<RunReport> {
        let mut state = RunState::Fetching;
        info!(model_space, mode = ?self.mode, state = %state, "Scoring run started");

        let outcome = self.run_stages(model_space, &mut state).await;
        match outcome {
            Ok(report) => {
                info!(
                    model_space,
                    run_id = %report.run_id,
                    state = %report.state,
                    records = report.inference_count,
                    failed_scorers = ?report.failed_scorers,
                    "Scoring run finished"
                );
                Ok(report)
            }
            Err(e) => {
                error!(model_space, from = %state, state = %RunState::Failed, error = %e, "Scoring run failed");
                Err(e)
            }
        }
    }

    async fn run_stages(&self, model_space: &str, state: &mut RunState) -> CoreResult<RunReport> {
        let training = self.embeddings.fetch(model_space, &Partition::Training).await?;
        if training.is_empty() {
            return Err(CoreError::EmptyTrainingSet {
                model_space: model_space.to_string(),
            });
        }
        let inference = self.embeddings.fetch(model_space, &Partition::Inference).await?;
        let lease = match self.mode {
            RunMode::Full => Some(IndexLease::acquire(Arc::clone(&self.index), model_space).await?),
            RunMode::ClassOutliersOnly => None,
        };

        transition(model_space, state, RunState::Scoring);
        let training = Arc::new(training);
        let inference = Arc::new(inference);
        let scores = self
            .score(model_space, lease.as_ref(), Arc::clone(&training), Arc::clone(&inference))
            .await;
        drop(lease);

        transition(model_space, state, RunState::Persisting);
        let result_set = ResultSet::new(model_space, assemble(&inference, &scores));
        let run_id = result_set.run_id;
        self.results.replace_results(result_set).await?;

        transition(model_space, state, RunState::Done);
        Ok(RunReport {
            run_id,
            model_space: model_space.to_string(),
            state: *state,
            inference_count: inference.len(),
            scored_class_outliers: scores.class.scored,
            skipped_categories: scores
                .class
                .skipped_categories
                .iter()
                .map(|s| (s.label.clone(), s.reason))
                .collect(),
            null_distance_count: scores.class.null_distances,
            failed_scorers: scores.failed,
        })
    }

    /// Compute every score kind concurrently. Never fails: a failing scorer
    /// nulls its own kinds and is recorded in `Scores::failed`.
    async fn score(
        &self,
        model_space: &str,
        lease: Option<&IndexLease>,
        training: Arc<Vec<Embedding>>,
        inference: Arc<Vec<Embedding>>,
    ) -> Scores {
        let builder = ClassOutlierBuilder::new(self.config.class_split).with_parallel(self.config.parallel);
        let class_task = {
            let (space, training, inference) =
                (model_space.to_string(), Arc::clone(&training), Arc::clone(&inference));
            tokio::task::spawn_blocking(move || builder.build(&space, &training, &inference))
        };

        let ids: Vec<Uuid> = inference.iter().map(|e| e.id).collect();
        let random = RandomSampler::new(self.config.random_seed).select(&ids, self.config.n_random_samples);

        let mut scores = Scores {
            random,
            ..Default::default()
        };

        if let Some(lease) = lease {
            let (activation, boundary, cluster) = tokio::join!(
                self.scorers.activation.score(&inference),
                self.scorers
                    .boundary
                    .score(model_space, lease.index(), &training, &inference),
                self.scorers.cluster.score(&training, &inference),
            );
            scores.activation = isolate(model_space, activation, &[ScoreKind::ActivationUncertainty], &mut scores.failed);
            scores.boundary = isolate(model_space, boundary, &[ScoreKind::BoundaryUncertainty], &mut scores.failed);
            scores.cluster = isolate(
                model_space,
                cluster,
                &[ScoreKind::RepresentativeClusterOutlier, ScoreKind::DifficultClusterOutlier],
                &mut scores.failed,
            );
        }

        let class = class_task
            .await
            .map_err(|e| CoreError::Internal(format!("class-outlier task failed: {}", e)))
            .and_then(|built| built);
        scores.class = isolate(
            model_space,
            class,
            &[ScoreKind::RepresentativeClassOutlier, ScoreKind::DifficultClassOutlier],
            &mut scores.failed,
        );
        scores
    }
}

/// Unwrap one scorer's outcome, or record its kinds as failed and fall back to
/// an empty (all-null) result.
fn isolate<T: Default>(
    model_space: &str,
    outcome: CoreResult<T>,
    kinds: &[ScoreKind],
    failed: &mut Vec<ScoreKind>,
) -> T {
    match outcome {
        Ok(value) => value,
        Err(e) => {
            warn!(model_space, kinds = ?kinds, error = %e, "Scorer failed, nulling its score kinds");
            failed.extend_from_slice(kinds);
            T::default()
        }
    }
}

fn transition(model_space: &str, state: &mut RunState, next: RunState) {
    debug_assert!(state.can_transition_to(next), "{} -> {}", state, next);
    info!(model_space, from = %state, to = %next, "Run state transition");
    *state = next;
}

/// One record per inference embedding, in fetch order.
fn assemble(inference: &[Embedding], scores: &Scores) -> Vec<ScoreRecord> {
    let lookup = |map: &HashMap<Uuid, Option<f64>>, id: &Uuid| map.get(id).copied().flatten();
    inference
        .iter()
        .map(|e| {
            let mut record = ScoreRecord::empty(e.id);
            record.set(ScoreKind::ActivationUncertainty, lookup(&scores.activation, &e.id));
            record.set(ScoreKind::BoundaryUncertainty, lookup(&scores.boundary, &e.id));
            record.set(
                ScoreKind::RepresentativeClassOutlier,
                lookup(&scores.class.scores.representative, &e.id),
            );
            record.set(
                ScoreKind::DifficultClassOutlier,
                lookup(&scores.class.scores.difficult, &e.id),
            );
            record.set(
                ScoreKind::RepresentativeClusterOutlier,
                lookup(&scores.cluster.representative, &e.id),
            );
            record.set(
                ScoreKind::DifficultClusterOutlier,
                lookup(&scores.cluster.difficult, &e.id),
            );
            record.random_selection = scores.random.contains(&e.id);
            record
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stubs::{InMemoryAnnIndex, InMemoryEmbeddingStore, InMemoryResultStore};

    struct Fixture {
        store: InMemoryEmbeddingStore,
        index: Arc<InMemoryAnnIndex>,
        results: InMemoryResultStore,
    }

    impl Fixture {
        fn new() -> Self {
            let store = InMemoryEmbeddingStore::new();
            let index = Arc::new(InMemoryAnnIndex::new(Arc::new(store.clone())));
            Self {
                store,
                index,
                results: InMemoryResultStore::new(),
            }
        }

        fn orchestrator(&self, config: ScoringConfig) -> SamplingOrchestrator {
            SamplingOrchestrator::new(
                Arc::new(self.store.clone()),
                self.index.clone(),
                Arc::new(self.results.clone()),
                config,
            )
        }
    }

    fn seeded() -> ScoringConfig {
        ScoringConfig {
            random_seed: Some(11),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_empty_training_fails_without_persisting() {
        let fx = Fixture::new();
        fx.store.insert([Embedding::inference("m", vec![0.0, 0.0])]).await;

        let err = fx.orchestrator(seeded()).run("m").await.unwrap_err();
        assert!(matches!(err, CoreError::EmptyTrainingSet { .. }));
        assert!(fx.results.current_results("m").await.unwrap().is_none());
        assert_eq!(fx.index.load_count(), 0);
    }

    #[tokio::test]
    async fn test_full_run_releases_index_and_records_every_inference_row() {
        let fx = Fixture::new();
        let square = [[0.0, 0.0], [2.0, 0.0], [0.0, 2.0], [2.0, 2.0], [1.0, 1.0]];
        fx.store
            .insert(square.iter().map(|v| Embedding::training("m", "B", v.to_vec())))
            .await;
        let center = Embedding::inference("m", vec![1.0, 1.0]).with_predicted_label("B");
        let far = Embedding::inference("m", vec![3.0, 3.0]).with_predicted_label("B");
        fx.store.insert([center.clone(), far.clone()]).await;

        let report = fx.orchestrator(seeded()).run("m").await.unwrap();
        assert_eq!(report.state, RunState::Done);
        assert_eq!(report.inference_count, 2);
        assert!(report.failed_scorers.is_empty());
        assert!(!fx.index.is_loaded("m"));
        assert_eq!(fx.index.release_count(), 1);

        let live = fx.results.current_results("m").await.unwrap().unwrap();
        assert_eq!(live.run_id, report.run_id);
        let center_record = live.record(center.id).unwrap();
        assert_eq!(center_record.get(ScoreKind::RepresentativeClassOutlier), Some(0.0));
        let far_record = live.record(far.id).unwrap();
        assert!((far_record.get(ScoreKind::DifficultClassOutlier).unwrap() - 8.0_f64.sqrt()).abs() < 1e-9);
        assert_eq!(far_record.get(ScoreKind::BoundaryUncertainty), Some(0.0));
    }

    #[tokio::test]
    async fn test_class_outliers_only_skips_index() {
        let fx = Fixture::new();
        let square = [[0.0, 0.0], [2.0, 0.0], [0.0, 2.0], [2.0, 2.0], [1.0, 1.0]];
        fx.store
            .insert(square.iter().map(|v| Embedding::training("m", "B", v.to_vec())))
            .await;
        let e = Embedding::inference("m", vec![1.0, 1.0]).with_predicted_label("B");
        fx.store.insert([e.clone()]).await;

        fx.orchestrator(seeded())
            .with_mode(RunMode::ClassOutliersOnly)
            .run("m")
            .await
            .unwrap();
        assert_eq!(fx.index.load_count(), 0);
        let live = fx.results.current_results("m").await.unwrap().unwrap();
        let record = live.record(e.id).unwrap();
        assert_eq!(record.get(ScoreKind::BoundaryUncertainty), None);
        // A lone member sits at its category's median and lands on the difficult side.
        assert_eq!(record.get(ScoreKind::DifficultClassOutlier), Some(0.0));
        assert_eq!(record.get(ScoreKind::RepresentativeClassOutlier), None);
    }
}
