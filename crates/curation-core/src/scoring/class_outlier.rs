//! Class-outlier scores: fit every training category, score inference rows
//! against their category's model, then split per category.

use std::collections::{BTreeMap, HashMap};

use rayon::prelude::*;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::types::{Embedding, OutlierScores};

use super::fitter::{fit, CategoryModel, SkippedCategory};
use super::split::SplitPolicy;

/// Outcome of one class-outlier build.
#[derive(Debug, Clone, Default)]
pub struct ClassOutlierReport {
    pub scores: OutlierScores,
    /// Labels that produced a category model.
    pub fitted_categories: Vec<String>,
    pub skipped_categories: Vec<SkippedCategory>,
    /// Inference rows that got a distance.
    pub scored: usize,
    /// Inference rows whose category had a model but whose distance was undefined.
    pub null_distances: usize,
    /// Inference rows with no category, or a category without a model.
    pub unmodeled: usize,
}

/// Builds representative / difficult class-outlier scores.
#[derive(Debug, Clone)]
pub struct ClassOutlierBuilder {
    split: SplitPolicy,
    parallel: bool,
}

impl Default for ClassOutlierBuilder {
    fn default() -> Self {
        Self::new(SplitPolicy::default())
    }
}

impl ClassOutlierBuilder {
    pub fn new(split: SplitPolicy) -> Self {
        Self {
            split,
            parallel: true,
        }
    }

    /// Fit and score with rayon (default) or on the calling thread.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn split(&self) -> SplitPolicy {
        self.split
    }

    /// Fit one model per training label.
    ///
    /// Training rows without a label cannot belong to any category and are ignored.
    pub fn fit_categories(
        &self,
        training: &[Embedding],
    ) -> (HashMap<String, CategoryModel>, Vec<SkippedCategory>) {
        let mut groups: BTreeMap<&str, Vec<&[f32]>> = BTreeMap::new();
        let mut unlabeled = 0usize;
        for e in training {
            match e.label.as_deref() {
                Some(label) => groups.entry(label).or_default().push(e.vector.as_slice()),
                None => unlabeled += 1,
            }
        }
        if unlabeled > 0 {
            warn!(unlabeled, "Ignoring training embeddings without a category label");
        }

        let outcomes: Vec<Result<CategoryModel, SkippedCategory>> = if self.parallel {
            groups
                .par_iter()
                .map(|(label, rows)| fit(label, rows))
                .collect()
        } else {
            groups.iter().map(|(label, rows)| fit(label, rows)).collect()
        };

        let mut models = HashMap::new();
        let mut skipped = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(model) => {
                    models.insert(model.label().to_string(), model);
                }
                Err(skip) => skipped.push(skip),
            }
        }
        (models, skipped)
    }

    /// Score `inference` against category models fitted from `training`.
    ///
    /// Every inference id appears in both output maps. Per-embedding problems
    /// become nulls; only structurally invalid input is an error.
    ///
    /// # Errors
    ///
    /// - `CoreError::EmptyTrainingSet` if `training` is empty
    /// - `CoreError::DimensionMismatch` if vectors disagree on dimension
    pub fn build(
        &self,
        model_space: &str,
        training: &[Embedding],
        inference: &[Embedding],
    ) -> CoreResult<ClassOutlierReport> {
        let Some(first) = training.first() else {
            return Err(CoreError::EmptyTrainingSet {
                model_space: model_space.to_string(),
            });
        };
        let dimension = first.dimension();
        if let Some(bad) = training
            .iter()
            .chain(inference.iter())
            .find(|e| e.dimension() != dimension)
        {
            return Err(CoreError::DimensionMismatch {
                expected: dimension,
                actual: bad.dimension(),
            });
        }

        let (models, skipped) = self.fit_categories(training);

        let score_one = |e: &Embedding| -> Option<Option<f64>> {
            e.category()
                .and_then(|c| models.get(c))
                .map(|model| model.distance(e.vector.as_slice()))
        };
        let distances: Vec<Option<Option<f64>>> = if self.parallel {
            inference.par_iter().map(score_one).collect()
        } else {
            inference.iter().map(score_one).collect()
        };

        let mut report = ClassOutlierReport {
            scores: OutlierScores::all_null(inference.iter().map(|e| &e.id)),
            skipped_categories: skipped,
            ..Default::default()
        };
        let mut per_category: HashMap<&str, Vec<(Uuid, f64)>> = HashMap::new();
        for (e, outcome) in inference.iter().zip(distances) {
            match (e.category(), outcome) {
                (Some(category), Some(Some(distance))) => {
                    per_category.entry(category).or_default().push((e.id, distance));
                    report.scored += 1;
                }
                (Some(_), Some(None)) => report.null_distances += 1,
                _ => report.unmodeled += 1,
            }
        }

        for group in per_category.values() {
            self.split.apply(group, &mut report.scores);
        }

        let mut fitted: Vec<String> = models.into_keys().collect();
        fitted.sort();
        report.fitted_categories = fitted;

        info!(
            model_space,
            fitted = report.fitted_categories.len(),
            skipped = report.skipped_categories.len(),
            scored = report.scored,
            null_distances = report.null_distances,
            unmodeled = report.unmodeled,
            "Class-outlier scores built"
        );
        debug!(model_space, split = ?self.split, "Class-outlier split policy");

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::fitter::SkipReason;
    use crate::types::Embedding;

    fn square_training(space: &str, label: &str) -> Vec<Embedding> {
        [[0.0, 0.0], [2.0, 0.0], [0.0, 2.0], [2.0, 2.0], [1.0, 1.0]]
            .iter()
            .map(|v| Embedding::training(space, label, v.to_vec()))
            .collect()
    }

    #[test]
    fn test_empty_training_set_is_an_error() {
        let err = ClassOutlierBuilder::default()
            .build("m", &[], &[Embedding::inference("m", vec![0.0])])
            .unwrap_err();
        assert!(matches!(err, CoreError::EmptyTrainingSet { .. }));
    }

    #[test]
    fn test_dimension_mismatch_is_an_error() {
        let training = square_training("m", "B");
        let inference = vec![Embedding::inference("m", vec![1.0, 1.0, 1.0]).with_predicted_label("B")];
        let err = ClassOutlierBuilder::default()
            .build("m", &training, &inference)
            .unwrap_err();
        assert!(matches!(err, CoreError::DimensionMismatch { expected: 2, actual: 3 }));
    }

    #[test]
    fn test_skipped_category_leaves_its_embeddings_null() {
        let mut training = square_training("m", "B");
        training.push(Embedding::training("m", "A", vec![5.0, 5.0]));
        training.push(Embedding::training("m", "A", vec![6.0, 6.0]));

        let a = Embedding::inference("m", vec![5.5, 5.5]).with_predicted_label("A");
        let b = Embedding::inference("m", vec![3.0, 3.0]).with_predicted_label("B");
        let none = Embedding::inference("m", vec![1.0, 1.0]);

        let report = ClassOutlierBuilder::new(SplitPolicy::Median)
            .with_parallel(false)
            .build("m", &training, &[a.clone(), b.clone(), none.clone()])
            .unwrap();

        assert_eq!(report.fitted_categories, vec!["B".to_string()]);
        assert_eq!(report.skipped_categories.len(), 1);
        assert_eq!(report.skipped_categories[0].label, "A");
        assert!(matches!(
            report.skipped_categories[0].reason,
            SkipReason::InsufficientSamples { samples: 2, dimension: 2 }
        ));

        assert_eq!(report.scores.difficult[&a.id], None);
        assert_eq!(report.scores.representative[&a.id], None);
        assert_eq!(report.scores.difficult[&none.id], None);
        assert_eq!(report.unmodeled, 2);
        assert_eq!(report.scored, 1);

        // A lone member of its category sits at the median, so it is difficult.
        let d = report.scores.difficult[&b.id].unwrap();
        assert!((d - 8.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_ground_truth_label_used_without_prediction() {
        let training = square_training("m", "B");
        let labeled = Embedding::inference("m", vec![1.0, 1.0]).with_label("B");
        let report = ClassOutlierBuilder::default()
            .build("m", &training, &[labeled.clone()])
            .unwrap();
        assert_eq!(report.scores.difficult[&labeled.id], Some(0.0));
    }

    #[test]
    fn test_parallel_and_serial_agree() {
        let training = square_training("m", "B");
        // Points on a ray from the mean: distances 0.0, 0.1, ..., 1.9.
        let inference: Vec<Embedding> = (0..20)
            .map(|i| {
                Embedding::inference("m", vec![1.0 + i as f32 * 0.1, 1.0]).with_predicted_label("B")
            })
            .collect();

        let serial = ClassOutlierBuilder::default()
            .with_parallel(false)
            .build("m", &training, &inference)
            .unwrap();
        let parallel = ClassOutlierBuilder::default()
            .with_parallel(true)
            .build("m", &training, &inference)
            .unwrap();
        assert_eq!(serial.scores, parallel.scores);

        let representative = serial.scores.representative.values().filter(|v| v.is_some()).count();
        let difficult = serial.scores.difficult.values().filter(|v| v.is_some()).count();
        assert_eq!(representative + difficult, 20);
        assert_eq!(representative, 10);
    }
}
