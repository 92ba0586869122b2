//! Per-category Gaussian reference models.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::distance;
use super::linalg::{mean_vector, sample_covariance, SquareMatrix};

/// Why a category produced no model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// `samples <= dimension + 1`: the covariance cannot be estimated at full rank.
    InsufficientSamples { samples: usize, dimension: usize },
    /// The sample covariance could not be inverted.
    SingularCovariance,
    /// Rows of differing dimension.
    RaggedRows { expected: usize, found: usize },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::InsufficientSamples { samples, dimension } => write!(
                f,
                "insufficient samples: {} samples for dimension {} (need more than {})",
                samples,
                dimension,
                dimension + 1
            ),
            SkipReason::SingularCovariance => f.write_str("singular covariance matrix"),
            SkipReason::RaggedRows { expected, found } => write!(
                f,
                "ragged rows: expected dimension {}, found {}",
                expected, found
            ),
        }
    }
}

/// A category that was excluded from class-outlier scoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedCategory {
    pub label: String,
    pub reason: SkipReason,
}

/// Fitted (mean, inverse covariance) summary of one category.
///
/// Only constructed when `sample_count > dimension + 1` and the covariance
/// is invertible. Rebuilt on every scoring run, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryModel {
    label: String,
    mean: Vec<f64>,
    inverse_covariance: SquareMatrix,
    sample_count: usize,
}

impl CategoryModel {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn inverse_covariance(&self) -> &SquareMatrix {
        &self.inverse_covariance
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    pub fn dimension(&self) -> usize {
        self.mean.len()
    }

    /// Mahalanobis distance of `vector` from this category, or `None` when undefined.
    pub fn distance<T: Copy + Into<f64>>(&self, vector: &[T]) -> Option<f64> {
        distance::score(self, vector)
    }

    #[cfg(test)]
    pub(crate) fn from_parts(
        label: &str,
        mean: Vec<f64>,
        inverse_covariance: SquareMatrix,
        sample_count: usize,
    ) -> Self {
        Self {
            label: label.to_string(),
            mean,
            inverse_covariance,
            sample_count,
        }
    }
}

/// Fit a category model from its training vectors.
///
/// Pure over its inputs. Unreliable categories come back as
/// `Err(SkippedCategory)` with a warning, so one bad category never fails a run.
/// Rows that disagree on dimension skip the category.
pub fn fit(label: &str, vectors: &[&[f32]]) -> Result<CategoryModel, SkippedCategory> {
    let samples = vectors.len();
    let dimension = vectors.first().map(|v| v.len()).unwrap_or(0);

    if let Some(row) = vectors.iter().find(|v| v.len() != dimension) {
        let reason = SkipReason::RaggedRows {
            expected: dimension,
            found: row.len(),
        };
        warn!(category = label, %reason, "Skipping category");
        return Err(SkippedCategory {
            label: label.to_string(),
            reason,
        });
    }

    if samples <= dimension + 1 {
        let reason = SkipReason::InsufficientSamples { samples, dimension };
        warn!(category = label, %reason, "Skipping category");
        return Err(SkippedCategory {
            label: label.to_string(),
            reason,
        });
    }

    let mean = mean_vector(vectors);
    let covariance = sample_covariance(vectors, &mean);

    let Some(inverse_covariance) = covariance.inverse() else {
        let reason = SkipReason::SingularCovariance;
        warn!(category = label, samples, dimension, %reason, "Skipping category");
        return Err(SkippedCategory {
            label: label.to_string(),
            reason,
        });
    };

    debug!(category = label, samples, dimension, "Fitted category model");

    Ok(CategoryModel {
        label: label.to_string(),
        mean,
        inverse_covariance,
        sample_count: samples,
    })
}
