//! Mahalanobis distance against a fitted category model.

use tracing::warn;

use super::fitter::CategoryModel;

/// `deltaᵗ · Σ⁻¹ · delta` for `delta = vector - mean`.
///
/// Returns `None` when the vector's dimension does not match the model.
pub fn squared_mahalanobis<T: Copy + Into<f64>>(model: &CategoryModel, vector: &[T]) -> Option<f64> {
    if vector.len() != model.dimension() {
        return None;
    }

    let delta: Vec<f64> = vector
        .iter()
        .zip(model.mean())
        .map(|(x, m)| Into::<f64>::into(*x) - m)
        .collect();

    let projected = model.inverse_covariance().mul_vec(&delta);
    Some(delta.iter().zip(&projected).map(|(d, p)| d * p).sum())
}

/// Mahalanobis distance of `vector` from `model`.
///
/// Never negative. Returns `None` (with a diagnostic) when the squared
/// statistic comes out negative or non-finite, which happens with
/// ill-conditioned covariance, or when dimensions disagree.
pub fn score<T: Copy + Into<f64>>(model: &CategoryModel, vector: &[T]) -> Option<f64> {
    let Some(squared) = squared_mahalanobis(model, vector) else {
        warn!(
            category = model.label(),
            expected = model.dimension(),
            actual = vector.len(),
            "Dimension mismatch while scoring embedding"
        );
        return None;
    };

    if !squared.is_finite() {
        warn!(category = model.label(), squared, "Non-finite squared Mahalanobis distance");
        return None;
    }

    if squared < 0.0 {
        warn!(
            category = model.label(),
            squared,
            "Negative squared Mahalanobis distance, covariance is ill-conditioned"
        );
        return None;
    }

    Some(squared.sqrt())
}
