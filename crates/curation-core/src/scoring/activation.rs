//! Least-confidence activation uncertainty.

use async_trait::async_trait;

use crate::error::CoreResult;
use crate::traits::ActivationUncertaintyScorer;
use crate::types::{Embedding, ScoreMap};

/// `1 - max(probabilities)` over the model's recorded class probabilities.
///
/// Embeddings without usable probabilities score null.
#[derive(Debug, Clone, Copy, Default)]
pub struct LeastConfidenceScorer;

impl LeastConfidenceScorer {
    pub fn uncertainty(probabilities: &[f32]) -> Option<f64> {
        if probabilities.is_empty() || probabilities.iter().any(|p| !p.is_finite()) {
            return None;
        }
        let max = probabilities
            .iter()
            .copied()
            .fold(f32::NEG_INFINITY, f32::max);
        Some((1.0 - f64::from(max)).clamp(0.0, 1.0))
    }
}

#[async_trait]
impl ActivationUncertaintyScorer for LeastConfidenceScorer {
    async fn score(&self, inference: &[Embedding]) -> CoreResult<ScoreMap> {
        Ok(inference
            .iter()
            .map(|e| {
                let score = e.probabilities.as_deref().and_then(Self::uncertainty);
                (e.id, score)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uncertainty_values() {
        assert_eq!(LeastConfidenceScorer::uncertainty(&[1.0, 0.0]), Some(0.0));
        let u = LeastConfidenceScorer::uncertainty(&[0.5, 0.25, 0.25]).unwrap();
        assert!((u - 0.5).abs() < 1e-6);
        assert_eq!(LeastConfidenceScorer::uncertainty(&[]), None);
        assert_eq!(LeastConfidenceScorer::uncertainty(&[f32::NAN, 0.5]), None);
    }

    #[tokio::test]
    async fn test_missing_probabilities_score_null() {
        let with = Embedding::inference("m", vec![0.0]).with_probabilities(vec![0.9, 0.1]);
        let without = Embedding::inference("m", vec![0.0]);
        let scores = LeastConfidenceScorer
            .score(&[with.clone(), without.clone()])
            .await
            .unwrap();
        assert!((scores[&with.id].unwrap() - 0.1).abs() < 1e-6);
        assert_eq!(scores[&without.id], None);
    }
}
