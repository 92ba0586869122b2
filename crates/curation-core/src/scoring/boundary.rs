//! Boundary uncertainty from nearest-neighbour label disagreement.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::CoreResult;
use crate::traits::{AnnIndex, BoundaryUncertaintyScorer};
use crate::types::{Embedding, ScoreMap};

/// Looks up the `k` nearest training embeddings in the ANN index and scores
/// how much their labels disagree with the embedding's category.
///
/// - With a category: fraction of labeled neighbours with a different label.
/// - Without one: `1 - share of the most common neighbour label`.
/// - No labeled neighbour: null.
///
/// A failed lookup nulls that embedding only.
#[derive(Debug, Clone, Copy)]
pub struct NeighborDisagreementScorer {
    k: usize,
}

impl NeighborDisagreementScorer {
    pub fn new(k: usize) -> Self {
        Self { k: k.max(1) }
    }

    fn disagreement(category: Option<&str>, neighbour_labels: &[&str]) -> Option<f64> {
        if neighbour_labels.is_empty() {
            return None;
        }
        let total = neighbour_labels.len() as f64;
        match category {
            Some(category) => {
                let differing = neighbour_labels.iter().filter(|l| **l != category).count();
                Some(differing as f64 / total)
            }
            None => {
                let mut counts: HashMap<&str, usize> = HashMap::new();
                for label in neighbour_labels {
                    *counts.entry(label).or_default() += 1;
                }
                let majority = counts.values().copied().max().unwrap_or(0);
                Some(1.0 - majority as f64 / total)
            }
        }
    }
}

impl Default for NeighborDisagreementScorer {
    fn default() -> Self {
        Self::new(10)
    }
}

#[async_trait]
impl BoundaryUncertaintyScorer for NeighborDisagreementScorer {
    async fn score(
        &self,
        model_space: &str,
        index: &dyn AnnIndex,
        training: &[Embedding],
        inference: &[Embedding],
    ) -> CoreResult<ScoreMap> {
        let labels: HashMap<Uuid, &str> = training
            .iter()
            .filter_map(|e| e.label.as_deref().map(|l| (e.id, l)))
            .collect();

        let mut scores = ScoreMap::with_capacity(inference.len());
        for e in inference {
            let neighbours = match index.search(model_space, &e.vector, self.k).await {
                Ok(neighbours) => neighbours,
                Err(err) => {
                    warn!(model_space, embedding_id = %e.id, error = %err, "Neighbour search failed");
                    scores.insert(e.id, None);
                    continue;
                }
            };
            let neighbour_labels: Vec<&str> = neighbours
                .iter()
                .filter_map(|(id, _)| labels.get(id).copied())
                .collect();
            scores.insert(e.id, Self::disagreement(e.category(), &neighbour_labels));
        }

        debug!(model_space, k = self.k, scored = scores.len(), "Boundary uncertainty computed");
        Ok(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    /// Exact search over fixed rows; queries with a negative first
    /// coordinate fail.
    struct FixedIndex {
        rows: Vec<(Uuid, Vec<f32>)>,
    }

    #[async_trait]
    impl AnnIndex for FixedIndex {
        async fn load(&self, _model_space: &str) -> CoreResult<()> {
            Ok(())
        }

        async fn search(&self, _model_space: &str, query: &[f32], k: usize) -> CoreResult<Vec<(Uuid, f32)>> {
            if query[0] < 0.0 {
                return Err(CoreError::IndexUnavailable("shard offline".into()));
            }
            let mut hits: Vec<(Uuid, f32)> = self
                .rows
                .iter()
                .map(|(id, v)| {
                    let d: f32 = v.iter().zip(query).map(|(a, b)| (a - b) * (a - b)).sum();
                    (*id, d.sqrt())
                })
                .collect();
            hits.sort_by(|a, b| a.1.total_cmp(&b.1));
            hits.truncate(k);
            Ok(hits)
        }

        fn is_loaded(&self, _model_space: &str) -> bool {
            true
        }

        fn release(&self, _model_space: &str) {}
    }

    #[tokio::test]
    async fn test_failed_search_nulls_only_that_embedding() {
        let training = vec![
            Embedding::training("m", "a", vec![0.0, 0.0]),
            Embedding::training("m", "a", vec![0.1, 0.0]),
            Embedding::training("m", "b", vec![5.0, 5.0]),
        ];
        let index = FixedIndex {
            rows: training.iter().map(|e| (e.id, e.vector.clone())).collect(),
        };
        let near = Embedding::inference("m", vec![0.0, 0.1]).with_predicted_label("a");
        let broken = Embedding::inference("m", vec![-1.0, 0.0]).with_predicted_label("a");
        let far = Embedding::inference("m", vec![5.0, 4.9]).with_predicted_label("a");

        let scores = NeighborDisagreementScorer::new(1)
            .score("m", &index, &training, &[near.clone(), broken.clone(), far.clone()])
            .await
            .unwrap();

        assert_eq!(scores.len(), 3);
        assert_eq!(scores.get(&near.id), Some(&Some(0.0)));
        assert_eq!(scores.get(&broken.id), Some(&None));
        assert_eq!(scores.get(&far.id), Some(&Some(1.0)));
    }

    #[test]
    fn test_disagreement_with_category() {
        assert_eq!(
            NeighborDisagreementScorer::disagreement(Some("a"), &["a", "a", "b", "b"]),
            Some(0.5)
        );
        assert_eq!(NeighborDisagreementScorer::disagreement(Some("a"), &["a"]), Some(0.0));
    }

    #[test]
    fn test_disagreement_without_category() {
        let u = NeighborDisagreementScorer::disagreement(None, &["a", "a", "a", "b"]).unwrap();
        assert!((u - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_no_neighbours_is_null() {
        assert_eq!(NeighborDisagreementScorer::disagreement(Some("a"), &[]), None);
    }
}
