//! Cluster outliers from seeded k-means over the inference vectors.

use std::collections::HashMap;

use async_trait::async_trait;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::traits::ClusterOutlierScorer;
use crate::types::{Embedding, OutlierScores};

use super::split::SplitPolicy;

/// Lloyd k-means with farthest-point seeding.
///
/// Each inference vector's distance to its centroid is split into
/// representative / difficult per cluster with `split`. Vectors with
/// non-finite components are left out of clustering and score null.
#[derive(Debug, Clone)]
pub struct KMeansOutlierScorer {
    k: usize,
    max_iterations: usize,
    seed: Option<u64>,
    split: SplitPolicy,
}

impl KMeansOutlierScorer {
    pub fn new(k: usize, max_iterations: usize, seed: Option<u64>, split: SplitPolicy) -> Self {
        Self {
            k: k.max(1),
            max_iterations: max_iterations.max(1),
            seed,
            split,
        }
    }

    /// Cluster `rows` and return, per row, `(cluster, distance to centroid)`.
    fn cluster(&self, rows: &[Vec<f32>]) -> Vec<(usize, f64)> {
        let k = self.k.min(rows.len());
        let mut rng = match self.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        let mut centroids: Vec<Vec<f64>> = Vec::with_capacity(k);
        centroids.push(to_f64(&rows[rng.gen_range(0..rows.len())]));
        while centroids.len() < k {
            let farthest = rows
                .iter()
                .enumerate()
                .map(|(i, r)| (i, nearest(&centroids, r).1))
                .max_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(i, _)| i)
                .unwrap_or(0);
            centroids.push(to_f64(&rows[farthest]));
        }

        let mut assignment: Vec<usize> = rows.iter().map(|r| nearest(&centroids, r).0).collect();
        let mut iterations = 0;
        for _ in 0..self.max_iterations {
            iterations += 1;
            let dim = centroids[0].len();
            let mut sums = vec![vec![0.0f64; dim]; k];
            let mut counts = vec![0usize; k];
            for (row, &c) in rows.iter().zip(&assignment) {
                counts[c] += 1;
                for (s, x) in sums[c].iter_mut().zip(row) {
                    *s += f64::from(*x);
                }
            }
            for (c, (sum, count)) in sums.into_iter().zip(counts).enumerate() {
                // Empty clusters keep their previous centroid.
                if count > 0 {
                    centroids[c] = sum.into_iter().map(|s| s / count as f64).collect();
                }
            }

            let next: Vec<usize> = rows.iter().map(|r| nearest(&centroids, r).0).collect();
            if next == assignment {
                break;
            }
            assignment = next;
        }
        debug!(k, iterations, rows = rows.len(), "k-means converged");

        rows.iter()
            .zip(assignment)
            .map(|(r, c)| (c, squared_l2(&centroids[c], r).sqrt()))
            .collect()
    }

    fn score_blocking(&self, inference: Vec<(Uuid, Vec<f32>)>) -> CoreResult<OutlierScores> {
        let mut scores = OutlierScores::all_null(inference.iter().map(|(id, _)| id));
        let Some((_, first)) = inference.first() else {
            return Ok(scores);
        };
        let dimension = first.len();
        if let Some((_, bad)) = inference.iter().find(|(_, v)| v.len() != dimension) {
            return Err(CoreError::DimensionMismatch {
                expected: dimension,
                actual: bad.len(),
            });
        }

        let (ids, rows): (Vec<Uuid>, Vec<Vec<f32>>) = inference
            .into_iter()
            .filter(|(_, v)| v.iter().all(|x| x.is_finite()))
            .unzip();
        if rows.is_empty() {
            return Ok(scores);
        }

        let mut per_cluster: HashMap<usize, Vec<(Uuid, f64)>> = HashMap::new();
        for (id, (cluster, distance)) in ids.into_iter().zip(self.cluster(&rows)) {
            per_cluster.entry(cluster).or_default().push((id, distance));
        }
        for group in per_cluster.values() {
            self.split.apply(group, &mut scores);
        }
        Ok(scores)
    }
}

#[async_trait]
impl ClusterOutlierScorer for KMeansOutlierScorer {
    async fn score(
        &self,
        _training: &[Embedding],
        inference: &[Embedding],
    ) -> CoreResult<OutlierScores> {
        let owned: Vec<(Uuid, Vec<f32>)> = inference.iter().map(|e| (e.id, e.vector.clone())).collect();
        let scorer = self.clone();
        tokio::task::spawn_blocking(move || scorer.score_blocking(owned))
            .await
            .map_err(|e| CoreError::Internal(format!("k-means task failed: {}", e)))?
    }
}

fn to_f64(row: &[f32]) -> Vec<f64> {
    row.iter().map(|x| f64::from(*x)).collect()
}

fn squared_l2(centroid: &[f64], row: &[f32]) -> f64 {
    centroid
        .iter()
        .zip(row)
        .map(|(c, x)| {
            let d = f64::from(*x) - c;
            d * d
        })
        .sum()
}

fn nearest(centroids: &[Vec<f64>], row: &[f32]) -> (usize, f64) {
    centroids
        .iter()
        .enumerate()
        .map(|(i, c)| (i, squared_l2(c, row)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .unwrap_or((0, f64::INFINITY))
}
