//! Synthetic embedding data for curation tests and demos.
//!
//! Everything is generated from a `ChaCha8Rng` seed, so fixtures are
//! reproducible across runs and platforms.

use curation_core::types::Embedding;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

/// The five-point training square: mean `[1, 1]`, covariance = identity.
pub const SQUARE: [[f32; 2]; 5] = [[0.0, 0.0], [2.0, 0.0], [0.0, 2.0], [2.0, 2.0], [1.0, 1.0]];

/// Training rows for `label` laid out on [`SQUARE`].
pub fn square_category(model_space: &str, label: &str) -> Vec<Embedding> {
    SQUARE
        .iter()
        .map(|v| Embedding::training(model_space, label, v.to_vec()))
        .collect()
}

/// Sample a vector around `center` with independent Gaussian noise.
pub fn sample_around(center: &[f32], spread: f32, rng: &mut ChaCha8Rng) -> Vec<f32> {
    let normal = Normal::new(0.0f32, spread.max(f32::EPSILON)).unwrap();
    center.iter().map(|c| c + normal.sample(rng)).collect()
}

/// A generated model space: category centers plus both partitions.
#[derive(Debug, Clone)]
pub struct SyntheticSpace {
    pub model_space: String,
    pub dimension: usize,
    pub centers: Vec<(String, Vec<f32>)>,
    pub training: Vec<Embedding>,
    pub inference: Vec<Embedding>,
}

impl SyntheticSpace {
    /// Training followed by inference, ready for ingestion.
    pub fn all(&self) -> Vec<Embedding> {
        self.training.iter().chain(&self.inference).cloned().collect()
    }
}

/// Builder for Gaussian category clouds.
///
/// # Example
///
/// ```
/// use curation_test_utils::SpaceBuilder;
///
/// let space = SpaceBuilder::new("vision").categories(3).inference(50).seed(7).build();
/// assert_eq!(space.inference.len(), 50);
/// ```
#[derive(Debug, Clone)]
pub struct SpaceBuilder {
    model_space: String,
    dimension: usize,
    categories: usize,
    training_per_category: usize,
    inference: usize,
    spread: f32,
    seed: u64,
}

impl SpaceBuilder {
    pub fn new(model_space: impl Into<String>) -> Self {
        Self {
            model_space: model_space.into(),
            dimension: 4,
            categories: 2,
            training_per_category: 40,
            inference: 100,
            spread: 1.0,
            seed: 42,
        }
    }

    pub fn dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    pub fn categories(mut self, categories: usize) -> Self {
        self.categories = categories;
        self
    }

    pub fn training_per_category(mut self, n: usize) -> Self {
        self.training_per_category = n;
        self
    }

    pub fn inference(mut self, n: usize) -> Self {
        self.inference = n;
        self
    }

    pub fn spread(mut self, spread: f32) -> Self {
        self.spread = spread;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn build(&self) -> SyntheticSpace {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let centers: Vec<(String, Vec<f32>)> = (0..self.categories)
            .map(|i| {
                // Centers far apart relative to the spread.
                let center = (0..self.dimension)
                    .map(|_| rng.gen_range(-10.0f32..10.0) * (i + 1) as f32)
                    .collect();
                (format!("category_{}", i), center)
            })
            .collect();

        let mut training = Vec::with_capacity(self.categories * self.training_per_category);
        for (label, center) in &centers {
            for _ in 0..self.training_per_category {
                let vector = sample_around(center, self.spread, &mut rng);
                training.push(Embedding::training(&self.model_space, label, vector));
            }
        }

        let mut inference = Vec::with_capacity(self.inference);
        for _ in 0..self.inference {
            if centers.is_empty() {
                break;
            }
            let predicted = rng.gen_range(0..centers.len());
            let (label, center) = &centers[predicted];
            let vector = sample_around(center, self.spread * 1.5, &mut rng);
            let probabilities = probabilities(centers.len(), predicted, &mut rng);
            inference.push(
                Embedding::inference(&self.model_space, vector)
                    .with_predicted_label(label)
                    .with_probabilities(probabilities),
            );
        }

        SyntheticSpace {
            model_space: self.model_space.clone(),
            dimension: self.dimension,
            centers,
            training,
            inference,
        }
    }
}

/// Class probabilities with `predicted` as the argmax, summing to 1.
fn probabilities(classes: usize, predicted: usize, rng: &mut ChaCha8Rng) -> Vec<f32> {
    if classes == 1 {
        return vec![1.0];
    }
    let top = rng.gen_range(0.5f32..1.0);
    let rest = (1.0 - top) / (classes - 1) as f32;
    (0..classes).map(|i| if i == predicted { top } else { rest }).collect()
}
