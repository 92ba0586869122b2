//! Uniform random baseline selection.

use std::collections::HashSet;

use rand::seq::index;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, warn};
use uuid::Uuid;

/// Draws the random control group, independently of every other score.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSampler {
    seed: Option<u64>,
}

impl RandomSampler {
    /// `None` seeds from OS entropy; a fixed seed makes selection reproducible.
    pub fn new(seed: Option<u64>) -> Self {
        Self { seed }
    }

    /// Select `n` distinct ids uniformly at random.
    ///
    /// When `n` exceeds the pool, the whole pool is selected.
    pub fn select(&self, ids: &[Uuid], n: usize) -> HashSet<Uuid> {
        if n > ids.len() {
            warn!(
                requested = n,
                available = ids.len(),
                "Random sample larger than inference set, selecting all"
            );
        }
        let amount = n.min(ids.len());

        let mut rng = match self.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        let selected: HashSet<Uuid> = index::sample(&mut rng, ids.len(), amount)
            .into_iter()
            .map(|i| ids[i])
            .collect();

        debug!(selected = selected.len(), pool = ids.len(), "Random baseline drawn");
        selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<Uuid> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    #[test]
    fn test_selects_exact_count() {
        let pool = ids(100);
        let picked = RandomSampler::new(None).select(&pool, 10);
        assert_eq!(picked.len(), 10);
        assert!(picked.iter().all(|id| pool.contains(id)));
    }

    #[test]
    fn test_oversized_request_selects_everything() {
        let pool = ids(5);
        let picked = RandomSampler::new(Some(1)).select(&pool, 50);
        assert_eq!(picked.len(), 5);
    }

    #[test]
    fn test_zero_and_empty() {
        assert!(RandomSampler::new(Some(1)).select(&ids(10), 0).is_empty());
        assert!(RandomSampler::new(Some(1)).select(&[], 3).is_empty());
    }

    #[test]
    fn test_fixed_seed_is_reproducible() {
        let pool = ids(200);
        let a = RandomSampler::new(Some(42)).select(&pool, 20);
        let b = RandomSampler::new(Some(42)).select(&pool, 20);
        assert_eq!(a, b);
    }
}
