//! Representative / difficult partitioning of outlier distances.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::types::OutlierScores;

/// Rule that splits a group's distances into representative and difficult.
///
/// Group-relative rules (`Median`, `Quantile`) are applied per category or
/// per cluster; `Threshold` is an absolute cut shared by all groups.
/// Representative means strictly below the cut; at or above is difficult.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum SplitPolicy {
    #[default]
    Median,
    Quantile { q: f64 },
    Threshold { distance: f64 },
}

impl SplitPolicy {
    pub fn validate(&self, field: &str) -> CoreResult<()> {
        match *self {
            SplitPolicy::Median => Ok(()),
            SplitPolicy::Quantile { q } if q > 0.0 && q < 1.0 => Ok(()),
            SplitPolicy::Quantile { q } => Err(CoreError::ConfigError(format!(
                "{}: quantile q must be in (0, 1), got {}",
                field, q
            ))),
            SplitPolicy::Threshold { distance } if distance.is_finite() && distance >= 0.0 => {
                Ok(())
            }
            SplitPolicy::Threshold { distance } => Err(CoreError::ConfigError(format!(
                "{}: threshold distance must be finite and >= 0, got {}",
                field, distance
            ))),
        }
    }

    /// Distance at which this group starts being difficult.
    pub fn cut(&self, distances: &[f64]) -> Option<f64> {
        match *self {
            SplitPolicy::Median => quantile(distances, 0.5),
            SplitPolicy::Quantile { q } => quantile(distances, q),
            SplitPolicy::Threshold { distance } => Some(distance),
        }
    }

    /// Split one group's scored members into `into`.
    pub fn apply(&self, group: &[(Uuid, f64)], into: &mut OutlierScores) {
        let distances: Vec<f64> = group.iter().map(|(_, d)| *d).collect();
        let Some(cut) = self.cut(&distances) else {
            return;
        };

        for (id, distance) in group {
            if *distance < cut {
                into.representative.insert(*id, Some(*distance));
                into.difficult.insert(*id, None);
            } else {
                into.representative.insert(*id, None);
                into.difficult.insert(*id, Some(*distance));
            }
        }
    }
}

/// Linear-interpolation quantile (the common "type 7" definition).
fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}
