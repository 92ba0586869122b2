//! Numerical scoring.
//!
//! - [`fit`] fits a per-category Gaussian summary ([`CategoryModel`]).
//! - [`distance::score`] computes the guarded Mahalanobis distance.
//! - [`ClassOutlierBuilder`] applies both across a model space and splits
//!   the distances with a [`SplitPolicy`].
//! - [`RandomSampler`] draws the baseline control group.
//! - [`LeastConfidenceScorer`], [`NeighborDisagreementScorer`] and
//!   [`KMeansOutlierScorer`] are the default external scorers.

pub mod activation;
pub mod boundary;
pub mod class_outlier;
pub mod cluster;
pub mod distance;
pub mod fitter;
pub mod linalg;
pub mod random;
pub mod split;

pub use activation::LeastConfidenceScorer;
pub use boundary::NeighborDisagreementScorer;
pub use class_outlier::{ClassOutlierBuilder, ClassOutlierReport};
pub use cluster::KMeansOutlierScorer;
pub use fitter::{fit, CategoryModel, SkipReason, SkippedCategory};
pub use random::RandomSampler;
pub use split::SplitPolicy;
