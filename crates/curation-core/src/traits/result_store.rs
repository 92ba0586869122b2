//! Result store trait: the only state this engine mutates.

use async_trait::async_trait;

use crate::error::CoreResult;
use crate::types::ResultSet;

/// Persistence for per-model-space result sets.
///
/// At most one result set is live per model space. Implementations must make
/// `replace_results` a single atomic swap: readers observe either the previous
/// run or the new one, never a mixture, and a failed swap leaves the previous
/// run in place.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Atomically supersede the live result set of `result_set.model_space`.
    async fn replace_results(&self, result_set: ResultSet) -> CoreResult<()>;

    /// Remove the live result set. Returns the number of records removed.
    async fn delete_results(&self, model_space: &str) -> CoreResult<usize>;

    /// The live result set, if any.
    async fn current_results(&self, model_space: &str) -> CoreResult<Option<ResultSet>>;
}
