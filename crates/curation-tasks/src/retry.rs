//! Explicit retry policy for scoring tasks.

use std::future::Future;
use std::time::Duration;

use curation_core::config::TasksConfig;
use curation_core::{CoreError, CoreResult};
use tracing::{error, warn};

/// Fixed-delay retry of transient failures.
///
/// `max_retries` counts retries after the first attempt, so an operation runs
/// at most `max_retries + 1` times. Structural failures are returned at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&TasksConfig::default())
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    pub fn from_config(config: &TasksConfig) -> Self {
        Self::new(config.max_retries, Duration::from_millis(config.retry_delay_ms))
    }

    pub fn no_retry() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Delay before the next attempt after `attempt` (1-based) failed with
    /// `error`, or `None` when the failure is final.
    pub fn retry_after(&self, attempt: u32, error: &CoreError) -> Option<Duration> {
        if !error.is_transient() {
            return None;
        }
        if attempt > self.max_retries {
            error!(
                attempt,
                max_retries = self.max_retries,
                error = %error,
                "Retries exhausted"
            );
            return None;
        }
        warn!(
            attempt,
            max_retries = self.max_retries,
            delay_ms = self.delay.as_millis() as u64,
            error = %error,
            "Transient failure, retrying"
        );
        Some(self.delay)
    }

    /// Run `op` until it succeeds, fails structurally, or runs out of retries.
    ///
    /// `op` receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, op: F) -> CoreResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = CoreResult<T>>,
    {
        self.run_notify(op, |_, _| std::future::ready(())).await
    }

    /// [`run`](Self::run), awaiting `on_retry(attempt, error)` before each
    /// delay.
    pub async fn run_notify<T, F, Fut, N, NFut>(&self, mut op: F, mut on_retry: N) -> CoreResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = CoreResult<T>>,
        N: FnMut(u32, &CoreError) -> NFut,
        NFut: Future<Output = ()>,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) => match self.retry_after(attempt, &e) {
                    Some(delay) => {
                        on_retry(attempt, &e).await;
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    None => return Err(e),
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_transient_failure_retried_until_success() {
        let calls = AtomicU32::new(0);
        let result = fast(3)
            .run(|attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 3 {
                        Err(CoreError::IndexUnavailable("warming up".into()))
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_structural_failure_not_retried() {
        let calls = AtomicU32::new(0);
        let result: CoreResult<()> = fast(5)
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(CoreError::EmptyTrainingSet {
                        model_space: "m".into(),
                    })
                }
            })
            .await;
        assert!(matches!(result, Err(CoreError::EmptyTrainingSet { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhausted_retries_return_last_error() {
        let calls = AtomicU32::new(0);
        let result: CoreResult<()> = fast(2)
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(CoreError::StoreUnavailable("down".into())) }
            })
            .await;
        assert!(matches!(result, Err(CoreError::StoreUnavailable(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_notify_sees_each_retry() {
        let seen = parking_lot::Mutex::new(Vec::new());
        let result = fast(3)
            .run_notify(
                |attempt| async move {
                    if attempt < 3 {
                        Err(CoreError::StoreUnavailable(format!("attempt {}", attempt)))
                    } else {
                        Ok(())
                    }
                },
                |attempt, e| {
                    seen.lock().push((attempt, e.to_string()));
                    std::future::ready(())
                },
            )
            .await;
        assert!(result.is_ok());
        let seen = seen.into_inner();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].0, 1);
        assert!(seen[1].1.contains("attempt 2"));
    }

    #[test]
    fn test_from_config() {
        let policy = RetryPolicy::from_config(&TasksConfig::default());
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.delay, Duration::from_millis(1000));
        assert_eq!(RetryPolicy::no_retry().retry_after(1, &CoreError::StoreUnavailable("x".into())), None);
    }
}
