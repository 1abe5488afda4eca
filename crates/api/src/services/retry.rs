//! Bounded retry for optimistic-concurrency conflicts.
//!
//! Only [`EngineError::Conflict`] is retried. Each attempt re-runs the whole
//! operation in a fresh transaction so it re-reads price and stock.

use std::future::Future;
use std::time::Duration;

use super::EngineError;

/// Default number of attempts, including the first.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Delay before the first retry. Doubles per retry.
const INITIAL_BACKOFF: Duration = Duration::from_millis(10);
/// Upper bound on a single backoff delay.
const MAX_BACKOFF: Duration = Duration::from_millis(200);

/// Retry policy for whole engine operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_backoff: Duration,
}

impl RetryPolicy {
    /// Policy with `max_attempts` total attempts (clamped to at least 1).
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff: INITIAL_BACKOFF,
        }
    }

    /// Same policy without sleeping between attempts.
    #[must_use]
    pub const fn without_backoff(mut self) -> Self {
        self.initial_backoff = Duration::ZERO;
        self
    }

    /// Total attempts, including the first.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempt budget is spent. `op` receives the 1-based attempt number.
    ///
    /// # Errors
    ///
    /// Returns the first non-retryable error, or the last `Conflict` once
    /// every attempt has been used.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, EngineError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, EngineError>>,
    {
        let mut delay = self.initial_backoff;
        let mut attempt = 1;

        loop {
            match op(attempt).await {
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    tracing::warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "Conflict, retrying: {e}"
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    delay = (delay * 2).min(MAX_BACKOFF);
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use cartwright_core::ProductId;

    use super::*;

    fn conflict() -> EngineError {
        EngineError::Conflict {
            product_id: ProductId::new(1),
        }
    }

    #[tokio::test]
    async fn test_retries_conflicts_until_success() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3).without_backoff();

        let result = policy
            .run(|attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 3 {
                        Err(conflict())
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
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(2).without_backoff();

        let result: Result<(), _> = policy
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(conflict()) }
            })
            .await;

        assert!(matches!(result, Err(EngineError::Conflict { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_terminal_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(5).without_backoff();

        let result: Result<(), _> = policy
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(EngineError::NotFound("product 1".to_string())) }
            })
            .await;

        assert!(matches!(result, Err(EngineError::NotFound(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_zero_attempts_clamps_to_one() {
        assert_eq!(RetryPolicy::new(0).max_attempts(), 1);
    }
}
