//! Retry logic.
//!
//! # Responsibilities
//! - Decide whether a failed attempt is worth repeating
//! - Execute retries with exponential backoff + jitter
//! - Enforce the attempt budget
//!
//! # Design Decisions
//! - Only transient errors are retried; permanent ones return at once
//! - Delays are jittered

use crate::catalog::StoreError;
use crate::config::RetryConfig;
use crate::observability::metrics;
use crate::resilience::backoff::Backoff;

/// Errors that can tell whether repeating the call may help.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for StoreError {
    fn is_retryable(&self) -> bool {
        self.is_transient()
    }
}

/// The last error of a call that used up its attempts or hit a permanent
/// error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    pub last: E,
}

/// Bounded retry with exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    name: String,
    max_attempts: u32,
    backoff: Backoff,
}

impl RetryPolicy {
    pub fn new(name: impl Into<String>, config: &RetryConfig) -> Self {
        Self {
            name: name.into(),
            max_attempts: config.max_attempts.max(1),
            backoff: Backoff::new(config),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run `op` until it succeeds, fails permanently, or runs out of attempts.
    pub async fn run<T, E, F>(&self, mut op: F) -> Result<T, RetryExhausted<E>>
    where
        E: Retryable + std::fmt::Display,
        F: FnMut() -> Result<T, E>,
    {
        let mut attempts = 0;

        loop {
            attempts += 1;

            let last = match op() {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if !last.is_retryable() || attempts >= self.max_attempts {
                tracing::debug!(policy = %self.name, attempts, error = %last, "Giving up");
                return Err(RetryExhausted { attempts, last });
            }

            let delay = self.backoff.delay(attempts);
            tracing::info!(policy = %self.name, attempt = attempts, delay = ?delay, error = %last, "Retrying");
            metrics::record_retry(&self.name);
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(
            "test",
            &RetryConfig {
                max_attempts,
                base_delay_ms: 10,
                max_delay_ms: 50,
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_eventually_succeeds() {
        let calls = Cell::new(0);
        let result = policy(3)
            .run(|| {
                calls.set(calls.get() + 1);
                if calls.get() < 3 {
                    Err(StoreError::Unavailable("flaky".into()))
                } else {
                    Ok(calls.get())
                }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let calls = Cell::new(0);
        let result: Result<(), _> = policy(3)
            .run(|| {
                calls.set(calls.get() + 1);
                Err(StoreError::Unavailable("down".into()))
            })
            .await;

        let exhausted = result.unwrap_err();
        assert_eq!(exhausted.attempts, 3);
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_errors_are_not_retried() {
        let calls = Cell::new(0);
        let result: Result<(), _> = policy(5)
            .run(|| {
                calls.set(calls.get() + 1);
                Err(StoreError::Constraint {
                    message: "broken".into(),
                    cause: None,
                })
            })
            .await;

        assert_eq!(result.unwrap_err().attempts, 1);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_zero_attempts_means_one() {
        assert_eq!(policy(0).max_attempts(), 1);
    }
}
