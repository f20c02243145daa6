//! Admission control.
//!
//! A fixed window admits up to `limit_for_period` calls per refresh period.
//! Calls over the limit are rejected on the spot; nothing waits for the next
//! window.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use crate::config::RateLimitConfig;
use crate::observability::metrics;

/// Calls admitted in the current window.
#[derive(Debug)]
struct AdmissionWindow {
    started: Instant,
    admitted: u32,
}

impl AdmissionWindow {
    fn new() -> Self {
        Self {
            started: Instant::now(),
            admitted: 0,
        }
    }

    fn try_acquire(&mut self, limit: u32, period: Duration) -> bool {
        let now = Instant::now();
        if now.duration_since(self.started) >= period {
            self.started = now;
            self.admitted = 0;
        }

        if self.admitted < limit {
            self.admitted += 1;
            true
        } else {
            false
        }
    }
}

/// Rate limiter for one logical operation.
#[derive(Debug)]
pub struct AdmissionLimiter {
    name: String,
    limit: u32,
    period: Duration,
    window: Mutex<AdmissionWindow>,
}

impl AdmissionLimiter {
    pub fn new(name: impl Into<String>, config: &RateLimitConfig) -> Self {
        Self {
            name: name.into(),
            limit: config.limit_for_period,
            period: config.refresh_period(),
            window: Mutex::new(AdmissionWindow::new()),
        }
    }

    /// Take one permit from the current window, if any are left.
    pub fn try_acquire(&self) -> bool {
        let mut window = self.window.lock().unwrap_or_else(PoisonError::into_inner);
        let admitted = window.try_acquire(self.limit, self.period);
        drop(window);

        if !admitted {
            tracing::warn!(limiter = %self.name, limit = self.limit, period = ?self.period, "Rate limit exceeded");
            metrics::record_rate_limited(&self.name);
        }
        admitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn limiter(limit: u32) -> AdmissionLimiter {
        AdmissionLimiter::new(
            "test",
            &RateLimitConfig {
                limit_for_period: limit,
                refresh_period_ms: 1000,
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejects_call_over_limit() {
        let limiter = limiter(3);
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_refreshes() {
        let limiter = limiter(1);
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());

        tokio::time::advance(Duration::from_millis(1000)).await;
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_the_window() {
        let limiter = Arc::new(limiter(5));
        let mut handles = Vec::new();
        for _ in 0..20 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(async move { limiter.try_acquire() }));
        }

        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 5);
    }
}
