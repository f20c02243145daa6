//! Circuit breaker for store protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: store assumed down, calls fail fast
//! - Half-Open: a few trial calls check whether the store recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure rate >= threshold over the rolling window
//! Open → Half-Open: after the open duration elapses
//! Half-Open → Closed: every permitted trial call succeeds
//! Half-Open → Open: any trial call fails
//! ```
//!
//! # Design Decisions
//! - Count-based rolling window of the most recent outcomes
//! - Rate is only evaluated once `minimum_calls` outcomes are recorded
//! - A call dropped before completing counts as a failure
//! - An outcome only counts against the state that admitted the call

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::time::Instant;

use crate::config::CircuitBreakerConfig;
use crate::observability::metrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_gauge(self) -> f64 {
        match self {
            CircuitState::Closed => 0.0,
            CircuitState::Open => 1.0,
            CircuitState::HalfOpen => 2.0,
        }
    }
}

/// Outcome of a call routed through the breaker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallError<E> {
    /// The breaker did not let the call through.
    Rejected,
    /// The call ran and failed.
    Failed(E),
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    /// Most recent outcomes, `true` for a failure.
    window: VecDeque<bool>,
    opened_at: Option<Instant>,
    trial_admitted: usize,
    trial_successes: usize,
    /// Bumped on every transition. Outcomes from an older generation are stale.
    generation: u64,
}

/// Shared gate around a failing dependency.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let name = name.into();
        metrics::record_circuit_state(&name, CircuitState::Closed);
        Self {
            name,
            inner: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                window: VecDeque::with_capacity(config.sliding_window_size),
                opened_at: None,
                trial_admitted: 0,
                trial_successes: 0,
                generation: 0,
            }),
            config,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current state, moving Open to Half-Open if the open duration elapsed.
    pub fn state(&self) -> CircuitState {
        let mut inner = self.lock();
        self.expire_open(&mut inner);
        inner.state
    }

    /// Run `op` if the breaker admits it and record its outcome.
    pub async fn call<T, E, F, Fut>(&self, op: F) -> Result<T, CallError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let Some(permit) = self.try_acquire() else {
            return Err(CallError::Rejected);
        };

        match op().await {
            Ok(value) => {
                permit.success();
                Ok(value)
            }
            Err(e) => {
                permit.failure();
                Err(CallError::Failed(e))
            }
        }
    }

    /// Ask for permission to make one call.
    pub fn try_acquire(&self) -> Option<Permit<'_>> {
        let mut inner = self.lock();
        self.expire_open(&mut inner);

        match inner.state {
            CircuitState::Closed => {}
            CircuitState::Open => {
                tracing::debug!(breaker = %self.name, "Call rejected, circuit open");
                return None;
            }
            CircuitState::HalfOpen => {
                if inner.trial_admitted >= self.config.permitted_calls_in_half_open {
                    tracing::debug!(breaker = %self.name, "Call rejected, trial calls in flight");
                    return None;
                }
                inner.trial_admitted += 1;
            }
        }

        Some(Permit {
            breaker: self,
            generation: inner.generation,
            recorded: false,
        })
    }

    fn on_success(&self, generation: u64) {
        let mut inner = self.lock();
        if !self.is_current(&mut inner, generation) {
            return;
        }
        match inner.state {
            CircuitState::Closed => self.record_outcome(&mut inner, false),
            CircuitState::HalfOpen => {
                inner.trial_successes += 1;
                if inner.trial_successes >= self.config.permitted_calls_in_half_open {
                    self.transition(&mut inner, CircuitState::Closed);
                }
            }
            CircuitState::Open => {}
        }
    }

    fn on_failure(&self, generation: u64) {
        let mut inner = self.lock();
        if !self.is_current(&mut inner, generation) {
            return;
        }
        match inner.state {
            CircuitState::Closed => self.record_outcome(&mut inner, true),
            CircuitState::HalfOpen => self.transition(&mut inner, CircuitState::Open),
            CircuitState::Open => {}
        }
    }

    /// Whether a permit granted in `generation` may still report.
    fn is_current(&self, inner: &mut BreakerState, generation: u64) -> bool {
        self.expire_open(inner);
        if inner.generation == generation {
            return true;
        }
        tracing::debug!(breaker = %self.name, "Ignoring outcome admitted under an earlier state");
        false
    }

    fn record_outcome(&self, inner: &mut BreakerState, failed: bool) {
        if inner.window.len() == self.config.sliding_window_size {
            inner.window.pop_front();
        }
        inner.window.push_back(failed);

        if inner.window.len() < self.config.minimum_calls {
            return;
        }

        let failures = inner.window.iter().filter(|f| **f).count();
        let rate = failures as f64 / inner.window.len() as f64;
        if rate >= self.config.failure_rate_threshold {
            tracing::warn!(
                breaker = %self.name,
                failure_rate = rate,
                threshold = self.config.failure_rate_threshold,
                "Failure rate threshold exceeded"
            );
            self.transition(inner, CircuitState::Open);
        }
    }

    fn expire_open(&self, inner: &mut BreakerState) {
        if inner.state != CircuitState::Open {
            return;
        }
        let elapsed = inner
            .opened_at
            .map(|at| at.elapsed() >= self.config.open_duration())
            .unwrap_or(true);
        if elapsed {
            self.transition(inner, CircuitState::HalfOpen);
        }
    }

    fn transition(&self, inner: &mut BreakerState, to: CircuitState) {
        let from = inner.state;
        inner.state = to;
        inner.generation += 1;
        inner.window.clear();
        inner.trial_admitted = 0;
        inner.trial_successes = 0;
        inner.opened_at = (to == CircuitState::Open).then(Instant::now);

        match to {
            CircuitState::Open => {
                tracing::warn!(breaker = %self.name, from = ?from, "Circuit opened")
            }
            _ => tracing::info!(breaker = %self.name, from = ?from, to = ?to, "Circuit state changed"),
        }
        metrics::record_circuit_state(&self.name, to);
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Admission granted by [`CircuitBreaker::try_acquire`].
///
/// Dropping it without reporting an outcome records a failure.
#[derive(Debug)]
pub struct Permit<'a> {
    breaker: &'a CircuitBreaker,
    generation: u64,
    recorded: bool,
}

impl Permit<'_> {
    pub fn success(mut self) {
        self.recorded = true;
        self.breaker.on_success(self.generation);
    }

    pub fn failure(mut self) {
        self.recorded = true;
        self.breaker.on_failure(self.generation);
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if !self.recorded {
            self.breaker.on_failure(self.generation);
        }
    }
}
