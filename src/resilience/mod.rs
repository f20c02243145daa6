//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! list():
//!     → rate_limit.rs (admit or reject immediately)
//!     → store
//!
//! get_by_id():
//!     → circuit_breaker.rs (reject while open, record outcome)
//!     → retries.rs (retry transient store faults with backoff.rs delays)
//!     → store
//! ```
//!
//! # Design Decisions
//! - One component instance per guarded operation, owned by the service
//! - Rejections never queue; callers get an immediate failure
//! - Backoff sleeps on the tokio timer so other calls keep running

pub mod backoff;
pub mod circuit_breaker;
pub mod rate_limit;
pub mod retries;

use crate::catalog::StoreError;

pub use circuit_breaker::{CallError, CircuitBreaker, CircuitState};
pub use rate_limit::AdmissionLimiter;
pub use retries::{RetryExhausted, RetryPolicy, Retryable};

/// Why a guarded call gave up.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GuardError {
    /// The breaker rejected the call without touching the store.
    #[error("circuit breaker '{0}' is open")]
    CircuitOpen(String),

    /// Every permitted attempt failed; `last` is the final store error.
    #[error("gave up after {attempts} attempt(s)")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: StoreError,
    },
}
