//! Typed failures and their classification.
//!
//! # Data Flow
//! ```text
//! service.rs / http boundary
//!     → Failure (typed value returned through Result)
//!     → classifier.rs (first-match table: FailureKind → handler)
//!     → response.rs (ErrorResponse: status + ordered messages)
//!     → serialized by the HTTP boundary
//! ```
//!
//! # Design Decisions
//! - Failures are values; nothing unwinds
//! - Every failure maps to exactly one response with at least one message
//! - The handler table is built once and only read afterwards

pub mod classifier;
pub mod response;

use std::fmt;
use std::time::Duration;

use crate::catalog::{ProductId, StoreError};
use crate::resilience::GuardError;

pub use classifier::{Classifier, ClassifierBuilder, ClassifierError, Handler};
pub use response::ErrorResponse;

/// A single invalid field in a request payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub reason: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

/// Classified outcome of a failed catalog operation.
#[derive(Debug, thiserror::Error)]
pub enum Failure {
    /// Payload was well-formed but one or more fields are invalid.
    #[error("request validation failed on {} field(s)", .0.len())]
    Validation(Vec<FieldError>),

    /// Payload could not be read or decoded.
    #[error("{0}")]
    Malformed(String),

    #[error("{0}")]
    BadRequest(String),

    /// The store rejected or failed the call.
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("product not found with id: {0}")]
    NotFound(ProductId),

    /// Admission was denied by a rate limiter.
    #[error("{0}")]
    RateLimited(String),

    /// Lookup gave up because the store kept failing or the circuit is open.
    #[error("product service is currently unavailable; requested id: {id}")]
    Unavailable {
        id: ProductId,
        #[source]
        cause: GuardError,
    },

    /// The request ran past the configured deadline and was abandoned.
    #[error("request did not complete within {}s", .0.as_secs())]
    TimedOut(Duration),

    #[error("method {method} is not supported on {path}")]
    MethodNotAllowed { method: String, path: String },

    #[error("{0}")]
    Internal(String),
}

/// Discriminant used to look up a classification handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Validation,
    Malformed,
    BadRequest,
    Constraint,
    Store,
    NotFound,
    RateLimited,
    Unavailable,
    TimedOut,
    MethodNotAllowed,
    Internal,
}

impl Failure {
    pub fn kind(&self) -> FailureKind {
        match self {
            Failure::Validation(_) => FailureKind::Validation,
            Failure::Malformed(_) => FailureKind::Malformed,
            Failure::BadRequest(_) => FailureKind::BadRequest,
            Failure::Store(StoreError::Constraint { .. }) => FailureKind::Constraint,
            Failure::Store(_) => FailureKind::Store,
            Failure::NotFound(_) => FailureKind::NotFound,
            Failure::RateLimited(_) => FailureKind::RateLimited,
            Failure::Unavailable { .. } => FailureKind::Unavailable,
            Failure::TimedOut(_) => FailureKind::TimedOut,
            Failure::MethodNotAllowed { .. } => FailureKind::MethodNotAllowed,
            Failure::Internal(_) => FailureKind::Internal,
        }
    }
}
