//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (periods > 0, thresholds in range)
//! - Validate addresses parse as socket addresses
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: CatalogConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::CatalogConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Check every semantic rule and collect all violations.
pub fn validate_config(config: &CatalogConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    if config.limits.max_body_bytes == 0 {
        errors.push(ValidationError::new("limits.max_body_bytes", "must be greater than 0"));
    }

    let rate_limit = &config.rate_limit;
    if rate_limit.limit_for_period == 0 {
        errors.push(ValidationError::new("rate_limit.limit_for_period", "must be greater than 0"));
    }
    if rate_limit.refresh_period_ms == 0 {
        errors.push(ValidationError::new("rate_limit.refresh_period_ms", "must be greater than 0"));
    }

    let retries = &config.retries;
    if retries.max_attempts == 0 {
        errors.push(ValidationError::new("retries.max_attempts", "must be at least 1"));
    }
    if retries.base_delay_ms > retries.max_delay_ms {
        errors.push(ValidationError::new(
            "retries.base_delay_ms",
            "must not exceed retries.max_delay_ms",
        ));
    }

    let breaker = &config.circuit_breaker;
    if breaker.sliding_window_size == 0 {
        errors.push(ValidationError::new(
            "circuit_breaker.sliding_window_size",
            "must be at least 1",
        ));
    }
    if breaker.minimum_calls == 0 || breaker.minimum_calls > breaker.sliding_window_size {
        errors.push(ValidationError::new(
            "circuit_breaker.minimum_calls",
            "must be between 1 and sliding_window_size",
        ));
    }
    if !(breaker.failure_rate_threshold > 0.0 && breaker.failure_rate_threshold <= 1.0) {
        errors.push(ValidationError::new(
            "circuit_breaker.failure_rate_threshold",
            "must be in the range (0.0, 1.0]",
        ));
    }
    if breaker.permitted_calls_in_half_open == 0 {
        errors.push(ValidationError::new(
            "circuit_breaker.permitted_calls_in_half_open",
            "must be at least 1",
        ));
    }

    let observability = &config.observability;
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
