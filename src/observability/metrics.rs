//! Metrics collection and exposition.
//!
//! # Metrics
//! - `catalog_requests_total` (counter): service calls by operation
//! - `catalog_failures_total` (counter): classified failures by status
//! - `catalog_rate_limited_total` (counter): rejected admissions by limiter
//! - `catalog_retries_total` (counter): retry attempts by policy
//! - `catalog_circuit_state` (gauge): 0=closed, 1=open, 2=half-open
//!
//! Recording is a no-op until a recorder is installed, so library users and
//! tests pay nothing.

use std::net::SocketAddr;

use ::metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::resilience::CircuitState;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(operation: &'static str) {
    counter!("catalog_requests_total", "operation" => operation).increment(1);
}

pub fn record_failure(status: u16) {
    counter!("catalog_failures_total", "status" => status.to_string()).increment(1);
}

pub fn record_rate_limited(limiter: &str) {
    counter!("catalog_rate_limited_total", "limiter" => limiter.to_string()).increment(1);
}

pub fn record_retry(policy: &str) {
    counter!("catalog_retries_total", "policy" => policy.to_string()).increment(1);
}

pub fn record_circuit_state(breaker: &str, state: CircuitState) {
    gauge!("catalog_circuit_state", "breaker" => breaker.to_string()).set(state.as_gauge());
}
