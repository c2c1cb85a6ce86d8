//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by route, status
//! - `gateway_request_duration_seconds` (histogram): latency by route
//! - `gateway_auth_outcomes_total` (counter): filter decisions by filter, outcome
//! - `gateway_reissue_total` (counter): reissue calls by result
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so tests need no setup
//! - Labels are low-cardinality: route ids, filter names, fixed outcome strings

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and serve `/metrics` on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    metrics::describe_counter!("gateway_requests_total", "Requests handled, by route and status");
    metrics::describe_histogram!(
        "gateway_request_duration_seconds",
        metrics::Unit::Seconds,
        "End-to-end request latency"
    );
    metrics::describe_counter!("gateway_auth_outcomes_total", "Authentication and authorization decisions");
    metrics::describe_counter!("gateway_reissue_total", "Token reissue attempts, by result");

    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(route: &str, status: u16, started: Instant) {
    metrics::counter!(
        "gateway_requests_total",
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("gateway_request_duration_seconds", "route" => route.to_string())
        .record(started.elapsed().as_secs_f64());
}

pub fn record_auth_outcome(filter: &'static str, outcome: &'static str) {
    metrics::counter!("gateway_auth_outcomes_total", "filter" => filter, "outcome" => outcome).increment(1);
}

pub fn record_reissue(result: &'static str) {
    metrics::counter!("gateway_reissue_total", "result" => result).increment(1);
}
