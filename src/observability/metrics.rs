//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): aggregation requests by outcome
//! - `gateway_request_duration_seconds` (histogram): aggregation latency
//! - `gateway_upstream_calls_total` (counter): guarded calls by upstream, result
//! - `gateway_breaker_state` (gauge): 0=closed, 1=half-open, 2=open

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::resilience::CircuitState;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one finished `/aggregate` request.
pub fn record_aggregation(outcome: &'static str, start: Instant) {
    metrics::counter!("gateway_requests_total", "outcome" => outcome).increment(1);
    metrics::histogram!("gateway_request_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

/// Record the result of one guarded upstream call.
pub fn record_upstream_call(upstream: &str, result: &'static str) {
    metrics::counter!(
        "gateway_upstream_calls_total",
        "upstream" => upstream.to_string(),
        "result" => result
    )
    .increment(1);
}

pub fn record_breaker_state(breaker: &str, state: CircuitState) {
    let value = match state {
        CircuitState::Closed => 0.0,
        CircuitState::HalfOpen => 1.0,
        CircuitState::Open => 2.0,
    };
    metrics::gauge!("gateway_breaker_state", "breaker" => breaker.to_string()).set(value);
}
