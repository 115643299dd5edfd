//! Metrics collection and exposition.
//!
//! # Metrics
//! - `client_requests_total` (counter): dispatched requests by method, status
//! - `client_request_duration_seconds` (histogram): request latency
//! - `session_refresh_total` (counter): renewal demands by outcome
//!   (`renewed`, `rejected`, `throttled`, `joined`)
//! - `session_replays_total` (counter): requests replayed after renewal
//! - `session_teardowns_total` (counter): teardowns by kind (`escalated`, `logout`)
//! - `csrf_fetch_total` (counter): token lookups by outcome (`cached`, `fetched`, `failed`)

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;
use reqwest::Method;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, address = %addr, "Failed to install metrics exporter"),
    }
}

/// Record one dispatched request. `status` is `"error"` when no response arrived.
pub fn record_request(method: &Method, status: &str, start: Instant) {
    metrics::counter!(
        "client_requests_total",
        "method" => method.as_str().to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("client_request_duration_seconds", "method" => method.as_str().to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_refresh(outcome: &'static str) {
    metrics::counter!("session_refresh_total", "outcome" => outcome).increment(1);
}

pub fn record_replay() {
    metrics::counter!("session_replays_total").increment(1);
}

pub fn record_teardown(kind: &'static str) {
    metrics::counter!("session_teardowns_total", "kind" => kind).increment(1);
}

pub fn record_csrf_fetch(outcome: &'static str) {
    metrics::counter!("csrf_fetch_total", "outcome" => outcome).increment(1);
}
