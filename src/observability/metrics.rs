//! Metrics collection and exposition.
//!
//! # Metrics
//! - `mock_requests_total` (counter): dispatched requests by method, status, matched
//! - `mock_request_duration_seconds` (histogram): dispatch latency
//! - `mock_match_cache_total` (counter): matcher cache lookups by result
//! - `mock_routes_loaded` (gauge): routes in the live registry generation

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::routing::Method;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_dispatch(method: Method, status: u16, matched: bool, start: Instant) {
    let labels = [
        ("method", method.as_str().to_string()),
        ("status", status.to_string()),
        ("matched", matched.to_string()),
    ];
    metrics::counter!("mock_requests_total", &labels).increment(1);
    metrics::histogram!("mock_request_duration_seconds", "method" => method.as_str())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_match_cache(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    metrics::counter!("mock_match_cache_total", "result" => result).increment(1);
}

pub fn record_routes_loaded(count: usize) {
    metrics::gauge!("mock_routes_loaded").set(count as f64);
}
