//! Metrics collection and exposition.
//!
//! # Metrics
//! - `super_info_requests_total` (counter): aggregation requests by outcome
//! - `super_info_request_duration_seconds` (histogram): handler latency
//! - `upstream_calls_total` (counter): upstream calls by service, outcome
//! - `circuit_breaker_state` (gauge): 0=closed, 1=half-open, 2=open
//! - `cache_lookups_total` (counter): hits and misses
//! - `cache_entries` (gauge): stored aggregates
//! - `rate_limited_total` (counter): rejected requests
//! - `rate_limiter_clients` (gauge): tracked client windows
//!
//! Recording is a no-op until `init_metrics` installs the exporter.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(outcome: &'static str, start: Instant) {
    counter!("super_info_requests_total", "outcome" => outcome).increment(1);
    histogram!("super_info_request_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_upstream_call(service: &str, outcome: &'static str) {
    counter!("upstream_calls_total", "service" => service.to_string(), "outcome" => outcome)
        .increment(1);
}

pub fn record_breaker_state(service: &str, value: f64) {
    gauge!("circuit_breaker_state", "service" => service.to_string()).set(value);
}

pub fn record_cache_lookup(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!("cache_lookups_total", "result" => result).increment(1);
}

pub fn record_cache_size(size: usize) {
    gauge!("cache_entries").set(size as f64);
}

pub fn record_rate_limited() {
    counter!("rate_limited_total").increment(1);
}

pub fn record_rate_limiter_clients(count: usize) {
    gauge!("rate_limiter_clients").set(count as f64);
}
