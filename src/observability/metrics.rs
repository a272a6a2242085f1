//! Metrics collection and exposition.
//!
//! # Metrics
//! - `grab_requests_total` (counter): requests by endpoint and status
//! - `grab_request_duration_seconds` (histogram): time to response headers
//! - `grab_rejections_total` (counter): rejections by reason
//! - `grab_active_streams` (gauge): concurrency slots currently held
//! - `grab_bytes_relayed_total` (counter): body bytes written to clients
//! - `grab_relay_failures_total` (counter): relays that ended early
//! - `grab_relay_truncations_total` (counter): relays cut at the size cap
//! - `grab_rate_limiter_clients` (gauge): entries left after each sweep
//!
//! Without an installed recorder every call here is a no-op.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(endpoint: &'static str, status: u16, start: Instant) {
    counter!("grab_requests_total", "endpoint" => endpoint, "status" => status.to_string())
        .increment(1);
    histogram!("grab_request_duration_seconds", "endpoint" => endpoint)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_rejection(reason: &'static str) {
    counter!("grab_rejections_total", "reason" => reason).increment(1);
}

pub fn stream_slot_acquired() {
    gauge!("grab_active_streams").increment(1.0);
}

pub fn stream_slot_released() {
    gauge!("grab_active_streams").decrement(1.0);
}

pub fn record_bytes_relayed(bytes: u64) {
    counter!("grab_bytes_relayed_total").increment(bytes);
}

pub fn record_relay_failure() {
    counter!("grab_relay_failures_total").increment(1);
}

pub fn record_relay_truncation() {
    counter!("grab_relay_truncations_total").increment(1);
}

pub fn record_rate_limiter_clients(count: usize) {
    gauge!("grab_rate_limiter_clients").set(count as f64);
}
