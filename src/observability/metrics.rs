//! Metrics collection and exposition.
//!
//! # Metrics
//! - `storefront_requests_total` (counter): requests by method, status
//! - `storefront_request_duration_seconds` (histogram): latency distribution
//! - `storefront_rate_limited_total` (counter): gate rejections by reason
//! - `storefront_auth_failures_total` (counter): authentication failures by reason
//! - `storefront_tracked_clients` (gauge): clients with a live rate window
//! - `storefront_blocked_clients` (gauge): block-list size

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "storefront_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("storefront_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited(reason: &'static str) {
    counter!("storefront_rate_limited_total", "reason" => reason).increment(1);
}

pub fn record_auth_failure(reason: &'static str) {
    counter!("storefront_auth_failures_total", "reason" => reason).increment(1);
}

pub fn record_gate_size(tracked: usize, blocked: usize) {
    gauge!("storefront_tracked_clients").set(tracked as f64);
    gauge!("storefront_blocked_clients").set(blocked as f64);
}
