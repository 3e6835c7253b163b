//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): total requests by method, status, backend
//! - `proxy_request_duration_seconds` (histogram): latency distribution
//! - `proxy_backend_health` (gauge): 1=healthy, 0=unhealthy
//!
//! # Design Decisions
//! - Low-overhead metric updates (atomic operations)
//! - Labels for method, backend, status code
//! - Recording is safe before `init_metrics`; samples are simply dropped

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram, Label};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on the given address.
///
/// Failures are logged, not fatal: the proxy keeps serving without a
/// metrics endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter started"),
        Err(e) => tracing::error!(error = %e, "Failed to start metrics exporter"),
    }
}

/// Record a completed (or failed) proxied request.
pub fn record_request(method: &str, status: u16, backend: &str, start: Instant) {
    let labels = vec![
        Label::new("method", method.to_string()),
        Label::new("status", status.to_string()),
        Label::new("backend", backend.to_string()),
    ];
    counter!("proxy_requests_total", labels.clone()).increment(1);
    histogram!("proxy_request_duration_seconds", labels).record(start.elapsed().as_secs_f64());
}

/// Record a backend health transition.
pub fn record_backend_health(backend: &str, healthy: bool) {
    gauge!("proxy_backend_health", "backend" => backend.to_string())
        .set(if healthy { 1.0 } else { 0.0 });
}
