//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by tenant, status
//! - `proxy_response_headers_seconds` (histogram): time until response
//!   headers are ready, by tenant
//! - `proxy_request_duration_seconds` (histogram): time a running slot was
//!   held, streaming included, by tenant
//! - `proxy_admission_rejected_total` (counter): 503s from a full wait queue
//! - `proxy_config_reloads_total` (counter): reloads by result

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus exporter on `addr`. Must run inside the runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a response whose headers are ready.
pub fn record_request(tenant: &str, status: u16, start: Instant) {
    ::metrics::counter!(
        "proxy_requests_total",
        "tenant" => tenant.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    ::metrics::histogram!("proxy_response_headers_seconds", "tenant" => tenant.to_string())
        .record(start.elapsed().as_secs_f64());
}

/// Record an admitted request whose response body has ended or been dropped.
pub fn record_completed(tenant: &str, start: Instant) {
    ::metrics::histogram!("proxy_request_duration_seconds", "tenant" => tenant.to_string())
        .record(start.elapsed().as_secs_f64());
}

/// Record a request turned away by a full wait queue.
pub fn record_rejected(tenant: &str) {
    ::metrics::counter!("proxy_admission_rejected_total", "tenant" => tenant.to_string()).increment(1);
}

/// Record the outcome of a configuration reload.
pub fn record_reload(ok: bool) {
    let result = if ok { "ok" } else { "error" };
    ::metrics::counter!("proxy_config_reloads_total", "result" => result).increment(1);
}
