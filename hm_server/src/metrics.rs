//! Prometheus metrics for monitoring pairing server health.
//!
//! Metrics are exposed in Prometheus text format on a dedicated listener,
//! enabled by setting `METRICS_BIND`.
//!
//! # Metrics Categories
//!
//! - **HTTP Metrics**: Request counts by method, path, and status
//! - **Pairing Metrics**: Codes registered/redeemed/swept, live code count
//! - **Auth Metrics**: Mobile token verification outcomes, throttled clients

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

/// Record an HTTP request with method, path, and status labels.
pub fn http_requests_total(method: &str, path: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Increment the connection codes registered counter.
pub fn codes_registered_total() {
    metrics::counter!("codes_registered_total").increment(1);
}

/// Record a redemption attempt outcome.
pub fn codes_redeemed_total(success: bool) {
    metrics::counter!("codes_redeemed_total",
        "success" => success.to_string()
    )
    .increment(1);
}

/// Set the current live connection code count.
pub fn active_connection_codes(count: usize) {
    metrics::gauge!("active_connection_codes").set(count as f64);
}

/// Record a mobile token verification outcome.
pub fn token_verifications_total(success: bool) {
    metrics::counter!("token_verifications_total",
        "success" => success.to_string()
    )
    .increment(1);
}

/// Increment the rate limit hits counter for an endpoint.
pub fn rate_limit_hits_total(endpoint: &str) {
    metrics::counter!("rate_limit_hits_total",
        "endpoint" => endpoint.to_string()
    )
    .increment(1);
}
