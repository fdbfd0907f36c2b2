//! Metrics collection and exposition.
//!
//! # Metrics
//! - `lb_requests_total` (counter): forwarded requests by method, status, upstream
//! - `lb_request_duration_seconds` (histogram): latency until response headers
//! - `lb_throttled_total` (counter): requests rejected by admission control
//! - `lb_selections_total` (counter): selections by strategy and server

use std::net::SocketAddr;
use std::time::Instant;

use metrics::Label;
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, upstream: &str, start: Instant) {
    let labels = vec![
        Label::new("method", method.to_string()),
        Label::new("status", status.to_string()),
        Label::new("upstream", upstream.to_string()),
    ];
    metrics::counter!("lb_requests_total", labels.clone()).increment(1);
    metrics::histogram!("lb_request_duration_seconds", labels)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_throttled() {
    metrics::counter!("lb_throttled_total").increment(1);
}

pub fn record_selection(strategy: &'static str, server: &str) {
    metrics::counter!(
        "lb_selections_total",
        "strategy" => strategy,
        "server" => server.to_string()
    )
    .increment(1);
}
