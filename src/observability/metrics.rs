//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_fix_requests_total` (counter): requests passed through the fix
//! - `proxy_fix_header_applied_total` (counter): trusted header values used, by header
//! - `proxy_fix_header_rejected_total` (counter): trusted values that failed to parse, by header
//! - `proxy_fix_config_reloads_total` (counter): reload attempts, by outcome

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request() {
    metrics::counter!("proxy_fix_requests_total").increment(1);
}

pub fn record_header_applied(header: &'static str) {
    metrics::counter!("proxy_fix_header_applied_total", "header" => header).increment(1);
}

pub fn record_header_rejected(header: &'static str) {
    metrics::counter!("proxy_fix_header_rejected_total", "header" => header).increment(1);
}

pub fn record_config_reload(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    metrics::counter!("proxy_fix_config_reloads_total", "outcome" => outcome).increment(1);
}
