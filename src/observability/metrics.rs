//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_webhooks_total` (counter): inbound webhooks by `outcome`
//! - `relay_dispatch_duration_seconds` (histogram): upstream attempt latency
//! - `relay_target_updates_total` (counter): admin target updates by `result`
//!
//! Without an installed recorder every call is a no-op.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter")
        }
    }
}

/// Record one relayed webhook.
pub fn record_webhook(outcome: &'static str, dispatch_elapsed: Duration) {
    counter!("relay_webhooks_total", "outcome" => outcome).increment(1);
    histogram!("relay_dispatch_duration_seconds").record(dispatch_elapsed.as_secs_f64());
}

/// Record an administrative target update attempt.
pub fn record_target_update(result: &'static str) {
    counter!("relay_target_updates_total", "result" => result).increment(1);
}
