//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): gated requests by action and outcome
//! - `gateway_rejections_total` (counter): rejections by reason
//! - `gateway_dispatch_duration_seconds` (histogram): handler latency by action
//! - `gateway_audit_failures_total` (counter): failed or timed-out audit deliveries
//! - `gateway_manifest_reloads_total` (counter): reload attempts by result
//! - `gateway_tracked_clients` (gauge): clients held by the rate limiter
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   exporter every call is a no-op, which is what tests rely on

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint started"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_rejection(action_id: &str, reason: &'static str) {
    counter!("gateway_rejections_total", "reason" => reason).increment(1);
    counter!(
        "gateway_requests_total",
        "action" => action_id.to_string(),
        "outcome" => reason
    )
    .increment(1);
}

pub fn record_dispatch(action_id: &str, status: u16, start: Instant) {
    let outcome = if (200..300).contains(&status) {
        "success"
    } else {
        "handler_error"
    };
    counter!(
        "gateway_requests_total",
        "action" => action_id.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    histogram!(
        "gateway_dispatch_duration_seconds",
        "action" => action_id.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_audit_failure() {
    counter!("gateway_audit_failures_total").increment(1);
}

pub fn record_manifest_reload(ok: bool) {
    let result = if ok { "success" } else { "failure" };
    counter!("gateway_manifest_reloads_total", "result" => result).increment(1);
}

pub fn record_tracked_clients(count: usize) {
    gauge!("gateway_tracked_clients").set(count as f64);
}
