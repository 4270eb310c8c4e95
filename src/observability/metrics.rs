//! Metrics collection and exposition.
//!
//! # Metrics
//! - `mask_requests_total` (counter): proxied requests by method, status
//! - `mask_request_duration_seconds` (histogram): end-to-end latency
//! - `mask_body_rewrites_total` (counter): response bodies rewritten
//! - `mask_body_skipped_total` (counter): bodies passed through, by reason
//! - `mask_route_translations_total` (counter): inbound paths translated, by role
//! - `mask_artifact_syncs_total` (counter): rule artifact writes, by result
//! - `mask_table_builds_total` (counter): replacement tables built

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "mask_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("mask_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_body_rewrite() {
    counter!("mask_body_rewrites_total").increment(1);
}

pub fn record_body_skip(reason: &'static str) {
    counter!("mask_body_skipped_total", "reason" => reason).increment(1);
}

pub fn record_route_translation(role: &'static str) {
    counter!("mask_route_translations_total", "role" => role).increment(1);
}

pub fn record_artifact_sync(result: &'static str) {
    counter!("mask_artifact_syncs_total", "result" => result).increment(1);
}

pub fn record_table_build() {
    counter!("mask_table_builds_total").increment(1);
}
