//! Metrics collection and exposition.
//!
//! # Metrics
//! - `collector_events_total` (counter): events by outcome (ok, bind, serialize, persist)
//! - `collector_event_duration_seconds` (histogram): pipeline latency
//! - `collector_origin_decisions_total` (counter): admissions by tier and decision
//! - `collector_enrichment_failures_total` (counter): failed lookups by kind
//!
//! # Design Decisions
//! - Recording without an installed exporter is a no-op, so tests need no setup
//! - Labels are static strings

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter and its scrape listener.
///
/// Must be called from within the Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_event(outcome: &'static str, started: Instant) {
    counter!("collector_events_total", "outcome" => outcome).increment(1);
    histogram!("collector_event_duration_seconds", "outcome" => outcome)
        .record(started.elapsed().as_secs_f64());
}

pub fn record_origin_decision(tier: &'static str, decision: &'static str) {
    counter!("collector_origin_decisions_total", "tier" => tier, "decision" => decision)
        .increment(1);
}

pub fn record_enrichment_failure(kind: &'static str) {
    counter!("collector_enrichment_failures_total", "kind" => kind).increment(1);
}
