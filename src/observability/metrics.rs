//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): inbound requests by method, route, status
//! - `gateway_request_duration_seconds` (histogram): inbound latency
//! - `gateway_upstream_calls_total` (counter): upstream calls by upstream, outcome
//! - `gateway_upstream_duration_seconds` (histogram): upstream latency
//! - `gateway_events_published_total` (counter): orchestrator events by outcome

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Start the Prometheus scrape listener and install it as the global recorder.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(method: &str, route: &str, status: u16, start: Instant) {
    counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        "gateway_request_duration_seconds",
        "method" => method.to_string(),
        "route" => route.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

/// `outcome` is the status code, or `transport_error`.
pub fn record_upstream_call(upstream: &'static str, outcome: &str, start: Instant) {
    counter!(
        "gateway_upstream_calls_total",
        "upstream" => upstream,
        "outcome" => outcome.to_string()
    )
    .increment(1);
    histogram!("gateway_upstream_duration_seconds", "upstream" => upstream)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_event_published(kind: &'static str, outcome: &'static str) {
    counter!("gateway_events_published_total", "type" => kind, "outcome" => outcome).increment(1);
}
