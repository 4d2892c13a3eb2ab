//! Metrics collection and exposition.
//!
//! # Metrics
//! - `invocations_total` (counter): invocations by status code
//! - `invocation_duration_seconds` (histogram): end-to-end adaptation latency
//! - `handler_failures_total` (counter): handler errors/timeouts by route
//! - `adapter_failures_total` (counter): events the adapter itself failed on
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; with no recorder installed
//!   (the Lambda default) every call is a no-op
//! - The Prometheus exporter is only started by the local server

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Start the Prometheus scrape endpoint and install it as global recorder.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_invocation(status: u16, start: Instant) {
    metrics::counter!("invocations_total", "status" => status.to_string()).increment(1);
    metrics::histogram!("invocation_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_handler_failure(route: &str, kind: &'static str) {
    metrics::counter!(
        "handler_failures_total",
        "route" => route.to_string(),
        "kind" => kind
    )
    .increment(1);
}

pub fn record_adapter_failure() {
    metrics::counter!("adapter_failures_total").increment(1);
}
