//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by destination, status
//! - `gateway_request_duration_seconds` (histogram): latency by destination
//! - `gateway_rate_limited_total` (counter): rejected requests by reason
//! - `gateway_rate_limiter_tracked_keys` (gauge): keys holding window state
//! - `gateway_rate_limiter_evicted_total` (counter): idle windows dropped
//!
//! Without an installed recorder every call here is a no-op.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder and its scrape endpoint.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(destination: &'static str, status: u16, start: Instant) {
    metrics::counter!(
        "gateway_requests_total",
        "destination" => destination,
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!(
        "gateway_request_duration_seconds",
        "destination" => destination
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited(reason: &'static str) {
    metrics::counter!("gateway_rate_limited_total", "reason" => reason).increment(1);
}

pub fn record_limiter_sweep(evicted: usize, remaining: usize) {
    metrics::counter!("gateway_rate_limiter_evicted_total").increment(evicted as u64);
    metrics::gauge!("gateway_rate_limiter_tracked_keys").set(remaining as f64);
}
