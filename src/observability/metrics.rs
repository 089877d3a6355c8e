//! Metrics collection and exposition.
//!
//! # Metrics
//! - `control_plane_requests_total` (counter): requests by method, route, status
//! - `control_plane_request_duration_seconds` (histogram): API latency
//! - `control_plane_issuance_total` (counter): issuances by provider, outcome
//! - `control_plane_issuance_duration_seconds` (histogram): time to issue
//!
//! # Design Decisions
//! - Route labels use the matched template, never the raw path, so domain
//!   names and tokens do not explode label cardinality

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(method: &str, route: &str, status: u16, start: Instant) {
    let elapsed = start.elapsed().as_secs_f64();

    ::metrics::counter!(
        "control_plane_requests_total",
        "method" => method.to_owned(),
        "route" => route.to_owned(),
        "status" => status.to_string()
    )
    .increment(1);

    ::metrics::histogram!(
        "control_plane_request_duration_seconds",
        "method" => method.to_owned(),
        "route" => route.to_owned()
    )
    .record(elapsed);
}

pub fn record_issuance(provider: &str, success: bool, start: Instant) {
    let outcome = if success { "success" } else { "failure" };

    ::metrics::counter!(
        "control_plane_issuance_total",
        "provider" => provider.to_owned(),
        "outcome" => outcome
    )
    .increment(1);

    ::metrics::histogram!(
        "control_plane_issuance_duration_seconds",
        "provider" => provider.to_owned()
    )
    .record(start.elapsed().as_secs_f64());
}
