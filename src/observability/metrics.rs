//! Metrics collection and exposition.
//!
//! # Metrics
//! - `web_group_member_exits_total` (counter): member exits by member, outcome
//! - `web_gateway_registrations_total` (counter): accepted worker registrations
//! - `web_dispatch_requests_total` (counter): API requests by route
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint on `addr`.
///
/// `environment` is attached to every series as a global label.
pub fn init_metrics(addr: SocketAddr, environment: Option<&str>) -> Result<(), BuildError> {
    let mut builder = PrometheusBuilder::new().with_http_listener(addr);
    if let Some(environment) = environment {
        builder = builder.add_global_label("environment", environment);
    }
    builder.install()?;

    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_member_exit(member: &str, outcome: &'static str) {
    metrics::counter!(
        "web_group_member_exits_total",
        "member" => member.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_registration() {
    metrics::counter!("web_gateway_registrations_total").increment(1);
}

pub fn record_dispatch_request(route: &'static str) {
    metrics::counter!("web_dispatch_requests_total", "route" => route).increment(1);
}
