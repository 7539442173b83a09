use anyhow::{Context, Result};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

pub fn describe() {
    describe_counter!(
        "dashboard_ticks_total",
        "Reconciliation ticks by outcome (rebuild, refresh, failed)."
    );
    describe_gauge!(
        "dashboard_positions_fetched",
        "Raw position records in the last fetch."
    );
    describe_counter!(
        "dashboard_icon_fetch_failures_total",
        "Token icon metadata fetches that failed."
    );
    describe_counter!(
        "dashboard_trades_submitted_total",
        "Per-wallet trade requests accepted by the API."
    );
    describe_counter!(
        "dashboard_api_requests_total",
        "Number of API requests made."
    );
    describe_histogram!(
        "dashboard_api_latency_ms",
        "API request latency in milliseconds."
    );
    describe_counter!(
        "dashboard_log_events_total",
        "WARN and ERROR log events by level."
    );
}

/// Install the global recorder and serve `/metrics` on localhost. Must be
/// called from inside the runtime, which then drives the listener.
pub fn install_prometheus(port: u16) -> Result<()> {
    let addr: SocketAddr = ([127, 0, 0, 1], port).into();
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .with_context(|| format!("failed to start prometheus exporter on {addr}"))
}
