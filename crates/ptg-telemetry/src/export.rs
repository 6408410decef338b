//! Prometheus exposition.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::TelemetryError;

/// Install the Prometheus recorder and serve `/metrics` on `port`.
///
/// # Errors
///
/// Returns an error if a recorder is already installed or the listener
/// cannot be started.
pub fn init_prometheus_exporter(port: u16) -> Result<(), TelemetryError> {
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    tracing::info!(port, "Prometheus metrics exporter started");

    Ok(())
}
