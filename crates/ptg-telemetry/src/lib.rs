//! PTG Telemetry - Logging and metrics for the admission engine
//!
//! - **Structured Logging**: JSON or pretty `tracing` output filtered by `RUST_LOG`
//! - **Metrics Collection**: decision counters, population gauges, latency histogram
//! - **Export**: optional Prometheus scrape endpoint
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use ptg_telemetry::{TelemetryConfig, init_telemetry};
//!
//! init_telemetry(&TelemetryConfig::new("ptg").with_log_level("debug"))?;
//! tracing::info!("policy service starting");
//! ptg_telemetry::metrics::record_decision("high", 0.000_012);
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod export;
mod logging;
pub mod metrics;

pub use export::*;
pub use logging::*;

/// Configuration for telemetry initialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Service name attached to startup logs.
    pub service_name: String,

    /// Default log filter when `RUST_LOG` is unset (e.g. "info", "ptg_policy=debug").
    pub log_level: String,

    /// Emit JSON lines instead of human-readable output.
    pub json_logs: bool,

    /// Serve Prometheus metrics.
    pub prometheus_enabled: bool,

    /// Prometheus listener port.
    pub prometheus_port: u16,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "ptg".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            prometheus_enabled: false,
            prometheus_port: 9090,
        }
    }
}

impl TelemetryConfig {
    /// Create a new configuration with the given service name.
    #[must_use]
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Default::default()
        }
    }

    /// Set the log level.
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Enable or disable JSON logs.
    #[must_use]
    pub const fn with_json_logs(mut self, enabled: bool) -> Self {
        self.json_logs = enabled;
        self
    }

    /// Enable Prometheus metrics on the given port.
    #[must_use]
    pub const fn with_prometheus(mut self, port: u16) -> Self {
        self.prometheus_enabled = true;
        self.prometheus_port = port;
        self
    }
}

/// Install the global subscriber, register metric descriptions and start the
/// exporter if configured.
///
/// Call once at process start.
///
/// # Errors
///
/// Returns an error if a global subscriber or metrics recorder is already
/// installed, or the exporter cannot bind its port.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    init_logging(config)?;

    if config.prometheus_enabled {
        init_prometheus_exporter(config.prometheus_port)?;
    }
    metrics::init_metrics();

    tracing::debug!(
        service = %config.service_name,
        json_logs = config.json_logs,
        prometheus = config.prometheus_enabled,
        "telemetry initialised"
    );
    Ok(())
}

/// Telemetry error type.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Failed to initialize logging.
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    /// Failed to initialize metrics.
    #[error("Failed to initialize metrics: {0}")]
    MetricsInit(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_telemetry_config_default() {
        let config = TelemetryConfig::default();

        assert_eq!(config.service_name, "ptg");
        assert_eq!(config.log_level, "info");
        assert!(!config.json_logs);
        assert!(!config.prometheus_enabled);
        assert_eq!(config.prometheus_port, 9090);
    }

    #[test]
    fn test_telemetry_config_builder_chain() {
        let config = TelemetryConfig::new("edge-gate")
            .with_log_level("ptg_policy=trace")
            .with_json_logs(true)
            .with_prometheus(9191);

        assert_eq!(config.service_name, "edge-gate");
        assert_eq!(config.log_level, "ptg_policy=trace");
        assert!(config.json_logs);
        assert!(config.prometheus_enabled);
        assert_eq!(config.prometheus_port, 9191);
    }

    #[test]
    fn test_telemetry_error_display() {
        let error = TelemetryError::LoggingInit("already set".to_string());
        assert_eq!(error.to_string(), "Failed to initialize logging: already set");

        let error = TelemetryError::MetricsInit("port in use".to_string());
        assert!(error.to_string().contains("port in use"));
    }
}
