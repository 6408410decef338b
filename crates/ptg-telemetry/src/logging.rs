//! Structured logging setup.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::{TelemetryConfig, TelemetryError};

/// Build the filter: `RUST_LOG` wins, otherwise the configured level.
///
/// # Errors
///
/// Returns an error if neither source yields a valid directive.
pub fn env_filter(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.log_level)
            .map_err(|e| TelemetryError::LoggingInit(format!("{}: {e}", config.log_level))),
    }
}

/// Install the global `tracing` subscriber.
///
/// Logs go to stderr so stdout stays free for decision output.
///
/// # Errors
///
/// Returns an error for an invalid filter or if a subscriber is already set.
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let subscriber = tracing_subscriber::registry().with(env_filter(config)?);

    if config.json_logs {
        let json_layer = fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_thread_ids(true)
            .with_target(true)
            .with_writer(std::io::stderr);

        subscriber
            .with(json_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    } else {
        let pretty_layer = fmt::layer()
            .with_ansi(true)
            .with_target(true)
            .with_writer(std::io::stderr);

        subscriber
            .with(pretty_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    }

    Ok(())
}
