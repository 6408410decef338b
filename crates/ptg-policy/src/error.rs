//! Error types for ptg-policy.

use thiserror::Error;

/// Errors surfaced by the policy engine.
///
/// Only boundary conditions are represented here: malformed requests and
/// invalid configuration. Once a request has been admitted into the service,
/// evaluation cannot fail.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// Request rejected before reaching the engine.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration rejected at startup.
    #[error("invalid policy configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be parsed.
    #[error("failed to parse policy configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration file could not be read.
    #[error("failed to read policy configuration: {0}")]
    Io(#[from] std::io::Error),
}

impl PolicyError {
    /// Stable machine-readable code for wire responses.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "policy.invalid_request",
            Self::InvalidConfig(_) => "policy.invalid_config",
            Self::ConfigParse(_) => "policy.config_parse",
            Self::Io(_) => "policy.io",
        }
    }
}

/// Result type for policy operations.
pub type PolicyResult<T> = Result<T, PolicyError>;
