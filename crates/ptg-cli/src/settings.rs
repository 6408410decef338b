//! Flags shared by every subcommand and configuration resolution.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use ptg_policy::{PolicyConfig, PolicyService, TrackerKind};

/// Global flags.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Policy configuration file (TOML). Defaults apply when omitted.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the tracker strategy (percentile, top_k, disabled).
    #[arg(long, global = true)]
    pub strategy: Option<TrackerKind>,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Serve Prometheus metrics on this port.
    #[arg(long, global = true)]
    pub prometheus_port: Option<u16>,
}

impl GlobalArgs {
    /// Configuration from file (or defaults) with flag overrides applied.
    pub fn resolve_config(&self) -> Result<PolicyConfig> {
        let mut config = match &self.config {
            Some(path) => PolicyConfig::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => PolicyConfig::default(),
        };
        if let Some(strategy) = self.strategy {
            config = config.with_tracker(strategy);
        }
        config.validate().context("invalid policy configuration")?;
        Ok(config)
    }

    /// Build a service from the resolved configuration.
    pub fn build_service(&self) -> Result<PolicyService> {
        let config = self.resolve_config()?;
        PolicyService::new(config).context("failed to start policy service")
    }
}
