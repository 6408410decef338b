//! `ptg check-config` command implementation.

use anyhow::{Context, Result};
use clap::Args;
use ptg_policy::PolicyConfig;

use crate::settings::GlobalArgs;

/// Arguments for `ptg check-config`.
#[derive(Args, Debug)]
pub struct CheckConfigArgs {
    /// Print the resolved configuration as JSON instead of TOML.
    #[arg(long)]
    pub json: bool,
}

/// Run the check-config command.
pub fn run(global: &GlobalArgs, args: &CheckConfigArgs) -> Result<()> {
    let config = global.resolve_config()?;
    print!("{}", render(&config, args.json)?);
    Ok(())
}

fn render(config: &PolicyConfig, json: bool) -> Result<String> {
    if json {
        let mut out = serde_json::to_string_pretty(config)?;
        out.push('\n');
        Ok(out)
    } else {
        toml::to_string_pretty(config).context("failed to render configuration")
    }
}
