//! PTG operator CLI entrypoint.
//!
//! - `ptg decide` - Evaluate decision requests against a fresh service
//! - `ptg simulate` - Replay a timestamped arrival log
//! - `ptg serve` - JSON-lines policy service on stdin/stdout
//! - `ptg check-config` - Validate and print the resolved configuration

#![forbid(unsafe_code)]

mod check_config;
mod decide;
mod input;
mod serve;
mod settings;
mod simulate;

use clap::{Parser, Subcommand};
use ptg_telemetry::TelemetryConfig;

use crate::settings::GlobalArgs;

/// Poisson trust gate operator CLI.
#[derive(Parser)]
#[command(name = "ptg")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate one request, or a JSON-lines file of requests.
    ///
    /// Example: ptg decide --identifier 10.0.0.1 --delta 1.02
    Decide(decide::DecideArgs),

    /// Replay a timestamped arrival log through the policy.
    ///
    /// Input lines are `{"identifier": .., "timestamp": ..}` JSON or
    /// `identifier,timestamp` CSV. Per-sender deltas are derived from the
    /// timestamps.
    Simulate(simulate::SimulateArgs),

    /// Serve decisions over stdin/stdout, one JSON object per line.
    ///
    /// Each request line may carry `op` (`decide`, `stats`, `debug`, `reset`;
    /// default `decide`) and a `requestId` echoed in the response.
    Serve(serve::ServeArgs),

    /// Validate configuration and print it with defaults filled in.
    CheckConfig(check_config::CheckConfigArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut telemetry = TelemetryConfig::new("ptg")
        .with_log_level(cli.global.log_level.clone())
        .with_json_logs(cli.global.json_logs);
    if let Some(port) = cli.global.prometheus_port {
        telemetry = telemetry.with_prometheus(port);
    }
    ptg_telemetry::init_telemetry(&telemetry)?;

    match cli.command {
        Commands::Decide(args) => decide::run(&cli.global, &args),
        Commands::Simulate(args) => simulate::run(&cli.global, &args),
        Commands::Serve(args) => serve::run(&cli.global, &args),
        Commands::CheckConfig(args) => check_config::run(&cli.global, &args),
    }
}
