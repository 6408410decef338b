//! `ptg simulate` command implementation.
//!
//! Replays an arrival log: timestamps become per-sender deltas through an
//! [`ArrivalClock`], every arrival is decided, and a summary is printed.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, ValueEnum};
use ptg_policy::{Action, ArrivalClock, Decision, DecisionRequest, PolicyService, StatsSnapshot};
use serde::{Deserialize, Serialize};

use crate::input::{content_lines, read_input};
use crate::settings::GlobalArgs;

/// Arguments for `ptg simulate`.
#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Arrival log (JSON lines or CSV). Use "-" for stdin.
    #[arg(long)]
    pub input: PathBuf,

    /// Print every decision, not only the summary.
    #[arg(long)]
    pub emit_decisions: bool,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub format: OutputFormat,
}

/// Output format for simulate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output.
    Human,
    /// JSON lines for tooling.
    Json,
}

/// One line of the arrival log.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ArrivalRecord {
    #[serde(alias = "ip")]
    pub identifier: String,
    /// Receive time in seconds.
    #[serde(alias = "time")]
    pub timestamp: f64,
}

/// One replayed arrival.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayedArrival {
    pub line: usize,
    pub identifier: String,
    pub timestamp: f64,
    pub delta: f64,
    pub sequence: u64,
    pub decision: Decision,
}

/// Outcome of a replay.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationSummary {
    pub arrivals: usize,
    pub senders: usize,
    /// Decisions per action, over all arrivals.
    pub decisions: BTreeMap<Action, usize>,
    pub final_state: StatsSnapshot,
}

/// Run the simulate command.
pub fn run(global: &GlobalArgs, args: &SimulateArgs) -> Result<()> {
    let service = global.build_service()?;
    let raw = read_input(&args.input)?;
    let records = parse_log(&raw)?;
    tracing::info!(
        arrivals = records.len(),
        strategy = %service.config().tracker,
        "replaying arrival log"
    );

    let (replayed, summary) = replay(&service, &records);

    if args.emit_decisions {
        for arrival in &replayed {
            match args.format {
                OutputFormat::Json => println!("{}", serde_json::to_string(arrival)?),
                OutputFormat::Human => println!(
                    "{:>6} {:<24} delta={:<10.4} trust={:.4} -> {}",
                    arrival.line,
                    arrival.identifier,
                    arrival.delta,
                    arrival.decision.trust,
                    arrival.decision.action
                ),
            }
        }
    }

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&summary)?),
        OutputFormat::Human => print_human_summary(&summary),
    }
    Ok(())
}

/// Parse an arrival log; each line is either a JSON object or `identifier,timestamp`.
pub fn parse_log(raw: &str) -> Result<Vec<(usize, ArrivalRecord)>> {
    content_lines(raw)
        .map(|(line_no, line)| {
            parse_line(line)
                .with_context(|| format!("line {line_no}: invalid arrival"))
                .map(|record| (line_no, record))
        })
        .collect()
}

fn parse_line(line: &str) -> Result<ArrivalRecord> {
    let record = if line.starts_with('{') {
        serde_json::from_str::<ArrivalRecord>(line)?
    } else {
        let Some((identifier, timestamp)) = line.rsplit_once(',') else {
            bail!("expected `identifier,timestamp`");
        };
        ArrivalRecord {
            identifier: identifier.trim().to_string(),
            timestamp: timestamp
                .trim()
                .parse()
                .with_context(|| format!("bad timestamp `{}`", timestamp.trim()))?,
        }
    };
    if !record.timestamp.is_finite() {
        bail!("timestamp must be finite");
    }
    DecisionRequest::new(record.identifier.as_str(), 0.0).validate()?;
    Ok(record)
}

/// Feed `records` through `service` in file order.
pub fn replay(
    service: &PolicyService,
    records: &[(usize, ArrivalRecord)],
) -> (Vec<ReplayedArrival>, SimulationSummary) {
    let mut clock = ArrivalClock::new();
    let mut decisions: BTreeMap<Action, usize> = BTreeMap::new();
    let mut replayed = Vec::with_capacity(records.len());

    for (line, record) in records {
        let arrival = clock.observe(&record.identifier, record.timestamp);
        let decision = service.evaluate(&record.identifier, arrival.delta);
        *decisions.entry(decision.action).or_default() += 1;
        replayed.push(ReplayedArrival {
            line: *line,
            identifier: record.identifier.clone(),
            timestamp: record.timestamp,
            delta: arrival.delta,
            sequence: arrival.sequence,
            decision,
        });
    }

    let summary = SimulationSummary {
        arrivals: replayed.len(),
        senders: clock.senders(),
        decisions,
        final_state: service.stats(),
    };
    (replayed, summary)
}

fn print_human_summary(summary: &SimulationSummary) {
    let state = &summary.final_state;
    println!("Replayed {} arrivals from {} senders", summary.arrivals, summary.senders);
    println!("Strategy: {}", state.strategy);
    println!();
    println!("Decisions:");
    for action in Action::ALL {
        println!(
            "  {:<8} {}",
            action.as_str(),
            summary.decisions.get(&action).copied().unwrap_or(0)
        );
    }
    println!();
    println!("Final state:");
    println!("  identities:  {}", state.total_identities);
    println!("  qualified:   {}", state.qualified_count);
    println!("  threshold:   {:.4}", state.threshold);
    println!(
        "  trust:       min {:.4} / mean {:.4} / max {:.4}",
        state.trust_distribution.min, state.trust_distribution.mean, state.trust_distribution.max
    );
}
