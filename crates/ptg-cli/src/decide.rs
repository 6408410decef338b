//! `ptg decide` command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Args;
use ptg_policy::{Decision, DecisionRequest, PolicyService};

use crate::input::{content_lines, read_input};
use crate::settings::GlobalArgs;

/// Arguments for `ptg decide`.
#[derive(Args, Debug)]
pub struct DecideArgs {
    /// Sender identifier for a single request.
    #[arg(long, conflicts_with = "input")]
    pub identifier: Option<String>,

    /// Seconds since the sender's previous message.
    #[arg(long, default_value_t = 0.0, requires = "identifier")]
    pub delta: f64,

    /// JSON-lines file of decision requests. Use "-" for stdin.
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Print a stats snapshot after the last decision.
    #[arg(long)]
    pub stats: bool,
}

/// Run the decide command.
pub fn run(global: &GlobalArgs, args: &DecideArgs) -> Result<()> {
    let service = global.build_service()?;

    let decisions = match (&args.identifier, &args.input) {
        (Some(identifier), None) => {
            vec![decide_one(&service, &DecisionRequest::new(identifier.clone(), args.delta))?]
        }
        (None, Some(path)) => decide_lines(&service, &read_input(path)?)?,
        _ => bail!("either --identifier or --input is required"),
    };

    for decision in &decisions {
        println!("{}", serde_json::to_string(decision)?);
    }
    if args.stats {
        println!("{}", serde_json::to_string(&service.stats())?);
    }
    Ok(())
}

fn decide_one(service: &PolicyService, request: &DecisionRequest) -> Result<Decision> {
    service.decide(request).context("request rejected")
}

/// Evaluate every request line in order; the first invalid line aborts.
fn decide_lines(service: &PolicyService, raw: &str) -> Result<Vec<Decision>> {
    content_lines(raw)
        .map(|(line_no, line)| {
            let request = DecisionRequest::from_json(line)
                .with_context(|| format!("line {line_no}: malformed request"))?;
            decide_one(service, &request).with_context(|| format!("line {line_no}"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ptg_policy::{Action, PolicyConfig};

    #[test]
    fn evaluates_lines_in_order() {
        let service = PolicyService::new(PolicyConfig::default()).unwrap();
        let raw = r#"
{"identifier":"a","interArrivalDelta":1.0}
{"ip":"a","time_delta":1.0}
{"identifier":"b"}
"#;
        let decisions = decide_lines(&service, raw).unwrap();
        assert_eq!(decisions.len(), 3);
        assert_eq!(decisions[1].success_streak, 2);
        assert_eq!(decisions[2].success_streak, 0);
        assert!(decisions.iter().all(|d| d.action == Action::Drop));
    }

    #[test]
    fn reports_offending_line() {
        let service = PolicyService::new(PolicyConfig::default()).unwrap();
        let raw = "{\"identifier\":\"a\"}\n{\"identifier\":\"a\",\"interArrivalDelta\":-1}\n";
        let err = decide_lines(&service, raw).unwrap_err();
        assert!(format!("{err:#}").contains("line 2"));
    }
}
