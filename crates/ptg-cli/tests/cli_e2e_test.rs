//! End-to-end tests for the `ptg` binary.

use std::fmt::Write as _;
use std::io::Write;
use std::process::{Command, Output, Stdio};

use ptg_testkit::fixtures::{FLOOD_DELTA, QUALIFYING_STREAK, REGULAR_DELTA};
use serde_json::Value;

fn ptg(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_ptg"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("run ptg")
}

fn ptg_with_stdin(args: &[&str], stdin: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_ptg"))
        .args(args)
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn ptg");
    child
        .stdin
        .take()
        .expect("stdin piped")
        .write_all(stdin.as_bytes())
        .expect("write stdin");
    child.wait_with_output().expect("wait for ptg")
}

fn stdout_lines(output: &Output) -> Vec<Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("json line"))
        .collect()
}

#[test]
fn check_config_applies_strategy_override() {
    let output = ptg(&["check-config", "--strategy", "top_k"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("tracker = \"top_k\""), "{stdout}");
}

#[test]
fn check_config_rejects_invalid_file() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, "top_fraction = 1.5").expect("write config");

    let output = ptg(&["check-config", "--config", file.path().to_str().expect("utf8 path")]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("top_fraction"));
}

#[test]
fn decide_single_request() {
    let output = ptg(&["decide", "--identifier", "10.0.0.1", "--delta", "1.0", "--stats"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["action"], "drop");
    assert_eq!(lines[0]["successStreak"], 1);
    assert_eq!(lines[1]["totalIdentities"], 1);
}

#[test]
fn simulate_replays_csv_log() {
    let mut log = String::from("# identifier,timestamp\n");
    for i in 0..50 {
        writeln!(log, "steady,{}", f64::from(i) * REGULAR_DELTA).expect("format");
    }
    for i in 0..10 {
        writeln!(log, "burst,{}", f64::from(i).mul_add(FLOOD_DELTA, 100.0)).expect("format");
    }
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(log.as_bytes()).expect("write log");

    let output = ptg(&[
        "simulate",
        "--strategy",
        "disabled",
        "--format",
        "json",
        "--input",
        file.path().to_str().expect("utf8 path"),
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let lines = stdout_lines(&output);
    let summary = lines.last().expect("summary line");
    assert_eq!(summary["arrivals"], 60);
    assert_eq!(summary["senders"], 2);
    assert_eq!(summary["finalState"]["actionCounts"]["forward"], 1);
    assert_eq!(summary["finalState"]["actionCounts"]["drop"], 1);
}

#[test]
fn serve_answers_each_request_line() {
    let input = concat!(
        r#"{"identifier":"a","interArrivalDelta":1.0,"requestId":1}"#,
        "\n",
        r#"{"ip":"b","time_delta":0.5,"requestId":2}"#,
        "\n",
        r#"{"identifier":"","requestId":3}"#,
        "\n",
    );

    let output = ptg_with_stdin(&["serve", "--workers", "2"], input);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let mut lines = stdout_lines(&output);
    lines.sort_by_key(|line| line["requestId"].as_u64());
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["ok"], true);
    assert_eq!(lines[1]["result"]["successStreak"], 1);
    assert_eq!(lines[2]["ok"], false);
    assert_eq!(lines[2]["error"]["code"], "policy.invalid_request");
}

#[test]
fn simulate_rejects_blank_identifier() {
    let output = ptg_with_stdin(&["simulate", "--input", "-"], "a,1.0\n,2.0\n");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("line 2"), "{stderr}");
    assert!(stderr.contains("identifier"), "{stderr}");
}

#[test]
fn decide_jsonl_reaches_low_lane() {
    let mut input = String::new();
    for _ in 0..QUALIFYING_STREAK {
        writeln!(input, r#"{{"identifier":"steady","interArrivalDelta":{REGULAR_DELTA}}}"#)
            .expect("format");
    }

    let output = ptg_with_stdin(&["decide", "--input", "-"], &input);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), QUALIFYING_STREAK);
    assert!(lines[..QUALIFYING_STREAK - 1].iter().all(|line| line["action"] == "drop"));
    assert_eq!(lines[QUALIFYING_STREAK - 1]["action"], "low");
}
