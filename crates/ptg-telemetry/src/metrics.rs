//! Metrics emitted by the policy engine.
//!
//! All functions record through the `metrics` facade and are no-ops until a
//! recorder is installed.

use std::sync::OnceLock;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};

/// Decisions served, labelled by `action`.
pub const DECISIONS_TOTAL: &str = "ptg_decisions_total";
/// Requests rejected at validation, labelled by error `code`.
pub const REQUESTS_REJECTED_TOTAL: &str = "ptg_requests_rejected_total";
/// Full state resets.
pub const RESETS_TOTAL: &str = "ptg_resets_total";
/// Current high-priority cut line.
pub const THRESHOLD: &str = "ptg_threshold";
/// Entries held by the tracker's population view.
pub const POPULATION_SIZE: &str = "ptg_population_size";
/// Identities above the qualification threshold.
pub const QUALIFIED_IDENTITIES: &str = "ptg_qualified_identities";
/// Time spent producing one decision.
pub const DECISION_DURATION_SECONDS: &str = "ptg_decision_duration_seconds";

static METRICS_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Register metric descriptions with the installed recorder.
pub fn init_metrics() {
    if METRICS_INITIALIZED.set(()).is_err() {
        return;
    }

    describe_counter!(DECISIONS_TOTAL, "Admission decisions served, by action");
    describe_counter!(
        REQUESTS_REJECTED_TOTAL,
        "Requests rejected before evaluation, by error code"
    );
    describe_counter!(RESETS_TOTAL, "Full policy state resets");
    describe_gauge!(THRESHOLD, "Current high-priority trust threshold");
    describe_gauge!(
        POPULATION_SIZE,
        "Trust values held by the threshold tracker"
    );
    describe_gauge!(
        QUALIFIED_IDENTITIES,
        "Identities above the qualification threshold"
    );
    describe_histogram!(
        DECISION_DURATION_SECONDS,
        "Time to evaluate one admission decision in seconds"
    );
}

/// Count one decision and its latency.
pub fn record_decision(action: &'static str, duration_secs: f64) {
    counter!(DECISIONS_TOTAL, "action" => action).increment(1);
    histogram!(DECISION_DURATION_SECONDS).record(duration_secs);
}

/// Count one rejected request.
pub fn record_rejected(code: &'static str) {
    counter!(REQUESTS_REJECTED_TOTAL, "code" => code).increment(1);
}

/// Publish the tracker's current state.
#[allow(clippy::cast_precision_loss)]
pub fn update_population(threshold: f64, population: usize, qualified: usize) {
    gauge!(THRESHOLD).set(threshold);
    gauge!(POPULATION_SIZE).set(population as f64);
    gauge!(QUALIFIED_IDENTITIES).set(qualified as f64);
}

/// Count one reset.
pub fn record_reset() {
    counter!(RESETS_TOTAL).increment(1);
}
