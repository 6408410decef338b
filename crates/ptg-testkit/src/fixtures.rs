//! Fixtures: configurations, arrival scripts and population builders.

use ptg_policy::{Decision, PolicyConfig, PolicyService};

/// Delta that passes the regularity test at the default expected interval.
pub const REGULAR_DELTA: f64 = 1.0;

/// Delta that fails the regularity test (p close to 0).
pub const FLOOD_DELTA: f64 = 0.0001;

/// Regular arrivals needed for a fresh sender to cross the default
/// qualification threshold (trust is about 0.14 after 41, 0.23 after 42).
pub const QUALIFYING_STREAK: usize = 42;

/// Regular arrivals after which trust has saturated at 1.0.
pub const SATURATING_STREAK: usize = 46;

/// Preset configurations.
pub mod config {
    use ptg_policy::PolicyConfig;

    /// Percentile tracker with defaults.
    #[must_use]
    pub const fn percentile() -> PolicyConfig {
        PolicyConfig::percentile()
    }

    /// Top-K tracker with defaults.
    #[must_use]
    pub const fn top_k() -> PolicyConfig {
        PolicyConfig::top_k()
    }

    /// Forward/drop only.
    #[must_use]
    pub const fn binary() -> PolicyConfig {
        PolicyConfig::binary()
    }

    /// Percentile tracker that activates after `min` samples and holds at most `max`.
    #[must_use]
    pub const fn small_sample(min: usize, max: usize) -> PolicyConfig {
        PolicyConfig::percentile().with_sample_bounds(min, max)
    }
}

/// Arrival delta scripts.
pub mod deltas {
    use super::{FLOOD_DELTA, REGULAR_DELTA};

    /// `n` perfectly regular deltas.
    #[must_use]
    pub fn regular(n: usize) -> Vec<f64> {
        vec![REGULAR_DELTA; n]
    }

    /// `n` burst deltas.
    #[must_use]
    pub fn flood(n: usize) -> Vec<f64> {
        vec![FLOOD_DELTA; n]
    }

    /// `n` deltas that vary around the expected interval but all pass.
    #[must_use]
    pub fn jittered(n: usize) -> Vec<f64> {
        const PATTERN: [f64; 5] = [0.6, 0.9, 1.0, 1.3, 1.7];
        PATTERN.iter().copied().cycle().take(n).collect()
    }
}

/// Build a service, panicking on invalid configuration.
///
/// # Panics
///
/// Panics if `config` does not validate.
#[must_use]
pub fn service(config: PolicyConfig) -> PolicyService {
    PolicyService::new(config).expect("fixture configuration is valid")
}

/// Feed `deltas` for `identifier`, returning every decision.
pub fn replay(service: &PolicyService, identifier: &str, deltas: &[f64]) -> Vec<Decision> {
    deltas
        .iter()
        .map(|&delta| service.evaluate(identifier, delta))
        .collect()
}

/// Identifier `{prefix}-{index}`.
#[must_use]
pub fn identity(prefix: &str, index: usize) -> String {
    format!("{prefix}-{index}")
}

/// Give `count` senders `streak` regular arrivals each, round-robin.
///
/// Returns the identifiers in creation order.
pub fn warm_up(service: &PolicyService, prefix: &str, count: usize, streak: usize) -> Vec<String> {
    let ids: Vec<String> = (0..count).map(|i| identity(prefix, i)).collect();
    for _ in 0..streak {
        for id in &ids {
            service.evaluate(id, REGULAR_DELTA);
        }
    }
    ids
}

/// Give `count` senders distinct qualified trust levels.
///
/// Sender `i` gets `QUALIFYING_STREAK + (i % 4)` regular arrivals, which
/// yields four distinct trust values between 0.2 and 1.0.
pub fn graded_population(service: &PolicyService, prefix: &str, count: usize) -> Vec<String> {
    let ids: Vec<String> = (0..count).map(|i| identity(prefix, i)).collect();
    for (i, id) in ids.iter().enumerate() {
        for _ in 0..QUALIFYING_STREAK + (i % 4) {
            service.evaluate(id, REGULAR_DELTA);
        }
    }
    ids
}
