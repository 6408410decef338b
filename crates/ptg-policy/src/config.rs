//! Policy configuration.
//!
//! All values are fixed at process start. [`PolicyConfig::validate`] is the
//! single gate for configuration errors; a service is never built from an
//! unvalidated config.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{PolicyError, PolicyResult};

/// Default expected inter-arrival interval in seconds.
pub const DEFAULT_EXPECTED_INTERVAL: f64 = 1.0;

/// Default p-value above which an arrival counts toward the success streak.
pub const DEFAULT_SUCCESS_P_THRESHOLD: f64 = 0.005;

/// Default p-value above which trust is rewarded instead of decayed.
pub const DEFAULT_TRUST_P_THRESHOLD: f64 = 0.005;

/// Default trust cutoff; identities at or below it are always dropped.
pub const DEFAULT_QUALIFICATION_THRESHOLD: f64 = 0.2;

/// Default capacity of the percentile sample.
pub const DEFAULT_MAX_SAMPLES: usize = 1000;

/// Default minimum sample count before the percentile threshold moves.
pub const DEFAULT_MIN_SAMPLES: usize = 20;

/// Default fraction of qualified identities treated as high priority.
pub const DEFAULT_TOP_FRACTION: f64 = 0.25;

/// Default percentile threshold before enough samples exist.
pub const DEFAULT_INITIAL_THRESHOLD: f64 = 0.8;

/// Default trust delta that forces a full top-K rebuild.
pub const DEFAULT_SIGNIFICANT_CHANGE: f64 = 0.1;

/// Which threshold tracker a deployment runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackerKind {
    /// Sorted sample, threshold at a fixed percentile.
    #[default]
    Percentile,
    /// Bounded top-K set, high priority by membership.
    TopK,
    /// No tracker; binary forward/drop.
    Disabled,
}

impl TrackerKind {
    /// Stable string form, matching the serde representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Percentile => "percentile",
            Self::TopK => "top_k",
            Self::Disabled => "disabled",
        }
    }
}

impl std::fmt::Display for TrackerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TrackerKind {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "percentile" => Ok(Self::Percentile),
            "top_k" | "top-k" | "topk" => Ok(Self::TopK),
            "disabled" | "binary" => Ok(Self::Disabled),
            other => Err(PolicyError::InvalidConfig(format!(
                "unknown tracker strategy `{other}`"
            ))),
        }
    }
}

/// Configuration for the admission engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyConfig {
    /// Mean inter-arrival time (seconds) of a well-behaved sender.
    pub expected_interval: f64,

    /// p-value a sample must exceed to extend the success streak.
    pub success_p_threshold: f64,

    /// p-value a sample must exceed to be rewarded.
    pub trust_p_threshold: f64,

    /// Trust at or below this value is dropped and never counted.
    pub qualification_threshold: f64,

    /// Percentile sample capacity.
    pub max_samples: usize,

    /// Samples required before the percentile threshold is computed.
    pub min_samples: usize,

    /// Fraction of qualified identities routed as high priority.
    pub top_fraction: f64,

    /// Percentile threshold used until `min_samples` is reached.
    pub initial_threshold: f64,

    /// Trust delta beyond which the top-K set is rebuilt from scratch.
    pub significant_change: f64,

    /// Active tracker.
    pub tracker: TrackerKind,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self::new(TrackerKind::Percentile)
    }
}

impl PolicyConfig {
    /// Default configuration for the given tracker.
    #[must_use]
    pub const fn new(tracker: TrackerKind) -> Self {
        Self {
            expected_interval: DEFAULT_EXPECTED_INTERVAL,
            success_p_threshold: DEFAULT_SUCCESS_P_THRESHOLD,
            trust_p_threshold: DEFAULT_TRUST_P_THRESHOLD,
            qualification_threshold: DEFAULT_QUALIFICATION_THRESHOLD,
            max_samples: DEFAULT_MAX_SAMPLES,
            min_samples: DEFAULT_MIN_SAMPLES,
            top_fraction: DEFAULT_TOP_FRACTION,
            initial_threshold: DEFAULT_INITIAL_THRESHOLD,
            significant_change: DEFAULT_SIGNIFICANT_CHANGE,
            tracker,
        }
    }

    /// Preset: percentile tracker.
    #[must_use]
    pub const fn percentile() -> Self {
        Self::new(TrackerKind::Percentile)
    }

    /// Preset: top-K tracker.
    #[must_use]
    pub const fn top_k() -> Self {
        Self::new(TrackerKind::TopK)
    }

    /// Preset: binary forward/drop.
    #[must_use]
    pub const fn binary() -> Self {
        Self::new(TrackerKind::Disabled)
    }

    /// Set the expected interval.
    #[must_use]
    pub const fn with_expected_interval(mut self, seconds: f64) -> Self {
        self.expected_interval = seconds;
        self
    }

    /// Set both p-value thresholds.
    #[must_use]
    pub const fn with_p_thresholds(mut self, success: f64, trust: f64) -> Self {
        self.success_p_threshold = success;
        self.trust_p_threshold = trust;
        self
    }

    /// Set the percentile sample bounds.
    #[must_use]
    pub const fn with_sample_bounds(mut self, min_samples: usize, max_samples: usize) -> Self {
        self.min_samples = min_samples;
        self.max_samples = max_samples;
        self
    }

    /// Set the high-priority fraction.
    #[must_use]
    pub const fn with_top_fraction(mut self, fraction: f64) -> Self {
        self.top_fraction = fraction;
        self
    }

    /// Set the initial percentile threshold.
    #[must_use]
    pub const fn with_initial_threshold(mut self, threshold: f64) -> Self {
        self.initial_threshold = threshold;
        self
    }

    /// Select the tracker.
    #[must_use]
    pub const fn with_tracker(mut self, tracker: TrackerKind) -> Self {
        self.tracker = tracker;
        self
    }

    /// Parse from TOML and validate.
    ///
    /// # Errors
    /// Returns an error if the TOML is malformed or the values are invalid.
    pub fn from_toml_str(input: &str) -> PolicyResult<Self> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file and validate.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load(path: impl AsRef<Path>) -> PolicyResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Check every value for consistency.
    ///
    /// # Errors
    /// Returns [`PolicyError::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> PolicyResult<()> {
        if !(self.expected_interval.is_finite() && self.expected_interval > 0.0) {
            return Err(invalid("expected_interval must be a positive finite number"));
        }
        check_open_unit("success_p_threshold", self.success_p_threshold)?;
        check_open_unit("trust_p_threshold", self.trust_p_threshold)?;
        check_open_unit("qualification_threshold", self.qualification_threshold)?;
        if !(self.top_fraction > 0.0 && self.top_fraction <= 1.0) {
            return Err(invalid("top_fraction must be in (0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.initial_threshold) {
            return Err(invalid("initial_threshold must be in [0, 1]"));
        }
        if !(self.significant_change.is_finite() && self.significant_change > 0.0) {
            return Err(invalid("significant_change must be a positive finite number"));
        }
        if self.max_samples == 0 {
            return Err(invalid("max_samples must be > 0"));
        }
        if self.min_samples == 0 || self.min_samples > self.max_samples {
            return Err(invalid("min_samples must be in 1..=max_samples"));
        }
        Ok(())
    }
}

fn check_open_unit(field: &str, value: f64) -> PolicyResult<()> {
    if value > 0.0 && value < 1.0 {
        Ok(())
    } else {
        Err(invalid(&format!("{field} must be in (0, 1)")))
    }
}

fn invalid(message: &str) -> PolicyError {
    PolicyError::InvalidConfig(message.to_string())
}
