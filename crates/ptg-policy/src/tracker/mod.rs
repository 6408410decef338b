//! Population trackers that turn trust scores into a high/low cut line.
//!
//! - [`PercentileTracker`] - sorted sample, threshold at a fixed percentile
//! - [`TopKTracker`] - bounded top-K set, high priority by membership
//! - [`UntieredTracker`] - no tiering; the binary forward/drop deployment
//!
//! Exactly one tracker is active per service, chosen by
//! [`PolicyConfig::tracker`](crate::PolicyConfig::tracker).

mod percentile;
mod top_k;
mod untiered;

pub use percentile::*;
pub use top_k::*;
pub use untiered::*;

use serde::Serialize;

use crate::trust::IdentityTable;
use crate::{PolicyConfig, TrackerKind};

/// A single identity's trust transition, as seen by a tracker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrustChange<'a> {
    /// Sender whose trust changed.
    pub identifier: &'a str,
    /// Trust before the update (0.0 for a new sender).
    pub old_trust: f64,
    /// Trust after the update.
    pub new_trust: f64,
    /// Identities qualified after the update, across the whole table.
    pub qualified_count: usize,
}

impl TrustChange<'_> {
    /// Whether the change moved the identity across `qualification`.
    #[must_use]
    pub fn crossed(&self, qualification: f64) -> bool {
        (self.old_trust > qualification) != (self.new_trust > qualification)
    }
}

/// A sender and its trust, for ranked listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedMember {
    pub identifier: String,
    pub trust: f64,
}

/// Percentile estimates over the qualified sample.
///
/// A field is `None` when the sample is too small to support that index.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PercentileReport {
    pub p25: Option<f64>,
    pub p50: Option<f64>,
    pub p75: Option<f64>,
    pub p95: Option<f64>,
}

/// Smallest and largest value in a population.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrustRange {
    pub min: f64,
    pub max: f64,
}

/// Tracker-specific view for statistics and debugging.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum TrackerDiagnostics {
    Percentile {
        samples: usize,
        max_samples: usize,
        min_samples: usize,
        percentiles: PercentileReport,
        qualified_range: Option<TrustRange>,
    },
    TopK {
        target_size: usize,
        actual_size: usize,
        top_fraction: f64,
        members: Vec<RankedMember>,
    },
    Disabled,
}

/// Maintains the qualified population and the high/low cut line.
///
/// Implementations are driven exclusively by the policy service under its
/// lock; `observe` is called once per decision, after the identity table has
/// been updated with the new trust value.
pub trait ThresholdTracker: Send + std::fmt::Debug {
    /// Which strategy this is.
    fn kind(&self) -> TrackerKind;

    /// Fold one identity's trust transition into the population view.
    fn observe(&mut self, change: &TrustChange<'_>, identities: &IdentityTable);

    /// Current cut line.
    fn current_threshold(&self) -> f64;

    /// Whether a qualified identity belongs in the high tier.
    ///
    /// Returns `None` when the tracker does not tier at all.
    fn is_high_priority(&self, identifier: &str, trust: f64) -> Option<bool>;

    /// Number of entries currently held by the population view.
    fn population_size(&self) -> usize;

    /// Size of the high tier, for trackers that hold it explicitly.
    fn high_count(&self) -> Option<usize> {
        None
    }

    /// Trust values held by the population view, ascending.
    fn population_values(&self) -> Vec<f64>;

    /// Strategy-specific statistics.
    fn diagnostics(&self) -> TrackerDiagnostics;

    /// Drop all population state and restore the default threshold.
    fn reset(&mut self);
}

/// Build the tracker selected by `config`.
#[must_use]
pub fn build_tracker(config: &PolicyConfig) -> Box<dyn ThresholdTracker> {
    match config.tracker {
        TrackerKind::Percentile => Box::new(PercentileTracker::from_config(config)),
        TrackerKind::TopK => Box::new(TopKTracker::from_config(config)),
        TrackerKind::Disabled => Box::new(UntieredTracker::from_config(config)),
    }
}
