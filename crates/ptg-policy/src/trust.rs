//! Per-identity trust state and its update recurrence.

use std::collections::HashMap;

use serde::Serialize;

use crate::PolicyConfig;
use crate::regularity;

/// Streak length at which the reward curve reaches half its maximum.
pub const REWARD_MIDPOINT: f64 = 50.0;

/// Steepness of the reward curve.
pub const REWARD_STEEPNESS: f64 = 0.5;

/// Upper asymptote of the reward curve.
pub const REWARD_CEILING: f64 = 100.0;

/// Scale applied to the reward before it is added to trust.
pub const REWARD_SCALE: f64 = 0.05;

/// Multiplier applied to trust on a failed test.
pub const DECAY_FACTOR: f64 = 0.2;

/// Trust state of a single sender.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct IdentityRecord {
    /// Consecutive passes of the regularity test.
    pub success_streak: u64,
    /// Trust in `[0.0, 1.0]`.
    pub trust: f64,
}

/// Logistic reward for a given streak length.
///
/// Close to zero for short streaks and saturating at [`REWARD_CEILING`] for
/// long ones, so a sender has to behave regularly for a sustained period
/// before trust grows meaningfully.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn reward(success_streak: u64) -> f64 {
    let x = success_streak as f64;
    REWARD_CEILING / (1.0 + (-REWARD_STEEPNESS * (x - REWARD_MIDPOINT)).exp())
}

/// Applies regularity test results to identity records.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrustEstimator {
    success_p_threshold: f64,
    trust_p_threshold: f64,
}

impl TrustEstimator {
    /// Create an estimator with explicit p-value thresholds.
    #[must_use]
    pub const fn new(success_p_threshold: f64, trust_p_threshold: f64) -> Self {
        Self {
            success_p_threshold,
            trust_p_threshold,
        }
    }

    /// Create an estimator from configuration.
    #[must_use]
    pub const fn from_config(config: &PolicyConfig) -> Self {
        Self::new(config.success_p_threshold, config.trust_p_threshold)
    }

    /// Return the record after observing a sample with p-value `p`.
    #[must_use]
    pub fn update(&self, record: IdentityRecord, p: f64) -> IdentityRecord {
        let success_streak = if regularity::passes(p, self.success_p_threshold) {
            record.success_streak.saturating_add(1)
        } else {
            0
        };

        let trust = if regularity::passes(p, self.trust_p_threshold) {
            REWARD_SCALE.mul_add(reward(success_streak), record.trust).min(1.0)
        } else {
            record.trust * DECAY_FACTOR
        };

        IdentityRecord {
            success_streak,
            trust,
        }
    }
}

/// Identity table owned by the policy service.
#[derive(Debug, Default)]
pub struct IdentityTable {
    records: HashMap<String, IdentityRecord>,
}

impl IdentityTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current record for `identifier`, or the default for an unseen sender.
    #[must_use]
    pub fn get_or_default(&self, identifier: &str) -> IdentityRecord {
        self.records.get(identifier).copied().unwrap_or_default()
    }

    /// Record for `identifier`, if it has been seen.
    #[must_use]
    pub fn get(&self, identifier: &str) -> Option<IdentityRecord> {
        self.records.get(identifier).copied()
    }

    /// Store `record` for `identifier`.
    pub fn insert(&mut self, identifier: &str, record: IdentityRecord) {
        if let Some(existing) = self.records.get_mut(identifier) {
            *existing = record;
        } else {
            self.records.insert(identifier.to_string(), record);
        }
    }

    /// Number of known identities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no identity has been seen.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate over all identities.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &IdentityRecord)> {
        self.records.iter().map(|(id, record)| (id.as_str(), record))
    }

    /// Iterate over identities whose trust exceeds `qualification`.
    pub fn qualified(&self, qualification: f64) -> impl Iterator<Item = (&str, f64)> {
        self.iter()
            .filter(move |(_, record)| record.trust > qualification)
            .map(|(id, record)| (id, record.trust))
    }

    /// Forget every identity.
    pub fn clear(&mut self) {
        self.records.clear();
    }
}
