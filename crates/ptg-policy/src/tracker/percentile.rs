//! Percentile tracker over a sorted, bounded sample of qualified trust scores.
//!
//! The sample holds one value per qualified identity, kept in ascending order.
//! Inserts use a binary search followed by a shift. When the sample exceeds
//! its capacity the smallest value is evicted rather than the oldest, which
//! skews the retained sample (and so the threshold) upward under sustained
//! load.

use crate::trust::IdentityTable;
use crate::{PolicyConfig, TrackerKind};

use super::{PercentileReport, ThresholdTracker, TrackerDiagnostics, TrustChange, TrustRange};

/// `(quantile, minimum sample size)` pairs reported by [`PercentileTracker::report`].
const REPORTED_PERCENTILES: [(f64, usize); 4] = [(0.25, 4), (0.5, 2), (0.75, 4), (0.95, 20)];

/// Strategy A: threshold at a fixed percentile of a sorted sample.
#[derive(Debug, Clone)]
pub struct PercentileTracker {
    qualification: f64,
    max_samples: usize,
    min_samples: usize,
    /// Quantile of the sample used as the cut line (`1 - top_fraction`).
    cut_quantile: f64,
    initial_threshold: f64,
    samples: Vec<f64>,
    threshold: f64,
}

impl PercentileTracker {
    /// Create a tracker from configuration.
    #[must_use]
    pub fn from_config(config: &PolicyConfig) -> Self {
        Self {
            qualification: config.qualification_threshold,
            max_samples: config.max_samples,
            min_samples: config.min_samples,
            cut_quantile: 1.0 - config.top_fraction,
            initial_threshold: config.initial_threshold,
            samples: Vec::with_capacity(config.max_samples.min(1024) + 1),
            threshold: config.initial_threshold,
        }
    }

    /// Sorted sample (ascending).
    #[must_use]
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Whether enough samples exist for the threshold to move.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.samples.len() >= self.min_samples
    }

    /// Value at `floor(quantile * len)`, if the sample holds at least `min_support` values.
    #[must_use]
    pub fn percentile(&self, quantile: f64, min_support: usize) -> Option<f64> {
        let len = self.samples.len();
        if len == 0 || len < min_support {
            return None;
        }
        Some(self.samples[quantile_index(quantile, len)])
    }

    /// Percentile estimates at 25/50/75/95.
    #[must_use]
    pub fn report(&self) -> PercentileReport {
        let [p25, p50, p75, p95] =
            REPORTED_PERCENTILES.map(|(quantile, support)| self.percentile(quantile, support));
        PercentileReport { p25, p50, p75, p95 }
    }

    /// Smallest and largest sampled value.
    #[must_use]
    pub fn range(&self) -> Option<TrustRange> {
        match (self.samples.first(), self.samples.last()) {
            (Some(&min), Some(&max)) => Some(TrustRange { min, max }),
            _ => None,
        }
    }

    /// Remove one occurrence of `value`; absent values (already evicted) are ignored.
    #[allow(clippy::float_cmp)] // values are stored copies, never recomputed
    fn remove_one(&mut self, value: f64) {
        let idx = self.samples.partition_point(|v| *v < value);
        if idx < self.samples.len() && self.samples[idx] == value {
            self.samples.remove(idx);
        }
    }

    fn insert(&mut self, value: f64) {
        let idx = self.samples.partition_point(|v| *v <= value);
        self.samples.insert(idx, value);
        if self.samples.len() > self.max_samples {
            self.samples.remove(0);
        }
    }

    fn recompute(&mut self) {
        if self.is_active() {
            self.threshold = self.samples[quantile_index(self.cut_quantile, self.samples.len())];
        }
    }
}

#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn quantile_index(quantile: f64, len: usize) -> usize {
    ((quantile * len as f64).floor() as usize).min(len - 1)
}

impl ThresholdTracker for PercentileTracker {
    fn kind(&self) -> TrackerKind {
        TrackerKind::Percentile
    }

    fn observe(&mut self, change: &TrustChange<'_>, _identities: &IdentityTable) {
        if change.old_trust > self.qualification {
            self.remove_one(change.old_trust);
        }
        if change.new_trust > self.qualification {
            self.insert(change.new_trust);
        }
        self.recompute();
    }

    fn current_threshold(&self) -> f64 {
        self.threshold
    }

    fn is_high_priority(&self, _identifier: &str, trust: f64) -> Option<bool> {
        Some(trust >= self.threshold)
    }

    fn population_size(&self) -> usize {
        self.samples.len()
    }

    fn population_values(&self) -> Vec<f64> {
        self.samples.clone()
    }

    fn diagnostics(&self) -> TrackerDiagnostics {
        TrackerDiagnostics::Percentile {
            samples: self.samples.len(),
            max_samples: self.max_samples,
            min_samples: self.min_samples,
            percentiles: self.report(),
            qualified_range: self.range(),
        }
    }

    fn reset(&mut self) {
        self.samples.clear();
        self.threshold = self.initial_threshold;
    }
}
