//! Tracker for the binary forward/drop deployment.

use crate::trust::IdentityTable;
use crate::{PolicyConfig, TrackerKind};

use super::{ThresholdTracker, TrackerDiagnostics, TrustChange};

/// Holds no population; every qualified identity is simply forwarded.
///
/// The reported threshold is the qualification threshold, the only cut line
/// in effect.
#[derive(Debug, Clone)]
pub struct UntieredTracker {
    qualification: f64,
    qualified_count: usize,
}

impl UntieredTracker {
    /// Create a tracker from configuration.
    #[must_use]
    pub const fn from_config(config: &PolicyConfig) -> Self {
        Self {
            qualification: config.qualification_threshold,
            qualified_count: 0,
        }
    }
}

impl ThresholdTracker for UntieredTracker {
    fn kind(&self) -> TrackerKind {
        TrackerKind::Disabled
    }

    fn observe(&mut self, change: &TrustChange<'_>, _identities: &IdentityTable) {
        self.qualified_count = change.qualified_count;
    }

    fn current_threshold(&self) -> f64 {
        self.qualification
    }

    fn is_high_priority(&self, _identifier: &str, _trust: f64) -> Option<bool> {
        None
    }

    fn population_size(&self) -> usize {
        self.qualified_count
    }

    fn population_values(&self) -> Vec<f64> {
        Vec::new()
    }

    fn diagnostics(&self) -> TrackerDiagnostics {
        TrackerDiagnostics::Disabled
    }

    fn reset(&mut self) {
        self.qualified_count = 0;
    }
}
