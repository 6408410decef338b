//! Request and response bodies exchanged with the transport layer.
//!
//! Field names are camelCase on the wire. The legacy names `ip` and
//! `time_delta` are accepted on requests.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::classifier::Action;
use crate::tracker::{RankedMember, TrackerDiagnostics};
use crate::{PolicyError, PolicyResult, TrackerKind};

/// Inbound admission request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionRequest {
    /// Sender identifier.
    #[serde(default, alias = "ip")]
    pub identifier: Option<String>,

    /// Seconds since the sender's previous message; missing means `0.0`.
    #[serde(default, alias = "time_delta", alias = "inter_arrival_delta")]
    pub inter_arrival_delta: Option<f64>,
}

impl DecisionRequest {
    /// Build a request.
    #[must_use]
    pub fn new(identifier: impl Into<String>, inter_arrival_delta: f64) -> Self {
        Self {
            identifier: Some(identifier.into()),
            inter_arrival_delta: Some(inter_arrival_delta),
        }
    }

    /// Parse a JSON body.
    ///
    /// # Errors
    /// Returns [`PolicyError::InvalidRequest`] for malformed JSON or
    /// non-numeric fields.
    pub fn from_json(body: &str) -> PolicyResult<Self> {
        serde_json::from_str(body).map_err(|e| PolicyError::InvalidRequest(e.to_string()))
    }

    /// Check the request and extract `(identifier, delta)`.
    ///
    /// The identifier is returned exactly as sent; `" a "` and `"a"` are
    /// different senders.
    ///
    /// # Errors
    /// Returns [`PolicyError::InvalidRequest`] for a missing or blank
    /// identifier, or a negative or non-finite delta.
    pub fn validate(&self) -> PolicyResult<(&str, f64)> {
        let identifier = match self.identifier.as_deref() {
            Some(id) if !id.trim().is_empty() => id,
            Some(_) => return Err(PolicyError::InvalidRequest("identifier is empty".into())),
            None => return Err(PolicyError::InvalidRequest("identifier is missing".into())),
        };
        let delta = self.inter_arrival_delta.unwrap_or(0.0);
        if !delta.is_finite() || delta < 0.0 {
            return Err(PolicyError::InvalidRequest(format!(
                "interArrivalDelta must be a non-negative finite number, got {delta}"
            )));
        }
        Ok((identifier, delta))
    }
}

/// Admission decision returned for a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub action: Action,
    pub trust: f64,
    pub p_value: f64,
    pub threshold: f64,
    /// Entries held by the tracker's population view.
    pub population_size: usize,
    /// Identities above the qualification threshold.
    pub qualified_count: usize,
    /// Size of the explicit high tier (top-K tracker only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high_count: Option<usize>,
    pub success_streak: u64,
}

/// Minimum, maximum and mean trust across identities.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TrustSummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl TrustSummary {
    /// Summarise `values`; all fields are `0.0` when empty.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Self {
        let mut count = 0usize;
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for value in values {
            count += 1;
            sum += value;
            min = min.min(value);
            max = max.max(value);
        }
        if count == 0 {
            return Self::default();
        }
        Self {
            min,
            max,
            mean: sum / count as f64,
        }
    }
}

/// Read-only snapshot of the whole service.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub strategy: TrackerKind,
    pub total_identities: usize,
    /// Identities per action they would receive right now.
    pub action_counts: BTreeMap<Action, usize>,
    pub qualified_count: usize,
    /// Qualified identities whose trust is at or above the tracker's
    /// current `threshold` (not the qualification threshold; that count is
    /// `qualified_count`).
    pub at_or_above_threshold_count: usize,
    pub threshold: f64,
    pub population_size: usize,
    pub trust_distribution: TrustSummary,
    pub decisions_served: u64,
    pub tracker: TrackerDiagnostics,
}

impl StatsSnapshot {
    /// Count for `action` (0 when no identity currently maps to it).
    #[must_use]
    pub fn count(&self, action: Action) -> usize {
        self.action_counts.get(&action).copied().unwrap_or(0)
    }
}

/// Population debug view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugSnapshot {
    pub strategy: TrackerKind,
    pub threshold: f64,
    /// Every qualified identity, most trusted first.
    pub all_qualified: Vec<RankedMember>,
    pub total_qualified: usize,
    /// Trust values held by the tracker's population view, ascending.
    pub population: Vec<f64>,
    pub tracker: TrackerDiagnostics,
}

/// Acknowledgement for a reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetAck {
    pub status: ResetStatus,
}

/// Reset outcome; a reset cannot fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetStatus {
    ResetComplete,
}

impl Default for ResetAck {
    fn default() -> Self {
        Self {
            status: ResetStatus::ResetComplete,
        }
    }
}
