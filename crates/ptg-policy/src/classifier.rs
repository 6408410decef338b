//! Admission actions and the classifier that emits them.

use serde::{Deserialize, Serialize};

/// Admission outcome for one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Discard the message.
    Drop,
    /// Forward on the low-priority lane.
    Low,
    /// Forward on the high-priority lane.
    High,
    /// Forward without tiering (tracker disabled).
    Forward,
}

/// Forwarding lane an admitted message is queued on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lane {
    High,
    Low,
}

impl Action {
    /// All actions, in reporting order.
    pub const ALL: [Self; 4] = [Self::Drop, Self::Low, Self::High, Self::Forward];

    /// Stable string form, matching the serde representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Drop => "drop",
            Self::Low => "low",
            Self::High => "high",
            Self::Forward => "forward",
        }
    }

    /// Whether the message is admitted at all.
    #[must_use]
    pub const fn is_admitted(self) -> bool {
        !matches!(self, Self::Drop)
    }

    /// Lane the message should be queued on, or `None` for a drop.
    ///
    /// Untiered forwards share the low lane.
    #[must_use]
    pub const fn lane(self) -> Option<Lane> {
        match self {
            Self::Drop => None,
            Self::High => Some(Lane::High),
            Self::Low | Self::Forward => Some(Lane::Low),
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a trust score and a tracker verdict to an [`Action`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classifier {
    qualification: f64,
}

impl Classifier {
    /// Create a classifier with the given qualification threshold.
    #[must_use]
    pub const fn new(qualification: f64) -> Self {
        Self { qualification }
    }

    /// Classify `trust`.
    ///
    /// `high_priority` is the tracker's verdict: `Some(true)`/`Some(false)` for
    /// a tiering tracker, `None` when tiering is disabled. The qualification
    /// check always runs first, so the verdict is ignored for dropped senders.
    #[must_use]
    pub fn classify(&self, trust: f64, high_priority: Option<bool>) -> Action {
        if trust <= self.qualification {
            return Action::Drop;
        }
        match high_priority {
            Some(true) => Action::High,
            Some(false) => Action::Low,
            None => Action::Forward,
        }
    }
}
