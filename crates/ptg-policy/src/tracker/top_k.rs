//! Bounded top-K tracker.
//!
//! Holds the `K = max(1, ceil(top_fraction * qualified))` most trusted
//! identities in a min-heap keyed by trust, with an identifier index for
//! membership tests. The threshold is the heap minimum (0.0 when empty).
//!
//! Large changes (beyond `significant_change`, or crossing the qualification
//! boundary) rebuild the heap from a full scan of the identity table. Small
//! changes are folded in incrementally: a non-member can displace the current
//! minimum, while any change to an existing member rebuilds.
//!
//! High priority is decided by membership, not by comparing trust against the
//! reported threshold. With ties at the boundary the two can disagree; the
//! membership answer is authoritative.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet};

use tracing::trace;

use crate::trust::IdentityTable;
use crate::{PolicyConfig, TrackerKind};

use super::{RankedMember, ThresholdTracker, TrackerDiagnostics, TrustChange};

/// Heap entry ordered by trust, then identifier.
#[derive(Debug, Clone)]
struct Entry {
    trust: f64,
    identifier: String,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.trust
            .total_cmp(&other.trust)
            .then_with(|| self.identifier.cmp(&other.identifier))
    }
}

/// Size of the high tier for `qualified` identities.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn target_size(qualified: usize, top_fraction: f64) -> usize {
    if qualified == 0 {
        return 0;
    }
    ((top_fraction * qualified as f64).ceil() as usize).clamp(1, qualified)
}

/// Strategy B: the top fraction of qualified identities, by membership.
#[derive(Debug, Clone)]
pub struct TopKTracker {
    qualification: f64,
    top_fraction: f64,
    significant_change: f64,
    heap: BinaryHeap<Reverse<Entry>>,
    members: HashSet<String>,
    qualified_count: usize,
    threshold: f64,
    rebuilds: u64,
}

impl TopKTracker {
    /// Create a tracker from configuration.
    #[must_use]
    pub fn from_config(config: &PolicyConfig) -> Self {
        Self {
            qualification: config.qualification_threshold,
            top_fraction: config.top_fraction,
            significant_change: config.significant_change,
            heap: BinaryHeap::new(),
            members: HashSet::new(),
            qualified_count: 0,
            threshold: 0.0,
            rebuilds: 0,
        }
    }

    /// Whether `identifier` is in the high tier.
    #[must_use]
    pub fn contains(&self, identifier: &str) -> bool {
        self.members.contains(identifier)
    }

    /// Members, most trusted first.
    #[must_use]
    pub fn ranked_members(&self) -> Vec<RankedMember> {
        let mut entries: Vec<&Entry> = self.heap.iter().map(|Reverse(entry)| entry).collect();
        entries.sort_unstable_by(|a, b| b.cmp(a));
        entries
            .into_iter()
            .map(|entry| RankedMember {
                identifier: entry.identifier.clone(),
                trust: entry.trust,
            })
            .collect()
    }

    /// Target size for the last observed qualified count.
    #[must_use]
    pub fn target_size(&self) -> usize {
        target_size(self.qualified_count, self.top_fraction)
    }

    /// Number of full rebuilds performed since creation or reset.
    #[must_use]
    pub const fn rebuilds(&self) -> u64 {
        self.rebuilds
    }

    /// Rebuild the heap from a full scan of `identities`.
    pub fn rebuild(&mut self, identities: &IdentityTable) {
        let mut qualified: Vec<Entry> = identities
            .qualified(self.qualification)
            .map(|(identifier, trust)| Entry {
                trust,
                identifier: identifier.to_string(),
            })
            .collect();

        self.qualified_count = qualified.len();
        let target = target_size(qualified.len(), self.top_fraction);
        if target < qualified.len() {
            if target > 0 {
                qualified.select_nth_unstable_by(target - 1, |a, b| b.cmp(a));
            }
            qualified.truncate(target);
        }

        self.members = qualified.iter().map(|e| e.identifier.clone()).collect();
        self.heap = qualified.into_iter().map(Reverse).collect();
        self.rebuilds += 1;
        self.refresh_threshold();

        trace!(
            qualified = self.qualified_count,
            target_size = target,
            threshold = self.threshold,
            "top-k rebuilt"
        );
    }

    fn incremental(&mut self, change: &TrustChange<'_>, identities: &IdentityTable) {
        self.qualified_count = change.qualified_count;
        let target = self.target_size();
        if target == 0 {
            self.clear();
            return;
        }

        if self.members.contains(change.identifier) {
            self.rebuild(identities);
            return;
        }

        if change.new_trust > self.qualification {
            if self.heap.len() < target {
                self.push(change.identifier, change.new_trust);
            } else if change.new_trust > self.threshold {
                self.pop_min();
                self.push(change.identifier, change.new_trust);
            }
            self.refresh_threshold();
        }

        while self.heap.len() > target {
            self.pop_min();
            self.refresh_threshold();
        }
    }

    fn push(&mut self, identifier: &str, trust: f64) {
        self.members.insert(identifier.to_string());
        self.heap.push(Reverse(Entry {
            trust,
            identifier: identifier.to_string(),
        }));
    }

    fn pop_min(&mut self) {
        if let Some(Reverse(entry)) = self.heap.pop() {
            self.members.remove(&entry.identifier);
        }
    }

    fn refresh_threshold(&mut self) {
        self.threshold = self.heap.peek().map_or(0.0, |Reverse(entry)| entry.trust);
    }

    fn clear(&mut self) {
        self.heap.clear();
        self.members.clear();
        self.threshold = 0.0;
    }
}

impl ThresholdTracker for TopKTracker {
    fn kind(&self) -> TrackerKind {
        TrackerKind::TopK
    }

    fn observe(&mut self, change: &TrustChange<'_>, identities: &IdentityTable) {
        let significant = (change.new_trust - change.old_trust).abs() > self.significant_change
            || change.crossed(self.qualification);
        if significant {
            self.rebuild(identities);
        } else {
            self.incremental(change, identities);
        }
    }

    fn current_threshold(&self) -> f64 {
        self.threshold
    }

    fn is_high_priority(&self, identifier: &str, _trust: f64) -> Option<bool> {
        Some(self.contains(identifier))
    }

    fn population_size(&self) -> usize {
        self.qualified_count
    }

    fn high_count(&self) -> Option<usize> {
        Some(self.heap.len())
    }

    fn population_values(&self) -> Vec<f64> {
        let mut values: Vec<f64> = self.heap.iter().map(|Reverse(entry)| entry.trust).collect();
        values.sort_unstable_by(f64::total_cmp);
        values
    }

    fn diagnostics(&self) -> TrackerDiagnostics {
        TrackerDiagnostics::TopK {
            target_size: self.target_size(),
            actual_size: self.heap.len(),
            top_fraction: self.top_fraction,
            members: self.ranked_members(),
        }
    }

    fn reset(&mut self) {
        self.clear();
        self.qualified_count = 0;
        self.rebuilds = 0;
    }
}
