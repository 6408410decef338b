//! The policy service: one lock around all admission state.
//!
//! Every operation takes the same exclusive lock. A decision performs the
//! whole read-modify-write (lookup, trust update, tracker maintenance,
//! classification, persist) inside one critical section, so the identity
//! table and the tracker's population view can never be observed out of step.
//! Nothing inside the lock blocks or performs I/O. Population gauges are set
//! while the guard is held, so the last value written always matches the
//! latest state; logs and counters are emitted after the guard is released.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use ptg_telemetry::metrics;

use crate::classifier::{Action, Classifier};
use crate::regularity;
use crate::tracker::{RankedMember, ThresholdTracker, TrustChange, build_tracker};
use crate::trust::{IdentityRecord, IdentityTable, TrustEstimator};
use crate::wire::{
    DebugSnapshot, Decision, DecisionRequest, ResetAck, StatsSnapshot, TrustSummary,
};
use crate::{PolicyConfig, PolicyResult};

/// State guarded by the service lock.
#[derive(Debug)]
struct PolicyState {
    identities: IdentityTable,
    tracker: Box<dyn ThresholdTracker>,
    qualified_count: usize,
    decisions: u64,
}

/// Outcome of one locked evaluation.
struct Evaluated {
    decision: Decision,
    previous_threshold: f64,
}

impl PolicyState {
    fn new(config: &PolicyConfig) -> Self {
        Self {
            identities: IdentityTable::new(),
            tracker: build_tracker(config),
            qualified_count: 0,
            decisions: 0,
        }
    }

    fn evaluate(
        &mut self,
        identifier: &str,
        p_value: f64,
        estimator: &TrustEstimator,
        classifier: &Classifier,
        qualification: f64,
    ) -> Evaluated {
        let previous = self.identities.get_or_default(identifier);
        let updated = estimator.update(previous, p_value);
        self.identities.insert(identifier, updated);

        let change = TrustChange {
            identifier,
            old_trust: previous.trust,
            new_trust: updated.trust,
            qualified_count: self.qualified_count,
        };
        if change.crossed(qualification) {
            if updated.trust > qualification {
                self.qualified_count += 1;
            } else {
                self.qualified_count -= 1;
            }
        }
        let change = TrustChange {
            qualified_count: self.qualified_count,
            ..change
        };

        let previous_threshold = self.tracker.current_threshold();
        self.tracker.observe(&change, &self.identities);

        let verdict = self.tracker.is_high_priority(identifier, updated.trust);
        let action = classifier.classify(updated.trust, verdict);
        self.decisions += 1;

        Evaluated {
            decision: Decision {
                action,
                trust: updated.trust,
                p_value,
                threshold: self.tracker.current_threshold(),
                population_size: self.tracker.population_size(),
                qualified_count: self.qualified_count,
                high_count: self.tracker.high_count(),
                success_streak: updated.success_streak,
            },
            previous_threshold,
        }
    }

    fn classify_existing(&self, classifier: &Classifier, identifier: &str, trust: f64) -> Action {
        classifier.classify(trust, self.tracker.is_high_priority(identifier, trust))
    }

    fn ranked_qualified(&self, qualification: f64) -> Vec<RankedMember> {
        let mut ranked: Vec<RankedMember> = self
            .identities
            .qualified(qualification)
            .map(|(identifier, trust)| RankedMember {
                identifier: identifier.to_string(),
                trust,
            })
            .collect();
        ranked.sort_unstable_by(|a, b| {
            b.trust
                .total_cmp(&a.trust)
                .then_with(|| a.identifier.cmp(&b.identifier))
        });
        ranked
    }
}

/// Admission decision authority.
///
/// Cheap to share: wrap in an [`Arc`] and call from any number of threads or
/// tasks.
#[derive(Debug)]
pub struct PolicyService {
    config: PolicyConfig,
    estimator: TrustEstimator,
    classifier: Classifier,
    state: Mutex<PolicyState>,
}

impl PolicyService {
    /// Build a service from a validated configuration.
    ///
    /// # Errors
    /// Returns [`PolicyError::InvalidConfig`](crate::PolicyError::InvalidConfig)
    /// if the configuration does not validate.
    pub fn new(config: PolicyConfig) -> PolicyResult<Self> {
        config.validate()?;
        info!(
            strategy = %config.tracker,
            expected_interval = config.expected_interval,
            qualification_threshold = config.qualification_threshold,
            top_fraction = config.top_fraction,
            max_samples = config.max_samples,
            min_samples = config.min_samples,
            "policy service initialised"
        );
        Ok(Self {
            estimator: TrustEstimator::from_config(&config),
            classifier: Classifier::new(config.qualification_threshold),
            state: Mutex::new(PolicyState::new(&config)),
            config,
        })
    }

    /// Build a shared service.
    ///
    /// # Errors
    /// See [`PolicyService::new`].
    pub fn shared(config: PolicyConfig) -> PolicyResult<Arc<Self>> {
        Self::new(config).map(Arc::new)
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Validate and evaluate a wire request.
    ///
    /// A rejected request never touches service state.
    ///
    /// # Errors
    /// Returns [`PolicyError::InvalidRequest`](crate::PolicyError::InvalidRequest)
    /// for malformed input.
    pub fn decide(&self, request: &DecisionRequest) -> PolicyResult<Decision> {
        match request.validate() {
            Ok((identifier, delta)) => Ok(self.evaluate(identifier, delta)),
            Err(err) => {
                warn!(error = %err, "rejected policy request");
                metrics::record_rejected(err.code());
                Err(err)
            }
        }
    }

    /// Evaluate one arrival from `identifier`, `delta` seconds after its previous one.
    ///
    /// `delta` must be finite and non-negative; [`decide`](Self::decide)
    /// enforces that for untrusted input.
    pub fn evaluate(&self, identifier: &str, delta: f64) -> Decision {
        let started = Instant::now();
        let p_value = regularity::p_value(delta, self.config.expected_interval);

        let Evaluated {
            decision,
            previous_threshold,
        } = {
            let mut state = self.state.lock();
            let evaluated = state.evaluate(
                identifier,
                p_value,
                &self.estimator,
                &self.classifier,
                self.config.qualification_threshold,
            );
            metrics::update_population(
                evaluated.decision.threshold,
                evaluated.decision.population_size,
                evaluated.decision.qualified_count,
            );
            evaluated
        };

        debug!(
            identifier,
            delta,
            action = %decision.action,
            trust = decision.trust,
            p_value = decision.p_value,
            streak = decision.success_streak,
            threshold = decision.threshold,
            population = decision.population_size,
            "policy decision"
        );
        if previous_threshold.to_bits() != decision.threshold.to_bits() {
            info!(
                previous = previous_threshold,
                threshold = decision.threshold,
                population = decision.population_size,
                qualified = decision.qualified_count,
                "high threshold updated"
            );
        }

        metrics::record_decision(decision.action.as_str(), started.elapsed().as_secs_f64());

        decision
    }

    /// Current record for `identifier`, if it has been seen.
    #[must_use]
    pub fn identity(&self, identifier: &str) -> Option<IdentityRecord> {
        self.state.lock().identities.get(identifier)
    }

    /// Current cut line.
    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.state.lock().tracker.current_threshold()
    }

    /// Snapshot of counts, trust distribution and tracker diagnostics.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        let state = self.state.lock();
        let qualification = self.config.qualification_threshold;
        let threshold = state.tracker.current_threshold();

        let mut action_counts: BTreeMap<Action, usize> = BTreeMap::new();
        let mut at_or_above_threshold_count = 0;
        for (identifier, record) in state.identities.iter() {
            let action = state.classify_existing(&self.classifier, identifier, record.trust);
            *action_counts.entry(action).or_default() += 1;
            if record.trust > qualification && record.trust >= threshold {
                at_or_above_threshold_count += 1;
            }
        }

        StatsSnapshot {
            strategy: self.config.tracker,
            total_identities: state.identities.len(),
            action_counts,
            qualified_count: state.qualified_count,
            at_or_above_threshold_count,
            threshold,
            population_size: state.tracker.population_size(),
            trust_distribution: TrustSummary::from_values(
                state.identities.iter().map(|(_, record)| record.trust),
            ),
            decisions_served: state.decisions,
            tracker: state.tracker.diagnostics(),
        }
    }

    /// Ranked view of the qualified population and the tracker's holdings.
    #[must_use]
    pub fn debug(&self) -> DebugSnapshot {
        let state = self.state.lock();
        let all_qualified = state.ranked_qualified(self.config.qualification_threshold);
        DebugSnapshot {
            strategy: self.config.tracker,
            threshold: state.tracker.current_threshold(),
            total_qualified: all_qualified.len(),
            all_qualified,
            population: state.tracker.population_values(),
            tracker: state.tracker.diagnostics(),
        }
    }

    /// Forget every identity and restore the default threshold.
    pub fn reset(&self) -> ResetAck {
        let threshold = {
            let mut state = self.state.lock();
            state.identities.clear();
            state.tracker.reset();
            state.qualified_count = 0;
            state.decisions = 0;
            let threshold = state.tracker.current_threshold();
            metrics::update_population(threshold, 0, 0);
            threshold
        };
        info!(threshold, "all policy state reset");
        metrics::record_reset();
        ResetAck::default()
    }
}
