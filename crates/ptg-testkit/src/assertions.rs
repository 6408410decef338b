//! Assertion helpers for policy tests.

use ptg_policy::tracker::target_size;
use ptg_policy::{Action, Decision, PolicyError, PolicyResult, PolicyService, TrackerKind};

/// Trust values of all qualified identities, ascending, from a full scan.
#[must_use]
pub fn scanned_qualified(service: &PolicyService) -> Vec<f64> {
    let mut values: Vec<f64> = service
        .debug()
        .all_qualified
        .into_iter()
        .map(|member| member.trust)
        .collect();
    values.sort_unstable_by(f64::total_cmp);
    values
}

/// Assert that the tracker's population view matches a full scan.
///
/// - percentile: the sample is exactly the qualified trusts (while fewer than
///   `max_samples` identities have ever qualified)
/// - top-K: the held values are exactly the `K` largest qualified trusts
/// - disabled: nothing is held
///
/// # Panics
///
/// Panics on any mismatch.
pub fn assert_population_consistent(service: &PolicyService) {
    let debug = service.debug();
    let stats = service.stats();
    let mut expected = scanned_qualified(service);

    assert_eq!(
        stats.qualified_count,
        expected.len(),
        "qualified counter drifted from table"
    );
    assert_eq!(debug.total_qualified, expected.len());

    match service.config().tracker {
        TrackerKind::Percentile => {}
        TrackerKind::TopK => {
            let k = target_size(expected.len(), service.config().top_fraction);
            expected.drain(..expected.len() - k);
        }
        TrackerKind::Disabled => expected.clear(),
    }
    assert_eq!(
        debug.population, expected,
        "{} population view diverged from full scan",
        service.config().tracker
    );
}

/// Assert that every decision carries `action`.
///
/// # Panics
///
/// Panics on the first decision with a different action.
pub fn assert_all_actions(decisions: &[Decision], action: Action) {
    for (i, decision) in decisions.iter().enumerate() {
        assert_eq!(
            decision.action, action,
            "decision {i} was {} (trust {})",
            decision.action, decision.trust
        );
    }
}

/// Assert that trust strictly increases across `decisions`.
///
/// # Panics
///
/// Panics at the first non-increasing step.
pub fn assert_trust_increasing(decisions: &[Decision]) {
    for pair in decisions.windows(2) {
        assert!(
            pair[1].trust > pair[0].trust,
            "trust did not increase: {} -> {}",
            pair[0].trust,
            pair[1].trust
        );
    }
}

/// Assert that a result is an `InvalidRequest` rejection.
///
/// # Panics
///
/// Panics if the result is `Ok` or a different error.
pub fn assert_invalid_request<T: std::fmt::Debug>(result: &PolicyResult<T>) {
    match result {
        Err(PolicyError::InvalidRequest(_)) => {}
        other => panic!("Expected InvalidRequest but got: {other:?}"),
    }
}
