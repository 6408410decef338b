//! End-to-end scenarios against the policy service.
//!
//! Validates:
//! - Trust growth for regular senders and collapse for floods
//! - The qualification boundary and monotonic punishment
//! - Threshold activation (percentile) and tier size (top-K)
//! - Reset semantics and determinism

use ptg_policy::{
    Action, DecisionRequest, PolicyService, ResetStatus, TrackerDiagnostics, TrackerKind,
};
use ptg_testkit::fixtures::{self, FLOOD_DELTA, QUALIFYING_STREAK, REGULAR_DELTA, deltas};
use ptg_testkit::{
    assert_all_actions, assert_invalid_request, assert_population_consistent,
    assert_trust_increasing, init_test_tracing,
};

// ============================================================================
// Sender behaviour
// ============================================================================

#[test]
fn regular_sender_builds_trust_slowly() {
    init_test_tracing();
    let service = fixtures::service(fixtures::config::percentile());

    let decisions = fixtures::replay(&service, "A", &deltas::regular(3));

    assert_trust_increasing(&decisions);
    assert_all_actions(&decisions, Action::Drop);
    assert_eq!(decisions[2].success_streak, 3);
    assert!(decisions.iter().all(|d| d.p_value > 0.005));

    let record = service.identity("A").expect("sender recorded");
    assert_eq!(record.success_streak, 3);
    assert!(record.trust > 0.0 && record.trust < 0.2);
}

#[test]
#[allow(clippy::float_cmp)]
fn flooding_sender_is_always_dropped() {
    init_test_tracing();
    let service = fixtures::service(fixtures::config::percentile());

    let decisions = fixtures::replay(&service, "B", &deltas::flood(10));

    assert_all_actions(&decisions, Action::Drop);
    for decision in &decisions {
        assert!(decision.p_value < 0.005, "p = {}", decision.p_value);
        assert_eq!(decision.trust, 0.0);
        assert_eq!(decision.success_streak, 0);
    }
}

#[test]
fn irregular_but_plausible_sender_still_qualifies() {
    init_test_tracing();
    let service = fixtures::service(fixtures::config::binary());

    let decisions = fixtures::replay(&service, "J", &deltas::jittered(QUALIFYING_STREAK));

    assert_eq!(decisions.last().map(|d| d.action), Some(Action::Forward));
    assert_eq!(decisions.last().map(|d| d.success_streak), Some(42));
}

#[test]
fn silence_is_punished_like_a_flood() {
    init_test_tracing();
    let service = fixtures::service(fixtures::config::binary());
    fixtures::replay(&service, "S", &deltas::regular(fixtures::SATURATING_STREAK));

    let decision = service.evaluate("S", 30.0);

    assert!(decision.p_value < 0.005);
    assert_eq!(decision.success_streak, 0);
    assert!((decision.trust - 0.2).abs() < 1e-12);
}

#[test]
fn punishment_is_geometric_and_monotonic() {
    init_test_tracing();
    let service = fixtures::service(fixtures::config::percentile());
    fixtures::replay(&service, "M", &deltas::regular(fixtures::SATURATING_STREAK));
    let initial = service.identity("M").expect("sender recorded").trust;
    assert!((initial - 1.0).abs() < f64::EPSILON);

    let decisions = fixtures::replay(&service, "M", &deltas::flood(6));

    let mut previous = initial;
    for (n, decision) in decisions.iter().enumerate() {
        let expected = initial * 0.2_f64.powi(i32::try_from(n + 1).unwrap());
        assert!(
            (decision.trust - expected).abs() <= expected * 1e-12,
            "after {} failures: {} != {expected}",
            n + 1,
            decision.trust
        );
        assert!(decision.trust < previous);
        assert_eq!(decision.success_streak, 0);
        previous = decision.trust;
    }
}

#[test]
fn qualification_boundary_is_exclusive() {
    init_test_tracing();
    let service = fixtures::service(fixtures::config::percentile());
    fixtures::replay(&service, "Q", &deltas::regular(fixtures::SATURATING_STREAK));

    // 1.0 * 0.2 lands exactly on the boundary.
    let at_boundary = service.evaluate("Q", FLOOD_DELTA);
    assert!((at_boundary.trust - 0.2).abs() < 1e-15);
    assert_eq!(at_boundary.action, Action::Drop);

    // One regular arrival lifts trust by a tiny reward.
    let above = service.evaluate("Q", REGULAR_DELTA);
    assert!(above.trust > 0.2);
    assert_ne!(above.action, Action::Drop);
    assert_eq!(above.action, Action::Low);
}

// ============================================================================
// Tracker behaviour through the service
// ============================================================================

#[test]
#[allow(clippy::float_cmp)]
fn percentile_threshold_activates_on_twentieth_sample() {
    init_test_tracing();
    let service = fixtures::service(fixtures::config::percentile());
    let ids = fixtures::warm_up(&service, "p", 20, QUALIFYING_STREAK - 1);
    assert_eq!(service.stats().qualified_count, 0);

    for id in &ids[..19] {
        let decision = service.evaluate(id, REGULAR_DELTA);
        assert_eq!(decision.threshold, 0.8);
        assert_eq!(decision.action, Action::Low);
    }

    let decision = service.evaluate(&ids[19], REGULAR_DELTA);
    assert_eq!(decision.population_size, 20);
    assert_ne!(decision.threshold, 0.8);
    // All twenty share the same streak, so the cut line is their common trust.
    assert_eq!(decision.threshold, decision.trust);
    assert_eq!(decision.action, Action::High);

    assert_population_consistent(&service);
}

#[test]
fn percentile_stats_report_distribution() {
    init_test_tracing();
    let service = fixtures::service(fixtures::config::percentile());
    fixtures::graded_population(&service, "g", 24);

    let stats = service.stats();
    assert_eq!(stats.strategy, TrackerKind::Percentile);
    assert_eq!(stats.total_identities, 24);
    assert_eq!(stats.qualified_count, 24);
    assert_eq!(stats.count(Action::Drop), 0);
    assert_eq!(
        stats.count(Action::High) + stats.count(Action::Low),
        stats.total_identities
    );
    assert_eq!(stats.at_or_above_threshold_count, stats.count(Action::High));
    assert!(stats.trust_distribution.min > 0.2);
    assert!(stats.trust_distribution.max <= 1.0);

    match stats.tracker {
        TrackerDiagnostics::Percentile {
            samples,
            percentiles,
            qualified_range,
            ..
        } => {
            assert_eq!(samples, 24);
            assert!(percentiles.p95.is_some());
            let range = qualified_range.expect("sample is not empty");
            assert!((range.min - stats.trust_distribution.min).abs() < f64::EPSILON);
        }
        other => panic!("unexpected diagnostics: {other:?}"),
    }
}

#[test]
fn top_k_holds_ceil_fraction_of_qualified() {
    init_test_tracing();
    let service = fixtures::service(fixtures::config::top_k());
    fixtures::graded_population(&service, "k", 13);

    let decision = service.evaluate("k-0", REGULAR_DELTA);
    assert_eq!(decision.qualified_count, 13);
    // ceil(0.25 * 13) = 4
    assert_eq!(decision.high_count, Some(4));

    let stats = service.stats();
    assert_eq!(stats.count(Action::High), 4);
    assert_eq!(stats.count(Action::Low), 9);
    match stats.tracker {
        TrackerDiagnostics::TopK {
            target_size,
            actual_size,
            members,
            ..
        } => {
            assert_eq!(target_size, 4);
            assert_eq!(actual_size, 4);
            assert_eq!(members.len(), 4);
            assert!(members.windows(2).all(|w| w[0].trust >= w[1].trust));
        }
        other => panic!("unexpected diagnostics: {other:?}"),
    }

    assert_population_consistent(&service);
}

#[test]
fn top_k_debug_view_ranks_everyone() {
    init_test_tracing();
    let service = fixtures::service(fixtures::config::top_k());
    fixtures::graded_population(&service, "d", 8);
    fixtures::replay(&service, "flood", &deltas::flood(3));

    let debug = service.debug();
    assert_eq!(debug.strategy, TrackerKind::TopK);
    assert_eq!(debug.total_qualified, 8);
    assert_eq!(debug.all_qualified.len(), 8);
    assert!(debug.all_qualified.iter().all(|m| m.identifier != "flood"));
    assert!(
        debug
            .all_qualified
            .windows(2)
            .all(|w| w[0].trust >= w[1].trust)
    );
    assert_eq!(debug.population.len(), 2);
    assert!((debug.threshold - debug.population[0]).abs() < f64::EPSILON);
}

#[test]
fn binary_deployment_forwards_every_qualified_sender() {
    init_test_tracing();
    let service = fixtures::service(fixtures::config::binary());
    fixtures::graded_population(&service, "b", 10);
    fixtures::replay(&service, "noisy", &deltas::flood(5));

    let stats = service.stats();
    assert_eq!(stats.count(Action::Forward), 10);
    assert_eq!(stats.count(Action::Drop), 1);
    assert_eq!(stats.count(Action::High), 0);
    assert!((stats.threshold - 0.2).abs() < f64::EPSILON);
    assert!(service.debug().population.is_empty());
    assert_population_consistent(&service);
}

// ============================================================================
// Reset, validation, determinism
// ============================================================================

#[test]
#[allow(clippy::float_cmp)]
fn reset_restores_strategy_defaults() {
    init_test_tracing();
    for (config, default_threshold) in [
        (fixtures::config::percentile(), 0.8),
        (fixtures::config::top_k(), 0.0),
    ] {
        let service = fixtures::service(config);
        fixtures::graded_population(&service, "r", 24);
        assert_ne!(service.threshold(), default_threshold);

        let ack = service.reset();
        assert_eq!(ack.status, ResetStatus::ResetComplete);

        let stats = service.stats();
        assert_eq!(stats.total_identities, 0);
        assert_eq!(stats.qualified_count, 0);
        assert_eq!(stats.population_size, 0);
        assert_eq!(stats.decisions_served, 0);
        assert_eq!(stats.threshold, default_threshold);
        assert!(service.identity("r-0").is_none());

        let decision = service.evaluate("r-0", REGULAR_DELTA);
        assert_eq!(decision.success_streak, 1);
        assert_eq!(decision.action, Action::Drop);
    }
}

#[test]
fn invalid_requests_leave_state_untouched() {
    init_test_tracing();
    let service = fixtures::service(fixtures::config::percentile());
    service.evaluate("keep", REGULAR_DELTA);

    for body in [
        r#"{"interArrivalDelta":1.0}"#,
        r#"{"identifier":"   ","interArrivalDelta":1.0}"#,
        r#"{"identifier":"x","interArrivalDelta":-2.5}"#,
    ] {
        let request = DecisionRequest::from_json(body).expect("well-formed json");
        assert_invalid_request(&service.decide(&request));
    }
    assert_invalid_request(&DecisionRequest::from_json(r#"{"identifier":1}"#));

    let stats = service.stats();
    assert_eq!(stats.total_identities, 1);
    assert_eq!(stats.decisions_served, 1);
    assert!(service.identity("x").is_none());
}

#[test]
fn legacy_request_shape_is_accepted() {
    let service = fixtures::service(fixtures::config::percentile());
    let request = DecisionRequest::from_json(r#"{"ip":"192.0.2.7","time_delta":1.0}"#)
        .expect("legacy body parses");

    let decision = service.decide(&request).expect("valid request");

    assert_eq!(decision.success_streak, 1);
    assert!(service.identity("192.0.2.7").is_some());
}

#[test]
fn identical_scripts_yield_identical_decisions() {
    init_test_tracing();
    let script: Vec<(String, f64)> = (0..400)
        .map(|i| {
            let id = format!("s-{}", i % 7);
            let delta = if i % 53 == 0 { FLOOD_DELTA } else { REGULAR_DELTA };
            (id, delta)
        })
        .collect();

    let run = || {
        let service = PolicyService::new(fixtures::config::top_k()).expect("valid config");
        script
            .iter()
            .map(|(id, delta)| service.evaluate(id, *delta))
            .collect::<Vec<_>>()
    };

    assert_eq!(run(), run());
}
