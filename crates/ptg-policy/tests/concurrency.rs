//! Concurrent access to a shared policy service.

use std::sync::Arc;
use std::thread;

use ptg_policy::{Action, DecisionRequest, PolicyConfig, PolicyService};
use ptg_testkit::{assert_population_consistent, fixtures, init_test_tracing};

const WORKERS: usize = 8;
const SENDERS_PER_WORKER: usize = 6;

fn hammer(service: &PolicyService, worker: usize) {
    for round in 0..fixtures::SATURATING_STREAK {
        for sender in 0..SENDERS_PER_WORKER {
            let id = fixtures::identity(&format!("w{worker}"), sender);
            // Every third sender of every worker floods once mid-run.
            let delta = if sender % 3 == 0 && round == 20 {
                fixtures::FLOOD_DELTA
            } else {
                fixtures::REGULAR_DELTA
            };
            service.evaluate(&id, delta);
        }
        // A sender shared by every worker.
        service.evaluate("shared", fixtures::REGULAR_DELTA);
    }
}

#[test]
fn threads_leave_population_consistent() {
    init_test_tracing();
    for config in [PolicyConfig::percentile(), PolicyConfig::top_k()] {
        let service = fixtures::service(config);

        thread::scope(|scope| {
            for worker in 0..WORKERS {
                let service = &service;
                scope.spawn(move || hammer(service, worker));
            }
        });

        let stats = service.stats();
        let per_worker = fixtures::SATURATING_STREAK * (SENDERS_PER_WORKER + 1);
        assert_eq!(stats.decisions_served, (WORKERS * per_worker) as u64);
        assert_eq!(stats.total_identities, WORKERS * SENDERS_PER_WORKER + 1);
        assert_population_consistent(&service);

        // Senders that never flooded have a full streak of regular arrivals.
        let steady = service.identity("w0-1").expect("sender recorded");
        assert_eq!(steady.success_streak, fixtures::SATURATING_STREAK as u64);
        assert!(steady.trust > 0.2);
        let shared = service.identity("shared").expect("sender recorded");
        assert_eq!(shared.success_streak, (WORKERS * fixtures::SATURATING_STREAK) as u64);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn tasks_share_service_behind_arc() {
    init_test_tracing();
    let service = PolicyService::shared(PolicyConfig::binary()).expect("valid config");

    let mut handles = Vec::new();
    for task in 0..16 {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move {
            let request = DecisionRequest::new(format!("t{task}"), fixtures::REGULAR_DELTA);
            let mut last = None;
            for _ in 0..fixtures::QUALIFYING_STREAK {
                last = Some(service.decide(&request).expect("valid request"));
                tokio::task::yield_now().await;
            }
            last.map(|d| d.action)
        }));
    }

    for handle in handles {
        let action = handle.await.expect("task completed");
        assert_eq!(action, Some(Action::Forward));
    }

    let stats = service.stats();
    assert_eq!(stats.count(Action::Forward), 16);
    assert_eq!(stats.qualified_count, 16);
}

#[test]
fn reset_races_with_decisions() {
    init_test_tracing();
    let service = fixtures::service(PolicyConfig::top_k());

    thread::scope(|scope| {
        for worker in 0..4 {
            let service = &service;
            scope.spawn(move || hammer(service, worker));
        }
        let service = &service;
        scope.spawn(move || {
            for _ in 0..10 {
                service.reset();
                thread::yield_now();
            }
        });
    });

    // Whatever interleaving happened, table and tracker agree.
    assert_population_consistent(&service);
}
