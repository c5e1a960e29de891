//! End-to-end session scenarios against the simulated gateway.
//!
//! All tests run on a paused clock so latency and rollback delays are
//! deterministic and instant.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use parking_lot::Mutex;
use tally_client::{ClientSession, ReconcileResult, SessionConfig, SkipReason};
use tally_server::{
    AlwaysFail, AlwaysSucceed, AuthoritativeStore, FailurePolicy, FixedLatency, MutationEndpoint,
    MutationGateway, RandomFailure, ScriptedFailure, SharedStore, TransportError, UniformLatency,
    shared_store,
};
use tally_types::{Counter, MutationOutcome};
use tokio::sync::oneshot;

const LATENCY: Duration = Duration::from_millis(100);

fn gateway(store: &SharedStore, failure: impl FailurePolicy + 'static) -> Arc<dyn MutationEndpoint> {
    Arc::new(
        MutationGateway::new(store.clone())
            .with_latency(FixedLatency(LATENCY))
            .with_failure_policy(failure),
    )
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_success_path() {
    let store = shared_store();
    let session = ClientSession::connect(gateway(&store, AlwaysSucceed), SessionConfig::default());

    let pending = session.request_increment();
    let shown = session.snapshot();
    assert_eq!(shown.value, 1);
    assert_eq!(shown.confirmed, Counter::ZERO);
    assert_eq!(shown.in_flight, 1);

    let result = pending.wait().await.unwrap();
    assert_eq!(result, ReconcileResult::Adopted { confirmed: Counter::new(1, 1) });

    let shown = session.snapshot();
    assert_eq!(shown.confirmed, Counter::new(1, 1));
    assert_eq!(shown.value, 1);
    assert_eq!(shown.error, None);
    assert_eq!(shown.in_flight, 0);
}

#[tokio::test(start_paused = true)]
async fn test_failure_path() {
    let store = shared_store();
    let session = ClientSession::connect(gateway(&store, AlwaysFail), SessionConfig::default());

    let pending = session.request_increment();
    assert_eq!(session.snapshot().value, 1);

    // Response is in, rollback delay has not elapsed yet.
    tokio::time::sleep(LATENCY + Duration::from_millis(50)).await;
    let shown = session.snapshot();
    assert_eq!(shown.value, 1);
    assert_eq!(shown.error.as_deref(), Some("Network Failed...!"));

    let result = pending.wait().await.unwrap();
    assert_eq!(result, ReconcileResult::RolledBack { value: 0 });

    let shown = session.snapshot();
    assert_eq!(shown.value, 0);
    assert_eq!(shown.error.as_deref(), Some("Network Failed...!"));
    assert_eq!(store.read(), Counter::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_rollback_waits_for_configured_delay() {
    let store: SharedStore = Arc::new(AuthoritativeStore::with_initial(Counter::new(5, 5)));
    let session = ClientSession::connect(gateway(&store, AlwaysFail), SessionConfig::default());

    let start = tokio::time::Instant::now();
    let pending = session.request_increment();
    assert_eq!(session.snapshot().value, 6);

    let result = pending.wait().await.unwrap();
    assert_eq!(result, ReconcileResult::RolledBack { value: 5 });
    assert!(start.elapsed() >= LATENCY + SessionConfig::default().rollback_delay());
    assert_eq!(session.snapshot().error.as_deref(), Some("Network Failed...!"));
    assert_eq!(store.read(), Counter::new(5, 5));
}

#[tokio::test(start_paused = true)]
async fn test_custom_rollback_delay() {
    let store = shared_store();
    let config = SessionConfig { rollback_delay_ms: 50 };
    let session = ClientSession::connect(gateway(&store, AlwaysFail), config.clone());

    let start = tokio::time::Instant::now();
    let pending = session.request_increment();

    tokio::time::sleep(LATENCY + Duration::from_millis(40)).await;
    assert!(!pending.is_finished());
    assert_eq!(session.snapshot().value, 1);
    assert!(session.snapshot().error.is_some());

    let result = pending.wait().await.unwrap();
    assert_eq!(result, ReconcileResult::RolledBack { value: 0 });
    let elapsed = start.elapsed();
    assert!(elapsed >= LATENCY + config.rollback_delay());
    assert!(elapsed < LATENCY + SessionConfig::default().rollback_delay());
    assert_eq!(session.snapshot().value, 0);
}

#[tokio::test(start_paused = true)]
async fn test_overlapping_clicks_with_one_failure() {
    let store = shared_store();
    let session = ClientSession::connect(
        gateway(&store, ScriptedFailure::new([false, true, false])),
        SessionConfig::default(),
    );

    let pending: Vec<_> = (0..3).map(|_| session.request_increment()).collect();
    assert!(pending.windows(2).all(|w| w[0].id() < w[1].id()));
    assert_eq!(session.snapshot().value, 3);
    assert_eq!(session.snapshot().in_flight, 3);

    for p in join_all(pending.into_iter().map(|p| p.wait())).await {
        p.unwrap();
    }

    let shown = session.snapshot();
    assert_eq!(store.read(), Counter::new(2, 2));
    assert_eq!(shown.confirmed, Counter::new(2, 2));
    assert_eq!(shown.value, 2);
    assert_eq!(shown.in_flight, 0);
    assert_eq!(shown.error.as_deref(), Some("Network Failed...!"));
}

#[tokio::test(start_paused = true)]
async fn test_next_click_clears_error() {
    let store = shared_store();
    let session = ClientSession::connect(
        gateway(&store, ScriptedFailure::new([true])),
        SessionConfig::default(),
    );

    session.request_increment().wait().await.unwrap();
    assert!(session.snapshot().error.is_some());

    let pending = session.request_increment();
    assert_eq!(session.snapshot().error, None);
    pending.wait().await.unwrap();
    assert_eq!(session.snapshot().value, 1);
}

#[tokio::test(start_paused = true)]
async fn test_subscribers_see_every_step() {
    let store = shared_store();
    let session = ClientSession::connect(gateway(&store, AlwaysSucceed), SessionConfig::default());
    let mut rx = session.subscribe();
    assert_eq!(rx.borrow_and_update().value, 0);

    let pending = session.request_increment();
    assert!(rx.has_changed().unwrap());
    assert_eq!(rx.borrow_and_update().value, 1);

    rx.changed().await.unwrap();
    let shown = rx.borrow_and_update().clone();
    assert_eq!(shown.confirmed, Counter::new(1, 1));
    pending.wait().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_sessions_share_one_store() {
    let store = shared_store();
    let a = ClientSession::connect_labeled(gateway(&store, AlwaysSucceed), SessionConfig::default(), "counter-a");
    let b = ClientSession::connect_labeled(gateway(&store, AlwaysSucceed), SessionConfig::default(), "counter-b");
    assert_eq!(a.name(), "counter-a");

    a.request_increment().wait().await.unwrap();
    a.request_increment().wait().await.unwrap();
    assert_eq!(b.snapshot().value, 0);

    // b never refreshed; its own success still lands on the newest version.
    let result = b.request_increment().wait().await.unwrap();
    assert_eq!(result, ReconcileResult::Adopted { confirmed: Counter::new(3, 3) });
    assert_eq!(b.snapshot().value, 3);

    // a catches up through the read endpoint.
    assert_eq!(a.snapshot().value, 2);
    assert!(a.refresh());
    assert_eq!(a.snapshot().value, 3);
    assert!(!a.refresh());
}

#[tokio::test(start_paused = true)]
async fn test_random_traffic_converges() {
    let store = shared_store();
    let endpoint: Arc<dyn MutationEndpoint> = Arc::new(
        MutationGateway::new(store.clone())
            .with_latency(UniformLatency::default())
            .with_failure_policy(RandomFailure::default()),
    );
    let sessions: Vec<_> = ["home", "counter-a", "counter-b"]
        .into_iter()
        .map(|label| ClientSession::connect_labeled(endpoint.clone(), SessionConfig::default(), label))
        .collect();

    let mut pending = Vec::new();
    for _ in 0..20 {
        for session in &sessions {
            pending.push(session.request_increment());
        }
        tokio::time::sleep(Duration::from_millis(37)).await;
    }
    for result in join_all(pending.into_iter().map(|p| p.wait())).await {
        result.unwrap();
    }

    let authoritative = store.read();
    for session in &sessions {
        session.refresh();
        let shown = session.snapshot();
        assert_eq!(shown.in_flight, 0);
        assert_eq!(shown.confirmed, authoritative);
        assert_eq!(shown.value, authoritative.value);
    }
}

// ============================================================================
// Hand-resolved endpoint for ordering tests
// ============================================================================

/// Endpoint whose attempts block until the test resolves them.
#[derive(Default)]
struct ControlledEndpoint {
    waiting: Mutex<Vec<oneshot::Sender<MutationOutcome>>>,
}

impl ControlledEndpoint {
    fn waiting(&self) -> usize {
        self.waiting.lock().len()
    }

    fn resolve(&self, index: usize, outcome: MutationOutcome) {
        let tx = self.waiting.lock().remove(index);
        let _ = tx.send(outcome);
    }

    fn drop_attempt(&self, index: usize) {
        drop(self.waiting.lock().remove(index));
    }
}

#[async_trait]
impl MutationEndpoint for ControlledEndpoint {
    fn read(&self) -> Counter {
        Counter::ZERO
    }

    async fn attempt_increment(&self) -> Result<MutationOutcome, TransportError> {
        let (tx, rx) = oneshot::channel();
        self.waiting.lock().push(tx);
        rx.await
            .map_err(|_| TransportError::Unavailable("response dropped".into()))
    }
}

async fn settle_until(endpoint: &ControlledEndpoint, waiting: usize) {
    while endpoint.waiting() < waiting {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn test_late_success_does_not_clobber_newer_state() {
    let endpoint = Arc::new(ControlledEndpoint::default());
    let session = ClientSession::connect(endpoint.clone(), SessionConfig::default());

    let first = session.request_increment();
    settle_until(&endpoint, 1).await;
    let second = session.request_increment();
    settle_until(&endpoint, 2).await;

    // The second attempt's response arrives first.
    endpoint.resolve(1, MutationOutcome::applied(Counter::new(2, 2)));
    assert_eq!(
        second.wait().await.unwrap(),
        ReconcileResult::Adopted { confirmed: Counter::new(2, 2) }
    );
    assert_eq!(session.snapshot().value, 2);

    endpoint.resolve(0, MutationOutcome::applied(Counter::new(1, 1)));
    assert_eq!(
        first.wait().await.unwrap(),
        ReconcileResult::Skipped {
            reason: SkipReason::Stale {
                incoming: Counter::new(1, 1),
                confirmed: Counter::new(2, 2),
            }
        }
    );

    let shown = session.snapshot();
    assert_eq!(shown.confirmed, Counter::new(2, 2));
    assert_eq!(shown.value, 2);
}

#[tokio::test(start_paused = true)]
async fn test_transport_error_rolls_back() {
    let endpoint = Arc::new(ControlledEndpoint::default());
    let session = ClientSession::connect(endpoint.clone(), SessionConfig::default());

    let pending = session.request_increment();
    settle_until(&endpoint, 1).await;
    endpoint.drop_attempt(0);

    assert_eq!(pending.wait().await.unwrap(), ReconcileResult::RolledBack { value: 0 });
    assert_eq!(
        session.snapshot().error.as_deref(),
        Some("endpoint unavailable: response dropped")
    );
}
