use super::*;
use acme_wire::{PublishError, Publisher};
use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::AtomicUsize;
use tempfile::tempdir;

#[derive(Default)]
struct FlakyPublisher {
    attempts: AtomicUsize,
    fail_until: usize,
}

#[async_trait]
impl Publisher for FlakyPublisher {
    async fn publish(&self, _record: &acme_wire::WireEventRecord) -> Result<(), PublishError> {
        let n = self.attempts.fetch_add(1, Ordering::SeqCst);
        if n < self.fail_until {
            Err(PublishError::Transport("unreachable".into()))
        } else {
            Ok(())
        }
    }
}

struct StubRouterBuilder {
    publisher: Arc<FlakyPublisher>,
    fail_builds: AtomicBool,
}

#[async_trait]
impl RouterBuilder for StubRouterBuilder {
    async fn build(&self) -> Result<Router, RouterBuildError> {
        if self.fail_builds.load(Ordering::SeqCst) {
            return Err(RouterBuildError::Credentials(acme_adapters::CredentialError::Unavailable("down".into())));
        }
        Ok(Router::new().with_default(self.publisher.clone()))
    }
}

fn engine_with(publisher: Arc<FlakyPublisher>, dir: &std::path::Path) -> Arc<TelemetryEngine> {
    let builder = Arc::new(StubRouterBuilder { publisher, fail_builds: AtomicBool::new(false) });
    TelemetryEngine::new(builder, dir.join("queue.log"), 51_000)
}

fn sample_event() -> Event {
    Event::new("heartbeat", "scheduler", "host-1", json!({"n": 1}))
}

#[tokio::test]
async fn commit_is_durable_even_before_the_router_is_built() {
    let dir = tempdir().unwrap();
    let engine = engine_with(Arc::new(FlakyPublisher::default()), dir.path());
    assert_eq!(engine.state(), TelemetryState::Unconfigured);
    engine.commit_event(sample_event());
    assert_eq!(engine.queue_depth(), 1);
}

#[tokio::test]
async fn successful_tick_delivers_and_drains_the_queue() {
    let dir = tempdir().unwrap();
    let engine = engine_with(Arc::new(FlakyPublisher::default()), dir.path());
    engine.commit_event(sample_event());

    let outcome = engine.tick(Utc::now()).await;

    assert!(outcome.is_completed());
    assert_eq!(engine.queue_depth(), 0);
    assert!(engine.online());
}

#[tokio::test]
async fn failed_publish_requeues_the_event_and_backs_off() {
    let dir = tempdir().unwrap();
    let publisher = Arc::new(FlakyPublisher { attempts: AtomicUsize::new(0), fail_until: 100 });
    let engine = engine_with(publisher, dir.path());
    engine.commit_event(sample_event());

    let now = Utc::now();
    let outcome = engine.tick(now).await;

    assert_eq!(engine.queue_depth(), 1, "the event must remain queued, not dropped");
    match outcome {
        TimerOutcome::Deferred(d) => assert!(d > Duration::ZERO && d <= RETRY_FREQUENCY),
        TimerOutcome::Completed => panic!("a failed publish must defer"),
    }

    // Immediately retrying within the backoff window is a no-op.
    let still_backing_off = engine.tick(now).await;
    assert!(!still_backing_off.is_completed());
    assert_eq!(engine.queue_depth(), 1);
}

#[tokio::test]
async fn backoff_escalates_across_consecutive_failures() {
    assert_eq!(backoff_delay(0), Duration::ZERO);
    assert_eq!(backoff_delay(1), Duration::from_secs(60));
    assert_eq!(backoff_delay(2), Duration::from_secs(120));
    assert_eq!(backoff_delay(3), Duration::from_secs(240));
    assert_eq!(backoff_delay(7), Duration::from_secs(3600));
    assert_eq!(backoff_delay(30), Duration::from_secs(3600), "must cap at max_retry_frequency");
}

#[tokio::test]
async fn kick_bypasses_backoff_once() {
    let dir = tempdir().unwrap();
    let publisher = Arc::new(FlakyPublisher { attempts: AtomicUsize::new(0), fail_until: 1 });
    let engine = engine_with(publisher, dir.path());
    engine.commit_event(sample_event());

    let now = Utc::now();
    let first = engine.tick(now).await;
    assert!(!first.is_completed(), "first publish attempt is made to fail");

    engine.kick();
    let after_kick = engine.tick(now).await;
    assert!(after_kick.is_completed(), "kick should bypass backoff and let the retry succeed");
    assert_eq!(engine.queue_depth(), 0);
}

#[tokio::test]
async fn network_changed_kicks_when_coming_back_online_with_queued_work() {
    let dir = tempdir().unwrap();
    let engine = engine_with(Arc::new(FlakyPublisher::default()), dir.path());
    engine.commit_event(sample_event());

    engine.network_changed(false);
    assert!(!engine.online());
    assert!(!engine.tick(Utc::now()).await.is_completed(), "offline must defer, not error");

    engine.network_changed(true);
    let outcome = engine.tick(Utc::now()).await;
    assert!(outcome.is_completed());
    assert_eq!(engine.queue_depth(), 0);
}

#[tokio::test]
async fn router_build_failure_defers_without_losing_the_event() {
    let dir = tempdir().unwrap();
    let builder = Arc::new(StubRouterBuilder {
        publisher: Arc::new(FlakyPublisher::default()),
        fail_builds: AtomicBool::new(true),
    });
    let engine = TelemetryEngine::new(builder, dir.path().join("queue.log"), 51_000);
    engine.commit_event(sample_event());

    let outcome = engine.tick(Utc::now()).await;

    assert!(!outcome.is_completed());
    assert_eq!(engine.queue_depth(), 1);
    assert_eq!(engine.state(), TelemetryState::Unconfigured);
}

#[tokio::test]
async fn save_then_load_preserves_queue_order() {
    let dir = tempdir().unwrap();
    let engine = engine_with(Arc::new(FlakyPublisher { attempts: AtomicUsize::new(0), fail_until: 100 }), dir.path());

    let e1 = sample_event();
    let e2 = Event::new("password_rotation", "ownership", "host-1", json!({"n": 2}));
    let e3 = Event::new("ownership_change", "ownership", "host-1", json!({"n": 3}));
    let ids = [e1.id, e2.id, e3.id];
    engine.commit_event(e1);
    engine.commit_event(e2);
    engine.commit_event(e3);

    engine.save().unwrap();

    let reloaded = engine_with(Arc::new(FlakyPublisher { attempts: AtomicUsize::new(0), fail_until: 100 }), dir.path());
    reloaded.load().unwrap();

    assert_eq!(reloaded.queue_depth(), 3);
    let loaded_ids: Vec<_> = reloaded.queue.lock().iter().map(|e| e.id).collect();
    assert_eq!(loaded_ids, ids);
}

#[tokio::test]
async fn start_and_stop_drive_the_state_machine() {
    let dir = tempdir().unwrap();
    let engine = engine_with(Arc::new(FlakyPublisher::default()), dir.path());

    engine.start();
    assert_eq!(engine.state(), TelemetryState::Running);

    engine.stop().await;
    assert_eq!(engine.state(), TelemetryState::Stopped);
}
