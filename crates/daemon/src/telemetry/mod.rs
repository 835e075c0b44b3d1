// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Telemetry Engine (§4.5): a durable, credential-gated, at-least-
//! once event pipeline. Producers call [`TelemetryEngine::commit_event`];
//! a background dispatch loop drains the in-memory queue through a
//! lazily-built [`Router`], backing off exponentially on failure and
//! surviving restarts by serializing the queue to disk on [`TelemetryEngine::stop`]
//! and reloading it on [`TelemetryEngine::load`].

mod dispatcher;
mod router;

pub use dispatcher::{ChannelEventSink, DispatchError, EventSink, TelemetryDispatcher};
pub use router::{HttpsRouterBuilder, RouteError, Router, RouterBuildError, RouterBuilder};

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use acme_core::{Event, TimerOutcome};
use acme_storage::{QueueLoadError, QueueStore};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::task::JoinHandle;

/// `UNCONFIGURED -> STOPPED -> RUNNING -> STOPPING` (§4.5). Transitions
/// happen only via explicit [`TelemetryEngine::start`]/[`TelemetryEngine::stop`]
/// or a successful router (credential/route) build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryState {
    Unconfigured,
    Stopped,
    Running,
    Stopping,
}

const RETRY_FREQUENCY: Duration = Duration::from_secs(60);
const MAX_RETRY_FREQUENCY: Duration = Duration::from_secs(3600);
const BACKOFF_BASE_EXPONENT_CAP: u32 = 20;
const FAILURES_BEFORE_CREDENTIAL_RELOAD: u32 = 10;
const BEAT_QUEUE_NONEMPTY: Duration = Duration::from_millis(200);
const BEAT_QUEUE_EMPTY: Duration = Duration::from_secs(1);

/// `retry_frequency x base^(failures-1)`, capped at `max_retry_frequency`
/// (§4.5 Backoff). `failures == 0` has no backoff.
fn backoff_delay(failures: u32) -> Duration {
    if failures == 0 {
        return Duration::ZERO;
    }
    let mut delay = RETRY_FREQUENCY;
    for _ in 0..(failures - 1).min(BACKOFF_BASE_EXPONENT_CAP) {
        delay = delay.saturating_mul(2);
        if delay >= MAX_RETRY_FREQUENCY {
            return MAX_RETRY_FREQUENCY;
        }
    }
    delay.min(MAX_RETRY_FREQUENCY)
}

struct FailureState {
    count: AtomicU32,
    last_failure: Mutex<Option<DateTime<Utc>>>,
}

impl Default for FailureState {
    fn default() -> Self {
        Self { count: AtomicU32::new(0), last_failure: Mutex::new(None) }
    }
}

impl FailureState {
    fn record(&self, now: DateTime<Utc>) {
        self.count.fetch_add(1, Ordering::AcqRel);
        *self.last_failure.lock() = Some(now);
    }

    fn reset(&self) {
        self.count.store(0, Ordering::Release);
        *self.last_failure.lock() = None;
    }

    fn count(&self) -> u32 {
        self.count.load(Ordering::Acquire)
    }

    /// `Completed` once any backoff window has elapsed; `Deferred` with
    /// the remaining wait otherwise.
    fn outcome(&self, now: DateTime<Utc>) -> TimerOutcome {
        let failures = self.count();
        if failures == 0 {
            return TimerOutcome::Completed;
        }
        let Some(last_failure) = *self.last_failure.lock() else {
            return TimerOutcome::Completed;
        };
        let delay = backoff_delay(failures);
        let next_allowed = last_failure + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::zero());
        if now >= next_allowed {
            TimerOutcome::Completed
        } else {
            // `spec.md` §9 Open Questions: clamp a negative computed
            // delay (clock moved backwards since the failure) to zero.
            TimerOutcome::Deferred((next_allowed - now).to_std().unwrap_or(Duration::ZERO))
        }
    }
}

/// The durable, credential-gated outbound event pipeline.
pub struct TelemetryEngine {
    state: Mutex<TelemetryState>,
    queue: Mutex<VecDeque<Event>>,
    router: Mutex<Option<Router>>,
    router_builder: Arc<dyn RouterBuilder>,
    has_network_access: AtomicBool,
    kicked: AtomicBool,
    failures: FailureState,
    record_size_limit: usize,
    queue_path: PathBuf,
    queue_store: QueueStore,
    shutting_down: AtomicBool,
    loop_handle: Mutex<Option<JoinHandle<()>>>,
}

impl TelemetryEngine {
    pub fn new(router_builder: Arc<dyn RouterBuilder>, queue_path: PathBuf, record_size_limit: usize) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(TelemetryState::Unconfigured),
            queue: Mutex::new(VecDeque::new()),
            router: Mutex::new(None),
            router_builder,
            has_network_access: AtomicBool::new(true),
            kicked: AtomicBool::new(false),
            failures: FailureState::default(),
            record_size_limit,
            queue_path,
            queue_store: QueueStore::new(),
            shutting_down: AtomicBool::new(false),
            loop_handle: Mutex::new(None),
        })
    }

    pub fn state(&self) -> TelemetryState {
        *self.state.lock()
    }

    pub fn queue_depth(&self) -> usize {
        self.queue.lock().len()
    }

    /// Accepts an Event for eventual delivery (§8: "for all Events E
    /// accepted by `commit_event`: eventually E is delivered to the
    /// router OR it remains in the persistent queue across restarts").
    /// Always succeeds regardless of engine state — durability does not
    /// depend on the dispatch loop being started.
    pub fn commit_event(&self, event: Event) {
        self.queue.lock().push_back(event);
    }

    /// `online()` (§4.5): network access, a built router, and that
    /// router having a default route all hold. Credential validity is
    /// folded into "router built" because this workspace's
    /// [`RouterBuilder`] loads credentials as part of building.
    pub fn online(&self) -> bool {
        self.has_network_access.load(Ordering::Acquire)
            && self.router.lock().as_ref().is_some_and(Router::has_default)
    }

    /// Re-evaluates network reachability; if the engine was offline and
    /// is now online with queued work, bypasses backoff once so delivery
    /// resumes immediately rather than waiting out the current window
    /// (§4.5 Network-change hook).
    pub fn network_changed(&self, now_online: bool) {
        let was_online = self.has_network_access.swap(now_online, Ordering::AcqRel);
        if now_online && !was_online && !self.queue.lock().is_empty() {
            self.kick();
        }
    }

    /// Bypasses backoff once (§4.5: "An explicit `kick()` bypasses
    /// backoff once").
    pub fn kick(&self) {
        self.kicked.store(true, Ordering::Release);
    }

    /// `is_queue_process_time()` (§4.5 step 2): `Completed` clears the
    /// gate for this tick; `Deferred` reports shutdown, offline, or an
    /// unexpired backoff window, in that priority order.
    fn gate(&self, now: DateTime<Utc>) -> TimerOutcome {
        if self.shutting_down.load(Ordering::Acquire) {
            return TimerOutcome::Deferred(Duration::ZERO);
        }
        if !self.has_network_access.load(Ordering::Acquire) {
            return TimerOutcome::Deferred(BEAT_QUEUE_EMPTY);
        }
        if self.kicked.swap(false, Ordering::AcqRel) {
            return TimerOutcome::Completed;
        }
        self.failures.outcome(now)
    }

    /// One dispatch-loop iteration (§4.5 Dispatch loop, steps 2-5),
    /// exposed directly so tests can drive it deterministically without
    /// a real background task.
    pub async fn tick(&self, now: DateTime<Utc>) -> TimerOutcome {
        let gate = self.gate(now);
        if !gate.is_completed() {
            return gate;
        }

        if self.router.lock().is_none() {
            if let Err(err) = self.ensure_router_built().await {
                tracing::warn!(error = %err, "telemetry router build failed");
                self.failures.record(now);
                return TimerOutcome::Deferred(RETRY_FREQUENCY);
            }
        } else if self.failures.count() >= FAILURES_BEFORE_CREDENTIAL_RELOAD {
            if let Err(err) = self.ensure_router_built().await {
                tracing::warn!(error = %err, "telemetry credential/router reload failed");
                return TimerOutcome::Deferred(RETRY_FREQUENCY);
            }
        }

        let Some(event) = self.queue.lock().pop_front() else {
            return TimerOutcome::Completed;
        };

        let router = self.router.lock().clone();
        let Some(router) = router else {
            self.queue.lock().push_front(event);
            return TimerOutcome::Deferred(RETRY_FREQUENCY);
        };

        match router.route_event(&event, self.record_size_limit, now).await {
            Ok(()) => {
                self.failures.reset();
                TimerOutcome::Completed
            }
            Err(err) => {
                tracing::warn!(error = %err, event_id = %event.id, "telemetry publish failed, requeueing");
                self.failures.record(now);
                self.queue.lock().push_front(event);
                TimerOutcome::Deferred(self.failures.outcome(now).deferred_for().unwrap_or(RETRY_FREQUENCY))
            }
        }
    }

    async fn ensure_router_built(&self) -> Result<(), RouterBuildError> {
        let router = self.router_builder.build().await?;
        *self.router.lock() = Some(router);
        if *self.state.lock() == TelemetryState::Unconfigured {
            *self.state.lock() = TelemetryState::Stopped;
        }
        Ok(())
    }

    /// Starts the background dispatch loop if it is not already running.
    /// Idempotent.
    pub fn start(self: &Arc<Self>) {
        self.shutting_down.store(false, Ordering::Release);
        let mut guard = self.loop_handle.lock();
        if guard.is_some() {
            return;
        }
        *self.state.lock() = TelemetryState::Running;
        let engine = self.clone();
        *guard = Some(tokio::spawn(async move { engine.run_loop().await }));
    }

    /// Signals the dispatch loop to stop and returns once it has exited
    /// or ~1s has elapsed, whichever comes first — the worker "completes
    /// its current post and exits on the next beat" (§5), it is not
    /// interrupted mid-publish.
    pub async fn stop(&self) {
        *self.state.lock() = TelemetryState::Stopping;
        self.shutting_down.store(true, Ordering::Release);
        let handle = self.loop_handle.lock().take();
        if let Some(handle) = handle {
            let _ = tokio::time::timeout(Duration::from_secs(1), handle).await;
        }
        *self.state.lock() = TelemetryState::Stopped;
    }

    async fn run_loop(self: Arc<Self>) {
        loop {
            if self.shutting_down.load(Ordering::Acquire) {
                return;
            }
            let beat = if self.queue.lock().is_empty() { BEAT_QUEUE_EMPTY } else { BEAT_QUEUE_NONEMPTY };
            tokio::time::sleep(beat).await;
            if self.shutting_down.load(Ordering::Acquire) {
                return;
            }
            self.tick(Utc::now()).await;
        }
    }

    /// Serializes the queue to disk in order (§4.5 Queue, §8
    /// "`Engine.save() . Engine.load()` preserves queued events in
    /// order"). Called at shutdown.
    pub fn save(&self) -> Result<(), QueueLoadError> {
        let events: Vec<Event> = self.queue.lock().iter().cloned().collect();
        self.queue_store.save(&self.queue_path, &events)
    }

    /// Reloads a previously saved queue. Missing file means first run,
    /// not an error; individual malformed records are skipped by
    /// `QueueStore` rather than failing the whole load.
    pub fn load(&self) -> Result<(), QueueLoadError> {
        let events = self.queue_store.load(&self.queue_path)?;
        let mut queue = self.queue.lock();
        queue.clear();
        queue.extend(events);
        Ok(())
    }
}

#[cfg(test)]
#[path = "telemetry_tests.rs"]
mod tests;
