// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Executor worker loop (§4.4): block on the request queue, run the
//! Agent's plugin under its mutex, emit started/finished responses,
//! persist state, and self-terminate on an idle TTL.

use crate::dispatched::Dispatched;
use crate::mutex_registry::MutexRegistry;
use acme_core::{AgentExecutionResponse, AgentStatus, ExecuteOutcome, ExecutionStatus, ExecutorId};
use acme_storage::{state_document_for, AgentStateStore};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::task::JoinHandle;

/// The shared request queue every worker in a pool pulls from. `tokio`'s
/// `mpsc::Receiver` has exactly one consumer, so fan-out across several
/// workers needs the receiver wrapped for shared, serialized access —
/// the same "block on the shared queue" shape `spec.md` §4.4 describes,
/// just expressed with the channel primitive this lineage already uses.
pub type SharedRequestQueue = Arc<AsyncMutex<mpsc::Receiver<Dispatched>>>;

/// How long an idle worker (no request for this long) keeps polling
/// before exiting so the pool manager can reap it (§4.4).
pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(60);

/// How long a single `recv` blocks before the worker re-checks
/// `should_run`/idle TTL (§4.4 step 3: "block ... for up to ≈ 0.5 s").
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// The pool manager's view of one running worker: enough to decide
/// whether to signal it to stop and whether it is the most-idle
/// candidate to pick for that signal (§4.3 Executor pool management).
#[derive(Clone)]
pub struct ExecutorHandle {
    pub id: ExecutorId,
    should_run: Arc<AtomicBool>,
    busy: Arc<AtomicBool>,
    last_activity: Arc<Mutex<Instant>>,
}

impl ExecutorHandle {
    pub fn signal_stop(&self) {
        self.should_run.store(false, Ordering::Release);
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn idle_for(&self) -> Duration {
        self.last_activity.lock().elapsed()
    }
}

/// One pool worker. Owns exactly the request/response channel ends and a
/// shared mutex registry and state store — never a pointer back to the
/// Controller (§9 Design Notes).
pub struct Executor {
    id: ExecutorId,
    should_run: Arc<AtomicBool>,
    busy: Arc<AtomicBool>,
    last_activity: Arc<Mutex<Instant>>,
    idle_ttl: Duration,
}

impl Executor {
    /// Spawns the worker as a `tokio` task and returns a handle the pool
    /// manager can inspect/signal, plus the task's `JoinHandle` for
    /// reaping once it exits.
    pub fn spawn(
        id: ExecutorId,
        idle_ttl: Duration,
        request_rx: SharedRequestQueue,
        response_tx: mpsc::Sender<AgentExecutionResponse>,
        mutexes: Arc<MutexRegistry>,
        state_store: Arc<AgentStateStore>,
    ) -> (ExecutorHandle, JoinHandle<()>) {
        let should_run = Arc::new(AtomicBool::new(true));
        let busy = Arc::new(AtomicBool::new(false));
        let last_activity = Arc::new(Mutex::new(Instant::now()));

        let handle = ExecutorHandle {
            id: id.clone(),
            should_run: should_run.clone(),
            busy: busy.clone(),
            last_activity: last_activity.clone(),
        };

        let worker = Executor { id, should_run, busy, last_activity, idle_ttl };
        let join = tokio::spawn(async move {
            worker.run(request_rx, response_tx, mutexes, state_store).await;
        });

        (handle, join)
    }

    async fn run(
        self,
        request_rx: SharedRequestQueue,
        response_tx: mpsc::Sender<AgentExecutionResponse>,
        mutexes: Arc<MutexRegistry>,
        state_store: Arc<AgentStateStore>,
    ) {
        loop {
            if !self.should_run.load(Ordering::Acquire) {
                tracing::debug!(executor = %self.id, "exiting: signaled to stop");
                return;
            }
            if self.last_activity.lock().elapsed() > self.idle_ttl {
                tracing::info!(executor = %self.id, "exiting: idle ttl exceeded");
                return;
            }

            let dispatched = tokio::select! {
                biased;
                item = async { request_rx.lock().await.recv().await } => item,
                _ = tokio::time::sleep(POLL_INTERVAL) => continue,
            };

            let Some(dispatched) = dispatched else {
                tracing::debug!(executor = %self.id, "exiting: request channel closed");
                return;
            };

            self.busy.store(true, Ordering::Release);
            *self.last_activity.lock() = Instant::now();

            self.run_one(dispatched, &response_tx, &mutexes, &state_store).await;

            *self.last_activity.lock() = Instant::now();
            self.busy.store(false, Ordering::Release);
        }
    }

    /// Steps 4–9 of §4.4 for a single dispatched request.
    async fn run_one(
        &self,
        dispatched: Dispatched,
        response_tx: &mpsc::Sender<AgentExecutionResponse>,
        mutexes: &MutexRegistry,
        state_store: &AgentStateStore,
    ) {
        let Dispatched { request, plugin } = dispatched;

        let mut agent = request.agent.clone();
        agent.status = AgentStatus::EXECUTING;
        let _ = response_tx
            .send(AgentExecutionResponse::new(&request, AgentStatus::EXECUTING, agent.clone()))
            .await;

        // Correctness floor: held for the whole call when declared.
        let _lock_guard = if agent.use_lock {
            Some(mutexes.get_or_create(&agent.identifier).lock_owned().await)
        } else {
            None
        };

        let (outcome, declared_state_fields) = {
            let mut guard = plugin.lock().await;
            let fields = guard.state_document().fields;
            let outcome = guard.execute(request.trigger, request.data.clone()).await;
            (outcome, fields)
        };

        agent.last_execution = Some(chrono::Utc::now());
        agent.last_execution_status = match outcome {
            ExecuteOutcome::Success => ExecutionStatus::Success,
            ExecuteOutcome::Error => ExecutionStatus::Error,
            ExecuteOutcome::Fatal => ExecutionStatus::Fatal,
        };
        agent.reset_skew(&mut rand::thread_rng());

        let doc = state_document_for(&agent, &declared_state_fields);
        if let Err(err) = state_store.save_state(agent.identifier.as_str(), agent.needs_state_dir, &doc) {
            tracing::warn!(agent = %agent.identifier, error = %err, "failed to persist agent state");
        }

        agent.status = AgentStatus::IDLE;
        let _ = response_tx
            .send(AgentExecutionResponse::new(&request, AgentStatus::IDLE, agent))
            .await;
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
