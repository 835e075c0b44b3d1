// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Executor pool sizing and lifecycle (§4.3, §4.4): how many workers
//! should exist given the current queue depth, and the spawn/stop/reap
//! mechanics the Controller drives once per sweep.

use crate::backend::ExecutorBackend;
use crate::dispatched::Dispatched;
use crate::executor::{ExecutorHandle, SharedRequestQueue, DEFAULT_IDLE_TTL};
use crate::mutex_registry::MutexRegistry;
use acme_core::{AgentExecutionResponse, ExecutorId};
use acme_storage::AgentStateStore;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::task::JoinHandle;

/// Worker count the pool manager should converge to this sweep, given
/// `queued` outstanding requests, the `max_executors` ceiling, and how
/// many of those requests have been waiting past the execution SLA
/// (§4.3 Executor pool management).
pub fn ideal_executor_count(queued: usize, max_executors: usize, over_sla: usize) -> usize {
    if max_executors == 0 {
        return 0;
    }

    let base = if queued >= max_executors {
        queued
    } else {
        queued.div_ceil(3)
    };

    let bumped = base.saturating_add(over_sla);
    bumped.clamp(0, queued.min(max_executors))
}

struct Worker {
    handle: ExecutorHandle,
    join: JoinHandle<()>,
}

/// Owns the live set of Executor workers sharing one request queue, and
/// the channel the Controller dispatches requests and drains responses
/// through. Never holds a pointer back to the Controller's registry
/// (§9 Design Notes).
pub struct ExecutorPool {
    backend: Arc<dyn ExecutorBackend>,
    mutexes: Arc<MutexRegistry>,
    state_store: Arc<AgentStateStore>,
    idle_ttl: std::time::Duration,
    request_tx: mpsc::Sender<Dispatched>,
    request_rx: SharedRequestQueue,
    response_tx: mpsc::Sender<AgentExecutionResponse>,
    response_rx: mpsc::Receiver<AgentExecutionResponse>,
    workers: Vec<Worker>,
    next_suffix: u64,
}

impl ExecutorPool {
    pub fn new(
        backend: Arc<dyn ExecutorBackend>,
        mutexes: Arc<MutexRegistry>,
        state_store: Arc<AgentStateStore>,
    ) -> Self {
        let (request_tx, request_rx) = mpsc::channel(1024);
        let (response_tx, response_rx) = mpsc::channel(1024);
        Self {
            backend,
            mutexes,
            state_store,
            idle_ttl: DEFAULT_IDLE_TTL,
            request_tx,
            request_rx: Arc::new(AsyncMutex::new(request_rx)),
            response_tx,
            response_rx,
            workers: Vec::new(),
            next_suffix: 0,
        }
    }

    pub fn with_idle_ttl(mut self, idle_ttl: std::time::Duration) -> Self {
        self.idle_ttl = idle_ttl;
        self
    }

    /// Handle for the Controller to push a dispatched request onto the
    /// shared queue.
    pub fn request_sender(&self) -> mpsc::Sender<Dispatched> {
        self.request_tx.clone()
    }

    /// Drains up to `max` responses without blocking (§4.3 response
    /// drain: "Every sweep, drain up to 25 responses").
    pub fn drain_responses(&mut self, max: usize) -> Vec<AgentExecutionResponse> {
        let mut out = Vec::with_capacity(max.min(16));
        while out.len() < max {
            match self.response_rx.try_recv() {
                Ok(response) => out.push(response),
                Err(_) => break,
            }
        }
        out
    }

    pub fn current_count(&self) -> usize {
        self.workers.len()
    }

    fn next_executor_id(&mut self) -> ExecutorId {
        self.next_suffix += 1;
        ExecutorId::new(format!("Executor_{}", self.next_suffix))
    }

    fn spawn_one(&mut self) {
        let id = self.next_executor_id();
        let (handle, join) = self.backend.spawn(
            id,
            self.idle_ttl,
            self.request_rx.clone(),
            self.response_tx.clone(),
            self.mutexes.clone(),
            self.state_store.clone(),
        );
        self.workers.push(Worker { handle, join });
    }

    /// Removes workers whose task has already exited, returning how many
    /// were reaped.
    fn reap_dead(&mut self) -> usize {
        let before = self.workers.len();
        self.workers.retain(|w| !w.join.is_finished());
        before - self.workers.len()
    }

    /// Picks the most-idle, not-currently-executing worker to signal for
    /// shutdown; falls back to any non-busy worker, then any worker at
    /// all, matching §4.3's "if none idle, pick any non-stopping worker".
    fn pick_victim_index(&self) -> Option<usize> {
        self.workers
            .iter()
            .enumerate()
            .filter(|(_, w)| !w.handle.is_busy())
            .max_by_key(|(_, w)| w.handle.idle_for())
            .map(|(i, _)| i)
            .or_else(|| if self.workers.is_empty() { None } else { Some(0) })
    }

    /// Reconciles the live worker count with `ideal`, spawning or
    /// signaling stops as needed. Call once per sweep after computing
    /// `ideal` from [`ideal_executor_count`].
    pub fn reconcile(&mut self, ideal: usize) {
        let reaped = self.reap_dead();
        if reaped > 0 {
            tracing::debug!(count = reaped, "reaped exited executors");
        }

        while self.workers.len() < ideal {
            self.spawn_one();
        }

        // One stop signal per sweep (§4.3): the signaled worker exits
        // asynchronously and is reaped on a later sweep once its task
        // actually completes, at which point this loop fires again if
        // still over `ideal`.
        if self.workers.len() > ideal {
            if let Some(victim) = self.pick_victim_index() {
                self.workers[victim].handle.signal_stop();
            }
        }
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
