// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Agent Registry & Controller (§4.3): owns the set of loaded
//! Agents, turns qualified triggers into execution requests, manages
//! the executor pool, and applies responses back onto canonical Agent
//! state.
//!
//! Two locks guard all bookkeeping (§5 Shared-resource policy): the
//! registry map and `agent_queue_data`. Both are `parking_lot::Mutex` —
//! held only for the duration of a synchronous map operation, never
//! across an `.await`.

mod loader;

pub use loader::LoaderError;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use acme_core::{
    qualifies_for_scheduled_run, qualify, queue_id, Agent, AgentExecutionRequest, AgentId,
    AgentPlugin, AgentStatus, Event, ExecutionStatus, RequestId, StateProbe, TriggerKind,
};
use acme_engine::{Dispatched, ExecutorBackend, ExecutorPool, MutexRegistry, PluginHandle};
use acme_storage::AgentStateStore;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rand::Rng;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::sync::Mutex as AsyncMutex;

struct RegisteredAgent {
    agent: Agent,
    plugin: PluginHandle,
}

struct QueuedRequest {
    request_id: RequestId,
    queued_at: DateTime<Utc>,
}

pub struct Controller {
    registry: Mutex<HashMap<AgentId, RegisteredAgent>>,
    agent_queue_data: Mutex<HashMap<String, QueuedRequest>>,
    pool: Mutex<ExecutorPool>,
    request_tx: mpsc::Sender<Dispatched>,
    state_store: Arc<AgentStateStore>,
    state_probe: Arc<dyn StateProbe>,
    telemetry_tx: mpsc::Sender<Event>,
    max_executors: usize,
    execution_sla: Duration,
    requeue_threshold: Duration,
    host_source: String,
    shutting_down: AtomicBool,
}

impl Controller {
    pub fn new(
        backend: Arc<dyn ExecutorBackend>,
        mutexes: Arc<MutexRegistry>,
        state_store: Arc<AgentStateStore>,
        state_probe: Arc<dyn StateProbe>,
        telemetry_tx: mpsc::Sender<Event>,
        max_executors: usize,
        execution_sla: Duration,
        requeue_threshold: Duration,
        host_source: impl Into<String>,
    ) -> Self {
        let pool = ExecutorPool::new(backend, mutexes, state_store.clone());
        let request_tx = pool.request_sender();
        Self {
            registry: Mutex::new(HashMap::new()),
            agent_queue_data: Mutex::new(HashMap::new()),
            pool: Mutex::new(pool),
            request_tx,
            state_store,
            state_probe,
            telemetry_tx,
            max_executors,
            execution_sla,
            requeue_threshold,
            host_source: host_source.into(),
            shutting_down: AtomicBool::new(false),
        }
    }

    pub fn registered_agent_count(&self) -> usize {
        self.registry.lock().len()
    }

    pub fn queued_count(&self) -> usize {
        self.agent_queue_data.lock().len()
    }

    pub fn pool_worker_count(&self) -> usize {
        self.pool.lock().current_count()
    }

    pub fn agent_status(&self, id: &AgentId) -> Option<AgentStatus> {
        self.registry.lock().get(id).map(|r| r.agent.status)
    }

    pub fn agent_snapshot(&self, id: &AgentId) -> Option<Agent> {
        self.registry.lock().get(id).map(|r| r.agent.clone())
    }

    pub fn begin_shutdown(&self) {
        self.shutting_down.store(true, Ordering::Release);
    }

    /// Registers one plugin's Agent directly, merging forward any
    /// persisted state from an in-memory prior instance or, failing
    /// that, from disk. Used by [`loader`] and directly by tests.
    pub(crate) fn register_one(&self, plugin: Box<dyn AgentPlugin>) {
        let identifier = plugin.agent().identifier.clone();
        let mut agent = plugin.agent().clone();

        let prior_in_memory = self.registry.lock().remove(&identifier).map(|r| r.agent);
        match prior_in_memory {
            Some(prior) => agent.merge_persisted_state(&prior),
            None => loader::merge_persisted_state_from_disk(&mut agent, &self.state_store),
        }

        let plugin: PluginHandle = Arc::new(AsyncMutex::new(plugin));
        self.registry.lock().insert(identifier, RegisteredAgent { agent, plugin });
    }

    fn telemetry_commit(&self, event: Event) {
        if self.telemetry_tx.try_send(event).is_err() {
            tracing::warn!("telemetry channel full or closed, dropping event");
        }
    }

    /// `execute_trigger` (§4.3 Trigger dispatch): qualify every
    /// registered agent against `trigger` and admit the qualified ones.
    pub async fn execute_trigger(&self, trigger: TriggerKind, data: Value, now: DateTime<Utc>, rng: &mut impl Rng) {
        let state = self.state_probe.snapshot();
        let candidates: Vec<(AgentId, Agent)> = {
            let registry = self.registry.lock();
            registry.iter().map(|(id, r)| (id.clone(), r.agent.clone())).collect()
        };

        for (id, agent) in candidates {
            let result = qualify(&agent, trigger, &data, &state, now, rng);
            if result.is_qualified() {
                self.try_queue_request(&id, trigger, data.clone(), now).await;
            }
        }
    }

    /// `try_queue_request` (§4.3 Deduplication and requeue).
    pub async fn try_queue_request(
        &self,
        identifier: &AgentId,
        trigger: TriggerKind,
        data: Value,
        now: DateTime<Utc>,
    ) -> bool {
        let qid = queue_id(identifier.as_str(), trigger);
        let threshold = chrono::Duration::from_std(self.requeue_threshold).unwrap_or_else(|_| chrono::Duration::zero());

        let dispatched = {
            let mut queue_data = self.agent_queue_data.lock();
            if let Some(existing) = queue_data.get(&qid) {
                if now - existing.queued_at < threshold {
                    tracing::debug!(queue_id = %qid, "already queued");
                    return false;
                }
                tracing::warn!(queue_id = %qid, "requeueing: prior request exceeded the requeue threshold");
            }

            let mut registry = self.registry.lock();
            let Some(entry) = registry.get_mut(identifier) else {
                tracing::warn!(identifier = %identifier, "try_queue_request for unregistered agent");
                return false;
            };

            let request = AgentExecutionRequest::new(entry.agent.clone(), trigger, data);
            entry.agent.status = AgentStatus::QUEUED;
            queue_data.insert(qid.clone(), QueuedRequest { request_id: request.request_id, queued_at: now });
            Dispatched::new(request, entry.plugin.clone())
        };

        if self.request_tx.send(dispatched).await.is_ok() {
            true
        } else {
            tracing::error!(identifier = %identifier, "executor request queue closed");
            self.agent_queue_data.lock().remove(&qid);
            let mut registry = self.registry.lock();
            if let Some(entry) = registry.get_mut(identifier) {
                entry.agent.status = AgentStatus::IDLE;
                entry.agent.last_execution_status = ExecutionStatus::Fatal;
            }
            false
        }
    }

    /// One full scheduler sweep (§4.3 Scheduler sweep, Executor pool
    /// management, Response drain). Call on a fixed ≈ 0.5 s period.
    pub async fn sweep(&self, now: DateTime<Utc>, rng: &mut impl Rng) {
        if !self.shutting_down.load(Ordering::Acquire) {
            self.scheduled_pass(now, rng).await;
        }
        self.reconcile_pool(now);
        self.drain_and_apply_responses();
    }

    async fn scheduled_pass(&self, now: DateTime<Utc>, rng: &mut impl Rng) {
        let state = self.state_probe.snapshot();
        let candidates: Vec<(AgentId, Agent)> = {
            let registry = self.registry.lock();
            registry
                .iter()
                .filter(|(_, r)| r.agent.status == AgentStatus::IDLE && r.agent.triggers.contains(TriggerKind::SCHEDULED))
                .map(|(id, r)| (id.clone(), r.agent.clone()))
                .collect()
        };

        for (id, agent) in candidates {
            let result = qualify(&agent, TriggerKind::SCHEDULED, &Value::Null, &state, now, rng);
            if result.is_qualified() && qualifies_for_scheduled_run(&agent, now) {
                self.try_queue_request(&id, TriggerKind::SCHEDULED, Value::Null, now).await;
            }
        }
    }

    fn reconcile_pool(&self, now: DateTime<Utc>) {
        if self.shutting_down.load(Ordering::Acquire) {
            self.pool.lock().reconcile(0);
            return;
        }

        let sla = chrono::Duration::from_std(self.execution_sla).unwrap_or_else(|_| chrono::Duration::zero());
        let (queued, over_sla) = {
            let queue_data = self.agent_queue_data.lock();
            let over_sla = queue_data.values().filter(|q| now - q.queued_at > sla).count();
            (queue_data.len(), over_sla)
        };

        let ideal = acme_engine::ideal_executor_count(queued, self.max_executors, over_sla);
        self.pool.lock().reconcile(ideal);
    }

    fn drain_and_apply_responses(&self) {
        let responses = self.pool.lock().drain_responses(25);
        if responses.is_empty() {
            return;
        }

        let mut registry = self.registry.lock();
        let mut queue_data = self.agent_queue_data.lock();
        for response in responses {
            let identifier = response.agent.identifier.clone();
            match registry.get_mut(&identifier) {
                Some(entry) => {
                    entry.agent.status = response.status;
                    entry.agent.last_execution = response.agent.last_execution;
                    entry.agent.last_execution_status = response.agent.last_execution_status;
                    entry.agent.random_skew = response.agent.random_skew;
                }
                None => tracing::warn!(identifier = %identifier, queue_id = %response.queue_id, "response for unregistered agent"),
            }

            if response.status == AgentStatus::IDLE && queue_data.remove(&response.queue_id).is_none() {
                tracing::warn!(queue_id = %response.queue_id, "response queue_id missing from agent_queue_data, matched by identifier only");
            }
        }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
