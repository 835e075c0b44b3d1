// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use acme_core::{ExecutionStatus, PluginError, SettingsDocument, StateDocument, StaticStateProbe};
use acme_engine::TokioBackend;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use tempfile::tempdir;

struct StubPlugin {
    agent: Agent,
    calls: Arc<AtomicUsize>,
    outcome: acme_core::ExecuteOutcome,
}

#[async_trait]
impl AgentPlugin for StubPlugin {
    fn agent(&self) -> &Agent {
        &self.agent
    }

    async fn load(&mut self) -> Result<(), PluginError> {
        Ok(())
    }

    async fn unload(&mut self) -> Result<(), PluginError> {
        Ok(())
    }

    async fn execute(&mut self, _trigger: TriggerKind, _data: Value) -> acme_core::ExecuteOutcome {
        self.calls.fetch_add(1, AtomicOrdering::SeqCst);
        self.outcome
    }

    fn state_document(&self) -> StateDocument {
        StateDocument { fields: vec![] }
    }

    fn settings_document(&self) -> SettingsDocument {
        SettingsDocument { fields: vec![] }
    }
}

fn make_controller(dir: &std::path::Path) -> Controller {
    let backend = Arc::new(TokioBackend);
    let mutexes = Arc::new(MutexRegistry::new());
    let state_store = Arc::new(AgentStateStore::new(dir.join("state"), dir.join("manifest")));
    let state_probe: Arc<dyn StateProbe> = Arc::new(StaticStateProbe::default());
    let (telemetry_tx, _telemetry_rx) = mpsc::channel(64);

    Controller::new(
        backend,
        mutexes,
        state_store,
        state_probe,
        telemetry_tx,
        5,
        Duration::from_secs(15),
        Duration::from_secs(600),
        "test-host",
    )
}

fn register_agent(controller: &Controller, agent: Agent, outcome: acme_core::ExecuteOutcome) -> Arc<AtomicUsize> {
    let calls = Arc::new(AtomicUsize::new(0));
    let plugin = Box::new(StubPlugin { agent, calls: calls.clone(), outcome });
    controller.register_one(plugin);
    calls
}

#[tokio::test]
async fn try_queue_request_admits_a_registered_agent_and_deduplicates() {
    let dir = tempdir().unwrap();
    let controller = make_controller(dir.path());
    let mut agent = Agent::new("a1", "Agent One");
    agent.triggers = TriggerKind::STARTUP;
    register_agent(&controller, agent, acme_core::ExecuteOutcome::Success);

    let id = AgentId::new("a1");
    let now = Utc::now();
    assert!(controller.try_queue_request(&id, TriggerKind::STARTUP, Value::Null, now).await);
    assert_eq!(controller.queued_count(), 1);
    assert_eq!(controller.agent_status(&id), Some(AgentStatus::QUEUED));

    // A second request for the same queue_id within the requeue threshold
    // is rejected as a duplicate.
    assert!(!controller.try_queue_request(&id, TriggerKind::STARTUP, Value::Null, now).await);
    assert_eq!(controller.queued_count(), 1);
}

#[tokio::test]
async fn try_queue_request_rejects_an_unregistered_agent() {
    let dir = tempdir().unwrap();
    let controller = make_controller(dir.path());
    let id = AgentId::new("missing");
    let admitted = controller.try_queue_request(&id, TriggerKind::STARTUP, Value::Null, Utc::now()).await;
    assert!(!admitted);
    assert_eq!(controller.queued_count(), 0);
}

#[tokio::test]
async fn sweep_admits_and_then_drains_a_completed_scheduled_agent() {
    let dir = tempdir().unwrap();
    let controller = make_controller(dir.path());
    let mut agent = Agent::new("sched", "Scheduled Agent");
    agent.triggers = TriggerKind::SCHEDULED;
    register_agent(&controller, agent, acme_core::ExecuteOutcome::Success);

    let mut rng = rand::thread_rng();
    let now = Utc::now();

    // First sweep: spawns a worker and admits the agent.
    controller.sweep(now, &mut rng).await;
    assert_eq!(controller.queued_count(), 1);
    assert!(controller.pool_worker_count() >= 1);

    // Give the tokio-task worker a turn to run and respond.
    for _ in 0..20 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        controller.sweep(Utc::now(), &mut rng).await;
        if controller.queued_count() == 0 {
            break;
        }
    }

    assert_eq!(controller.queued_count(), 0);
    let id = AgentId::new("sched");
    assert_eq!(controller.agent_status(&id), Some(AgentStatus::IDLE));
    let agent = controller.agent_snapshot(&id).unwrap();
    assert_eq!(agent.last_execution_status, ExecutionStatus::Success);
    assert!(agent.last_execution.is_some());
}

#[tokio::test]
async fn begin_shutdown_reconciles_the_pool_down_to_zero() {
    let dir = tempdir().unwrap();
    let controller = make_controller(dir.path());
    let mut agent = Agent::new("a1", "Agent One");
    agent.triggers = TriggerKind::STARTUP;
    register_agent(&controller, agent, acme_core::ExecuteOutcome::Success);

    let id = AgentId::new("a1");
    controller.try_queue_request(&id, TriggerKind::STARTUP, Value::Null, Utc::now()).await;

    let mut rng = rand::thread_rng();
    controller.sweep(Utc::now(), &mut rng).await;
    assert!(controller.pool_worker_count() >= 1);

    controller.begin_shutdown();
    for _ in 0..20 {
        controller.sweep(Utc::now(), &mut rng).await;
        if controller.pool_worker_count() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(controller.pool_worker_count(), 0);
}
