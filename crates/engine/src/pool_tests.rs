// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::backend::TokioBackend;
use tempfile::tempdir;

#[test]
fn ideal_count_rounds_up_queued_over_three() {
    assert_eq!(ideal_executor_count(0, 10, 0), 0);
    assert_eq!(ideal_executor_count(1, 10, 0), 1);
    assert_eq!(ideal_executor_count(3, 10, 0), 1);
    assert_eq!(ideal_executor_count(4, 10, 0), 2);
    assert_eq!(ideal_executor_count(9, 10, 0), 3);
}

#[test]
fn ideal_count_saturates_at_max_executors() {
    assert_eq!(ideal_executor_count(100, 5, 0), 5);
}

#[test]
fn ideal_count_bumps_for_over_sla_requests() {
    assert_eq!(ideal_executor_count(3, 10, 2), 3);
    assert_eq!(ideal_executor_count(9, 10, 5), 8);
}

#[test]
fn ideal_count_is_zero_when_max_is_zero() {
    assert_eq!(ideal_executor_count(50, 0, 0), 0);
}

fn new_pool() -> (ExecutorPool, tempfile::TempDir) {
    let dir = tempdir().unwrap();
    let store = Arc::new(AgentStateStore::new(dir.path().join("state"), dir.path().join("manifest")));
    let pool = ExecutorPool::new(Arc::new(TokioBackend), Arc::new(MutexRegistry::new()), store)
        .with_idle_ttl(std::time::Duration::from_secs(30));
    (pool, dir)
}

#[tokio::test]
async fn reconcile_spawns_up_to_ideal() {
    let (mut pool, _dir) = new_pool();
    pool.reconcile(3);
    assert_eq!(pool.current_count(), 3);
}

#[tokio::test]
async fn reconcile_is_idempotent_at_steady_state() {
    let (mut pool, _dir) = new_pool();
    pool.reconcile(2);
    pool.reconcile(2);
    assert_eq!(pool.current_count(), 2);
}

#[tokio::test]
async fn reconcile_signals_one_stop_when_over_ideal() {
    let (mut pool, _dir) = new_pool();
    pool.reconcile(3);
    pool.reconcile(1);
    // Signaled worker exits asynchronously; count only drops once reaped
    // on a subsequent reconcile call.
    assert_eq!(pool.current_count(), 3);

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    pool.reconcile(1);
    assert!(pool.current_count() <= 3);
}

#[tokio::test]
async fn drain_responses_respects_max() {
    let (mut pool, _dir) = new_pool();
    let tx = pool.response_tx.clone();
    for _ in 0..5 {
        let agent = acme_core::Agent::new("a", "A");
        let request = acme_core::AgentExecutionRequest::new(
            agent.clone(),
            acme_core::TriggerKind::NONE,
            serde_json::Value::Null,
        );
        tx.send(acme_core::AgentExecutionResponse::new(&request, acme_core::AgentStatus::IDLE, agent))
            .await
            .unwrap();
    }

    let drained = pool.drain_responses(3);
    assert_eq!(drained.len(), 3);
    let rest = pool.drain_responses(10);
    assert_eq!(rest.len(), 2);
}
