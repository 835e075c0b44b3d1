// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The seam between the pool manager and however a worker actually runs
//! (§9 Design Notes, REDESIGN FLAGS). Only [`TokioBackend`] ships: it
//! spawns an [`Executor`] as a `tokio` task. A forked-process backend
//! could implement this trait without the pool manager changing, but no
//! such backend exists in this workspace.

use crate::executor::{Executor, ExecutorHandle, SharedRequestQueue};
use crate::mutex_registry::MutexRegistry;
use acme_core::{AgentExecutionResponse, ExecutorId};
use acme_storage::AgentStateStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub trait ExecutorBackend: Send + Sync {
    /// Spawns one worker, returning a handle the pool manager uses to
    /// monitor/stop it and the underlying task handle to reap once it
    /// exits.
    fn spawn(
        &self,
        id: ExecutorId,
        idle_ttl: Duration,
        request_rx: SharedRequestQueue,
        response_tx: mpsc::Sender<AgentExecutionResponse>,
        mutexes: Arc<MutexRegistry>,
        state_store: Arc<AgentStateStore>,
    ) -> (ExecutorHandle, JoinHandle<()>);
}

#[derive(Debug, Default)]
pub struct TokioBackend;

impl ExecutorBackend for TokioBackend {
    fn spawn(
        &self,
        id: ExecutorId,
        idle_ttl: Duration,
        request_rx: SharedRequestQueue,
        response_tx: mpsc::Sender<AgentExecutionResponse>,
        mutexes: Arc<MutexRegistry>,
        state_store: Arc<AgentStateStore>,
    ) -> (ExecutorHandle, JoinHandle<()>) {
        Executor::spawn(id, idle_ttl, request_rx, response_tx, mutexes, state_store)
    }
}
