// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! What actually rides the request queue. `acme_core::AgentExecutionRequest`
//! carries the deep-copied, inert `Agent` data record per `spec.md` §3;
//! the live plugin behind it — the thing whose `execute` an Executor must
//! call — is a separate handle so the Controller never needs the
//! Executor to reach back into the registry (§9 Design Notes: Executors
//! never hold a pointer back to the Controller).

use acme_core::{AgentExecutionRequest, AgentPlugin};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared ownership of a plugin instance. `Mutex` (not `RwLock`) because
/// `execute` requires `&mut self`; holding this lock across an `execute`
/// call is exactly the correctness floor `spec.md` §4.4 describes for
/// `use_lock` agents, and an unavoidable one for any agent in a
/// memory-safe Rust rendering — a plugin instance cannot be mutated from
/// two tasks at once regardless of the `use_lock` declaration.
pub type PluginHandle = Arc<Mutex<Box<dyn AgentPlugin>>>;

/// One item on the Executor Pool's request queue: the canonical request
/// plus a handle to the live plugin it names.
pub struct Dispatched {
    pub request: AgentExecutionRequest,
    pub plugin: PluginHandle,
}

impl Dispatched {
    pub fn new(request: AgentExecutionRequest, plugin: PluginHandle) -> Self {
        Self { request, plugin }
    }
}
