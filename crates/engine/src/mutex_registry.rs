// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The per-agent execution mutex keyed by identifier (§4.4, §5). Kept
//! separate from the plugin handle itself per `spec.md` §9 Design Notes'
//! literal rendering: a `Mutex<HashMap<AgentId, Arc<Mutex<()>>>>` guarded
//! for insertion, `tokio::sync::Mutex` for anything an agent's `execute`
//! may hold across an await point.

use acme_core::AgentId;
use parking_lot::Mutex as SyncMutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;

#[derive(Default)]
pub struct MutexRegistry {
    inner: SyncMutex<HashMap<AgentId, Arc<AsyncMutex<()>>>>,
}

impl MutexRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the mutex for `id`, creating one on first use. Every
    /// caller that later acquires this mutex observes the same instance
    /// for a given identifier, which is what makes it a correctness
    /// floor rather than a per-call no-op.
    pub fn get_or_create(&self, id: &AgentId) -> Arc<AsyncMutex<()>> {
        let mut guard = self.inner.lock();
        guard.entry(id.clone()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
    }

    /// Number of distinct agents with a mutex allocated so far. Exposed
    /// for tests; the registry never shrinks since identifiers are
    /// process-lifetime stable (§3 invariant 1).
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[path = "mutex_registry_tests.rs"]
mod tests;
