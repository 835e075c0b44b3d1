// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The read-only state probe: a snapshot of current host conditions
//! consumed by the Qualifier and the Controller's scheduling passes.

use crate::agent::StateFlags;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// A point-in-time snapshot of host conditions. The Controller computes
/// one of these per scheduling pass and passes it to every qualification
/// check in that pass, rather than letting each check hit the underlying
/// probe itself — probes may be expensive or flaky, and the Qualifier
/// must never block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateSnapshot {
    pub flags: StateFlags,
    pub site: Option<String>,
    pub console_user: Option<String>,
    pub hardware_id: Option<String>,
    pub uptime: Option<Duration>,
    pub last_login: Option<DateTime<Utc>>,
}

/// A source of host state. Implementations must tolerate failure: an
/// unreadable condition is omitted from the returned flags rather than
/// guessed, and `snapshot` must return quickly (sub-millisecond budget)
/// since the Controller calls it once per sweep on the scheduling path.
pub trait StateProbe: Send + Sync {
    fn snapshot(&self) -> StateSnapshot;
}

/// Decorates a [`StateProbe`] with a time-to-live cache, so an expensive
/// underlying probe (a syscall, a plist read, a DNS lookup) is only
/// actually invoked once per `ttl` regardless of call volume.
pub struct CachedStateProbe<P> {
    inner: P,
    ttl: Duration,
    cached: parking_lot::Mutex<Option<(std::time::Instant, StateSnapshot)>>,
}

impl<P: StateProbe> CachedStateProbe<P> {
    pub fn new(inner: P, ttl: Duration) -> Self {
        Self { inner, ttl, cached: parking_lot::Mutex::new(None) }
    }
}

impl<P: StateProbe> StateProbe for CachedStateProbe<P> {
    fn snapshot(&self) -> StateSnapshot {
        let mut guard = self.cached.lock();
        if let Some((taken_at, snapshot)) = guard.as_ref() {
            if taken_at.elapsed() < self.ttl {
                return snapshot.clone();
            }
        }
        let fresh = self.inner.snapshot();
        *guard = Some((std::time::Instant::now(), fresh.clone()));
        fresh
    }
}

/// A fixed, caller-configured snapshot. Used by tests and by the
/// scheduler's dry-run tooling in place of a live probe.
#[derive(Debug, Clone, Default)]
pub struct StaticStateProbe(pub StateSnapshot);

impl StateProbe for StaticStateProbe {
    fn snapshot(&self) -> StateSnapshot {
        self.0.clone()
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
