// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! acme-engine: the Executor Pool (§4.4) — the worker loop that drains
//! the shared request queue, runs an Agent's plugin under its per-agent
//! mutex, and emits started/finished responses — plus the pool manager
//! the Controller drives with an ideal worker count computed each sweep.
//!
//! Per the REDESIGN FLAGS in `spec.md` §9, one worker model is chosen:
//! `tokio` tasks. [`ExecutorBackend`] exists as the seam a forked-process
//! backend could implement without the Controller changing, but no such
//! backend ships in this workspace.

pub mod backend;
pub mod dispatched;
pub mod executor;
pub mod mutex_registry;
pub mod pool;

pub use backend::ExecutorBackend;
pub use dispatched::{Dispatched, PluginHandle};
pub use executor::{Executor, ExecutorHandle, DEFAULT_IDLE_TTL};
pub use mutex_registry::MutexRegistry;
pub use pool::{ideal_executor_count, ExecutorPool};
