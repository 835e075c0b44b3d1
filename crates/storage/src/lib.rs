// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! acme-storage: on-disk persistence for Agent state/settings documents
//! (§3, §6) and the Telemetry Engine's durable event queue (§4.5, §8
//! "Engine.save() ∘ Engine.load() preserves queued events in order").

pub mod agent_store;
pub mod queue_store;

pub use agent_store::{state_document_for, AgentStateStore, StorageError, ALWAYS_PERSISTED_FIELDS};
pub use queue_store::{QueueLoadError, QueueStore};
