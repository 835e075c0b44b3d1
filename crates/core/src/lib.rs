// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! acme-core: the Agent data model, the qualifier, the state probe
//! interface, and the telemetry event/document primitives shared by
//! every other ACME crate.

pub mod macros;

pub mod agent;
pub mod clock;
pub mod document;
pub mod event;
pub mod ids;
pub mod plugin;
pub mod qualifier;
pub mod request;
pub mod state;
pub mod timer;

pub use agent::{
    Agent, AgentStatus, ExecutionLimits, ExecutionStatus, Priority, SiteFilter, StateFlags,
    TriggerKind,
};
pub use clock::{Clock, FakeClock, SystemClock};
pub use document::{from_document, to_document, FieldDescriptor, FieldKind, SettingsDocument, StateDocument};
pub use event::{Event, EventPage, DEFAULT_RECORD_SIZE_LIMIT};
pub use ids::{AgentId, EventId, ExecutorId, RequestId};
pub use plugin::{
    AgentPlugin, ExecuteOutcome, ManifestPluginSource, PluginConstructor, PluginError,
    PluginLoadEvent, PluginManifestEntry, PluginRegistry, PluginSource,
};
pub use qualifier::{qualifies_for_scheduled_run, qualify, QualResult};
pub use request::{queue_id, AgentExecutionRequest, AgentExecutionResponse};
pub use state::{CachedStateProbe, StateProbe, StateSnapshot, StaticStateProbe};
pub use timer::TimerOutcome;
