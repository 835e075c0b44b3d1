// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The two messages that pass between the Controller and the Executor
//! Pool for a single Agent run.

use crate::agent::{Agent, AgentStatus, TriggerKind};
use crate::ids::RequestId;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Created by the Controller when a qualified Agent is to be executed.
/// Carries a deep copy of the Agent so downstream mutation by the
/// Executor never touches the canonical registry entry.
#[derive(Debug, Clone)]
pub struct AgentExecutionRequest {
    pub request_id: RequestId,
    pub agent: Agent,
    pub trigger: TriggerKind,
    pub data: Value,
    pub created_at: DateTime<Utc>,
}

impl AgentExecutionRequest {
    pub fn new(agent: Agent, trigger: TriggerKind, data: Value) -> Self {
        Self { request_id: RequestId::new(), agent, trigger, data, created_at: Utc::now() }
    }

    /// Deduplication key: `"{agent_identifier}.{trigger_kind(s)}"`.
    pub fn queue_id(&self) -> String {
        queue_id(self.agent.identifier.as_str(), self.trigger)
    }
}

/// Builds the deduplication key shared by a request and its eventual
/// responses, without requiring a full `AgentExecutionRequest` in hand.
pub fn queue_id(agent_identifier: &str, trigger: TriggerKind) -> String {
    format!("{agent_identifier}.{}", trigger.bits())
}

/// Emitted by an Executor before and after invoking the Agent: once on
/// transition to EXECUTING, once with the final status.
#[derive(Debug, Clone)]
pub struct AgentExecutionResponse {
    pub request_id: RequestId,
    pub queue_id: String,
    pub status: AgentStatus,
    pub agent: Agent,
    pub responded_at: DateTime<Utc>,
}

impl AgentExecutionResponse {
    pub fn new(request: &AgentExecutionRequest, status: AgentStatus, agent: Agent) -> Self {
        Self {
            request_id: request.request_id,
            queue_id: request.queue_id(),
            status,
            agent,
            responded_at: Utc::now(),
        }
    }
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
