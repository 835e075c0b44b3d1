// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The coarse daemon status surfaced by the IPC status endpoint.

use serde::{Deserialize, Serialize};

/// Coarse daemon status, as returned by the status endpoint. The CLI
/// formats this; detailed per-agent / per-telemetry status rides
/// alongside it as a free-form payload, not modeled here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DaemonStatus {
    Idle,
    Evaluating,
    Remediating,
    AgentExecuting,
    FatalError,
    Unknown,
}

acme_core::simple_display! {
    DaemonStatus {
        Idle => "idle",
        Evaluating => "evaluating",
        Remediating => "remediating",
        AgentExecuting => "agent executing",
        FatalError => "fatal error",
        Unknown => "unknown",
    }
}

impl Default for DaemonStatus {
    fn default() -> Self {
        DaemonStatus::Unknown
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
