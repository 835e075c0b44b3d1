// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn daemon_status_display_text() {
    assert_eq!(DaemonStatus::Idle.to_string(), "idle");
    assert_eq!(DaemonStatus::AgentExecuting.to_string(), "agent executing");
    assert_eq!(DaemonStatus::FatalError.to_string(), "fatal error");
}

#[test]
fn daemon_status_serde_roundtrip() {
    let json = serde_json::to_string(&DaemonStatus::Remediating).unwrap();
    assert_eq!(json, "\"remediating\"");
    let parsed: DaemonStatus = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, DaemonStatus::Remediating);
}

#[test]
fn default_status_is_unknown() {
    assert_eq!(DaemonStatus::default(), DaemonStatus::Unknown);
}
