// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use tempfile::tempdir;

#[test]
fn round_trips_flat_state_document() {
    let dir = tempdir().unwrap();
    let store = AgentStateStore::new(dir.path().join("state"), dir.path().join("manifest"));
    let doc = json!({"last_execution": 1000, "random_skew": 42});

    store.save_state("agent.one", false, &doc).unwrap();
    let loaded = store.load_state("agent.one", false).unwrap();

    assert_eq!(loaded, Some(doc));
    assert!(dir.path().join("state/agent.one.json").is_file());
}

#[test]
fn needs_state_dir_nests_under_identifier_directory() {
    let dir = tempdir().unwrap();
    let store = AgentStateStore::new(dir.path().join("state"), dir.path().join("manifest"));
    let doc = json!({"last_execution": 5});

    store.save_state("agent.two", true, &doc).unwrap();

    assert!(dir.path().join("state/agent.two/agent.two.json").is_file());
    assert!(!dir.path().join("state/agent.two.json").exists());
    assert_eq!(store.load_state("agent.two", true).unwrap(), Some(doc));
}

#[test]
fn missing_state_document_loads_as_none() {
    let dir = tempdir().unwrap();
    let store = AgentStateStore::new(dir.path().join("state"), dir.path().join("manifest"));

    assert_eq!(store.load_state("never.ran", false).unwrap(), None);
}

#[test]
fn settings_document_is_rooted_at_manifest_dir() {
    let dir = tempdir().unwrap();
    let manifest_dir = dir.path().join("manifest");
    fs::create_dir_all(&manifest_dir).unwrap();
    fs::write(manifest_dir.join("agent.three.json"), r#"{"threshold": 10}"#).unwrap();
    let store = AgentStateStore::new(dir.path().join("state"), manifest_dir);

    let loaded = store.load_settings("agent.three", false).unwrap();

    assert_eq!(loaded, Some(json!({"threshold": 10})));
}

#[test]
fn malformed_document_is_reported_not_panicked() {
    let dir = tempdir().unwrap();
    let state_dir = dir.path().join("state");
    fs::create_dir_all(&state_dir).unwrap();
    fs::write(state_dir.join("bad.json"), "{not json").unwrap();
    let store = AgentStateStore::new(state_dir, dir.path().join("manifest"));

    let err = store.load_state("bad", false).unwrap_err();

    assert!(matches!(err, StorageError::Malformed { .. }));
}

#[test]
fn state_document_includes_always_persisted_and_declared_fields() {
    let mut agent = Agent::new("a1", "A1");
    agent.priority = acme_core::Priority::High;
    agent.last_execution_status = acme_core::ExecutionStatus::Success;

    let doc = state_document_for(&agent, &["priority"]);

    let obj = doc.as_object().unwrap();
    assert!(obj.contains_key("identifier"));
    assert!(obj.contains_key("name"));
    assert!(obj.contains_key("last_execution_status"));
    assert!(obj.contains_key("priority"));
    assert!(!obj.contains_key("triggers"));
}

#[test]
fn save_overwrites_prior_document() {
    let dir = tempdir().unwrap();
    let store = AgentStateStore::new(dir.path().join("state"), dir.path().join("manifest"));

    store.save_state("agent.four", false, &json!({"v": 1})).unwrap();
    store.save_state("agent.four", false, &json!({"v": 2})).unwrap();

    assert_eq!(store.load_state("agent.four", false).unwrap(), Some(json!({"v": 2})));
}
