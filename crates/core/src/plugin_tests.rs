// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::agent::Agent;
use std::sync::Arc;

struct NoopPlugin {
    agent: Agent,
}

#[async_trait]
impl AgentPlugin for NoopPlugin {
    fn agent(&self) -> &Agent {
        &self.agent
    }

    async fn load(&mut self) -> Result<(), PluginError> {
        Ok(())
    }

    async fn unload(&mut self) -> Result<(), PluginError> {
        Ok(())
    }

    async fn execute(&mut self, _trigger: crate::agent::TriggerKind, _data: Value) -> ExecuteOutcome {
        ExecuteOutcome::Success
    }

    fn state_document(&self) -> StateDocument {
        StateDocument { fields: vec!["last_execution"] }
    }

    fn settings_document(&self) -> SettingsDocument {
        SettingsDocument { fields: vec![] }
    }
}

fn construct_noop(entry: &PluginManifestEntry) -> Result<Box<dyn AgentPlugin>, PluginError> {
    Ok(Box::new(NoopPlugin { agent: Agent::new(entry.identifier.clone(), entry.identifier.clone()) }))
}

#[test]
fn registry_constructs_by_kind() {
    let mut registry = PluginRegistry::new();
    registry.register("noop", construct_noop);

    let entry = PluginManifestEntry {
        kind: "noop".into(),
        identifier: "a1".into(),
        version: "1.0.0".into(),
        config: Value::Null,
    };
    let plugin = registry.construct(&entry).unwrap();
    assert_eq!(plugin.agent().identifier.as_str(), "a1");
}

#[test]
fn registry_errors_on_unknown_kind() {
    let registry = PluginRegistry::new();
    let entry = PluginManifestEntry {
        kind: "missing".into(),
        identifier: "a1".into(),
        version: "1.0.0".into(),
        config: Value::Null,
    };
    assert!(matches!(registry.construct(&entry), Err(PluginError::UnknownKind(_))));
}

#[test]
fn manifest_source_skips_entries_that_fail_to_construct_but_keeps_the_rest() {
    let mut registry = PluginRegistry::new();
    registry.register("noop", construct_noop);
    let registry = Arc::new(registry);

    let manifest = r#"[
        {"kind": "noop", "identifier": "a1", "version": "1.0.0"},
        {"kind": "bogus", "identifier": "a2", "version": "1.0.0"}
    ]"#;
    let source = ManifestPluginSource::from_manifest_str(manifest, registry, "1.0.0").unwrap();
    let targets = source.get_targets().unwrap();
    assert_eq!(targets.len(), 1);
    assert_eq!(targets[0].agent().identifier.as_str(), "a1");
}
