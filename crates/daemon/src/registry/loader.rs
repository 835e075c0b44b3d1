// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Turns a `PluginSource` scan into registered Agents (§4.3 Loader).

use std::time::Instant;

use acme_core::{Agent, Event, PluginLoadEvent, PluginSource};
use acme_storage::AgentStateStore;
use thiserror::Error;

use super::Controller;

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error(transparent)]
    Plugin(#[from] acme_core::PluginError),
}

/// Pulls any persisted state for `agent.identifier` off disk and merges
/// the carry-forward fields onto it. Used the first time a plugin is
/// registered in a process, when there is no in-memory prior Agent to
/// merge from. A persisted state document always round-trips through
/// `Agent`'s own `Deserialize` impl: every field it omits carries
/// `#[serde(default)]`.
pub(crate) fn merge_persisted_state_from_disk(agent: &mut Agent, store: &AgentStateStore) {
    let loaded = match store.load_state(agent.identifier.as_str(), agent.needs_state_dir) {
        Ok(doc) => doc,
        Err(err) => {
            tracing::warn!(identifier = %agent.identifier, error = %err, "failed to read persisted agent state");
            return;
        }
    };

    let Some(doc) = loaded else { return };
    match serde_json::from_value::<Agent>(doc) {
        Ok(prior) => agent.merge_persisted_state(&prior),
        Err(err) => tracing::warn!(identifier = %agent.identifier, error = %err, "persisted agent state malformed, ignoring"),
    }
}

impl Controller {
    /// Runs one plugin directory scan, loads each plugin, and registers
    /// the ones that load successfully. Entries that fail to construct
    /// never reach here (`PluginSource::get_targets` already reports
    /// those inline); entries that fail `load` are counted as failed and
    /// left unregistered.
    pub async fn load_plugins(&self, source: &dyn PluginSource) -> Result<PluginLoadEvent, LoaderError> {
        let started = Instant::now();
        let plugins = source.get_targets()?;

        let mut identifiers = Vec::with_capacity(plugins.len());
        let mut succeeded = 0;
        let mut failed = 0;

        for mut plugin in plugins {
            let identifier = plugin.agent().identifier.as_str().to_string();
            identifiers.push(identifier.clone());
            match plugin.load().await {
                Ok(()) => {
                    succeeded += 1;
                    self.register_one(plugin);
                }
                Err(err) => {
                    failed += 1;
                    tracing::warn!(identifier = %identifier, error = %err, "plugin failed to load");
                }
            }
        }

        let event = PluginLoadEvent {
            identifiers,
            version: source.version().to_string(),
            load_duration: started.elapsed(),
            succeeded,
            failed,
        };

        self.telemetry_commit(Event::new(
            "plugin_load",
            "scheduler",
            self.host_source.clone(),
            serde_json::json!({
                "identifiers": event.identifiers,
                "version": event.version,
                "load_duration_ms": event.load_duration.as_millis(),
                "succeeded": event.succeeded,
                "failed": event.failed,
            }),
        ));

        Ok(event)
    }
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;
