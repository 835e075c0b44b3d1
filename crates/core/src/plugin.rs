// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Agent contract a plugin must provide, and the discovery interfaces
//! the Loader uses to turn a plugin directory into live Agent instances.
//!
//! Plugins are trusted, signed-out-of-band code, not sandboxed at
//! runtime. This workspace forbids `unsafe_code`, so discovery here never
//! does dynamic library loading: a `PluginSource` resolves declared
//! plugin identifiers against a statically-linked registry of
//! constructors, which is how ACME ships compliance and browser-extension
//! plugins compiled directly into the daemon binary.

use crate::agent::Agent;
use crate::document::{SettingsDocument, StateDocument};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("plugin {identifier} failed to load: {reason}")]
    LoadFailed { identifier: String, reason: String },
    #[error("plugin {identifier} failed to unload: {reason}")]
    UnloadFailed { identifier: String, reason: String },
    #[error("plugin directory unavailable: {0}")]
    DirectoryUnavailable(String),
    #[error("plugin manifest malformed: {0}")]
    MalformedManifest(String),
    #[error("no constructor registered for plugin kind {0}")]
    UnknownKind(String),
}

/// Outcome of an Agent's `execute` call, reported back to the Executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecuteOutcome {
    Success,
    Error,
    Fatal,
}

/// What a plugin must provide for each Agent it yields. Implementations
/// run inside an Executor's per-agent mutex; `execute` must not panic —
/// a plugin that does should be treated by the Executor as `Fatal`, not
/// propagated as a process-ending unwind.
#[async_trait]
pub trait AgentPlugin: Send + Sync {
    fn agent(&self) -> &Agent;

    /// Subscribe to external triggers, open file handles, or perform
    /// other one-time setup. Called once after registration.
    async fn load(&mut self) -> Result<(), PluginError>;

    /// Mirror of `load`: release subscriptions and file handles. Called
    /// once before the Agent is dropped from the registry.
    async fn unload(&mut self) -> Result<(), PluginError>;

    /// Perform the Agent's actual work for the given trigger and opaque
    /// trigger data.
    async fn execute(&mut self, trigger: crate::agent::TriggerKind, data: Value) -> ExecuteOutcome;

    /// Declares which fields the core should persist to the state store.
    fn state_document(&self) -> StateDocument;

    /// Declares which fields the core should persist to the settings
    /// store (plugin-declared configuration, distinct from runtime
    /// state).
    fn settings_document(&self) -> SettingsDocument;
}

/// Emitted by the Loader once per plugin directory entry.
#[derive(Debug, Clone)]
pub struct PluginLoadEvent {
    pub identifiers: Vec<String>,
    pub version: String,
    pub load_duration: std::time::Duration,
    pub succeeded: usize,
    pub failed: usize,
}

/// A source of plugin instances, resolved from a directory entry. Kept
/// as a trait so discovery can be swapped for a test double without a
/// real filesystem.
pub trait PluginSource: Send + Sync {
    /// Returns the Agent plugins this source yields. Called once per
    /// scan; failures for individual entries are reported inline rather
    /// than aborting the whole scan.
    fn get_targets(&self) -> Result<Vec<Box<dyn AgentPlugin>>, PluginError>;

    fn version(&self) -> &str;
}

/// A constructor registered under a manifest's declared `kind`. Plugins
/// are compiled into the daemon binary; the manifest only selects among
/// constructors already linked in, it never loads code at runtime.
pub type PluginConstructor = fn(&PluginManifestEntry) -> Result<Box<dyn AgentPlugin>, PluginError>;

/// One entry from a plugin directory's manifest file.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct PluginManifestEntry {
    pub kind: String,
    pub identifier: String,
    pub version: String,
    #[serde(default)]
    pub config: Value,
}

/// Maps manifest `kind` strings to statically-linked constructors.
#[derive(Default)]
pub struct PluginRegistry {
    constructors: HashMap<String, PluginConstructor>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: impl Into<String>, ctor: PluginConstructor) {
        self.constructors.insert(kind.into(), ctor);
    }

    pub fn construct(&self, entry: &PluginManifestEntry) -> Result<Box<dyn AgentPlugin>, PluginError> {
        let ctor = self
            .constructors
            .get(&entry.kind)
            .ok_or_else(|| PluginError::UnknownKind(entry.kind.clone()))?;
        ctor(entry)
    }
}

/// A `PluginSource` backed by a JSON manifest file listing entries,
/// resolved against a `PluginRegistry`.
pub struct ManifestPluginSource {
    entries: Vec<PluginManifestEntry>,
    registry: std::sync::Arc<PluginRegistry>,
    version: String,
}

impl ManifestPluginSource {
    pub fn new(
        entries: Vec<PluginManifestEntry>,
        registry: std::sync::Arc<PluginRegistry>,
        version: impl Into<String>,
    ) -> Self {
        Self { entries, registry, version: version.into() }
    }

    pub fn from_manifest_str(
        raw: &str,
        registry: std::sync::Arc<PluginRegistry>,
        version: impl Into<String>,
    ) -> Result<Self, PluginError> {
        let entries: Vec<PluginManifestEntry> =
            serde_json::from_str(raw).map_err(|e| PluginError::MalformedManifest(e.to_string()))?;
        Ok(Self::new(entries, registry, version))
    }
}

impl PluginSource for ManifestPluginSource {
    fn get_targets(&self) -> Result<Vec<Box<dyn AgentPlugin>>, PluginError> {
        let mut out = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            match self.registry.construct(entry) {
                Ok(plugin) => out.push(plugin),
                Err(err) => {
                    tracing::warn!(identifier = %entry.identifier, error = %err, "plugin entry failed to construct");
                }
            }
        }
        Ok(out)
    }

    fn version(&self) -> &str {
        &self.version
    }
}

#[cfg(test)]
#[path = "plugin_tests.rs"]
mod tests;
