// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON persistence for an Agent's state and settings documents (§3, §6).
//!
//! Path layout: `<state_dir>/<identifier>.json`, or — when the plugin
//! declares `needs_state_dir` — `<state_dir>/<identifier>/<identifier>.json`
//! inside a per-agent directory. Settings follow the same layout rooted at
//! `<manifest_dir>` and are read-only from the core's perspective: nothing
//! here ever writes a settings document, only loads one a human or
//! provisioning step already placed on disk.

use acme_core::Agent;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Fields every Agent persists after every execution regardless of what
/// its plugin declares (§3 invariant 4).
pub const ALWAYS_PERSISTED_FIELDS: &[&str] =
    &["identifier", "name", "random_skew", "last_execution", "last_execution_status"];

/// Builds the JSON state document for `agent`: the always-persisted
/// fields plus any extra fields the plugin declares via its
/// `state_document()` key list (§3 State/Settings documents).
pub fn state_document_for(agent: &Agent, declared_fields: &[&str]) -> Value {
    let full = serde_json::to_value(agent).unwrap_or(Value::Null);
    let Value::Object(full) = full else {
        return Value::Object(serde_json::Map::new());
    };

    let mut doc = serde_json::Map::new();
    for key in ALWAYS_PERSISTED_FIELDS.iter().chain(declared_fields.iter()) {
        if let Some(value) = full.get(*key) {
            doc.insert((*key).to_string(), value.clone());
        }
    }
    Value::Object(doc)
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, #[source] source: std::io::Error },
    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, #[source] source: std::io::Error },
    #[error("failed to create directory {path}: {source}")]
    CreateDir { path: PathBuf, #[source] source: std::io::Error },
    #[error("malformed document at {path}: {source}")]
    Malformed { path: PathBuf, #[source] source: serde_json::Error },
}

/// Resolves and persists the two documents (state, settings) every
/// plugin declares per §6.
pub struct AgentStateStore {
    state_dir: PathBuf,
    manifest_dir: PathBuf,
}

impl AgentStateStore {
    pub fn new(state_dir: impl Into<PathBuf>, manifest_dir: impl Into<PathBuf>) -> Self {
        Self { state_dir: state_dir.into(), manifest_dir: manifest_dir.into() }
    }

    /// Persists `doc` as the state document for `identifier`. Called by an
    /// Executor after every execution (§4.4 step 7) and by the Controller
    /// when merging persisted state forward on reload (§4.3 Loader).
    pub fn save_state(
        &self,
        identifier: &str,
        needs_state_dir: bool,
        doc: &Value,
    ) -> Result<(), StorageError> {
        let path = Self::document_path(&self.state_dir, identifier, needs_state_dir);
        write_json_atomic(&path, doc)
    }

    /// Loads a previously persisted state document, or `None` if the
    /// agent has never run (or this is its first registration).
    pub fn load_state(
        &self,
        identifier: &str,
        needs_state_dir: bool,
    ) -> Result<Option<Value>, StorageError> {
        read_json(&Self::document_path(&self.state_dir, identifier, needs_state_dir))
    }

    /// Loads the settings document for `identifier`, if one exists on
    /// disk under the manifest directory.
    pub fn load_settings(
        &self,
        identifier: &str,
        needs_state_dir: bool,
    ) -> Result<Option<Value>, StorageError> {
        read_json(&Self::document_path(&self.manifest_dir, identifier, needs_state_dir))
    }

    fn document_path(base: &Path, identifier: &str, needs_state_dir: bool) -> PathBuf {
        if needs_state_dir {
            base.join(identifier).join(format!("{identifier}.json"))
        } else {
            base.join(format!("{identifier}.json"))
        }
    }
}

fn read_json(path: &Path) -> Result<Option<Value>, StorageError> {
    match fs::read(path) {
        Ok(bytes) => {
            let value = serde_json::from_slice(&bytes)
                .map_err(|source| StorageError::Malformed { path: path.to_path_buf(), source })?;
            Ok(Some(value))
        }
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(StorageError::Read { path: path.to_path_buf(), source }),
    }
}

/// Writes `value` to `path` by writing a sibling temp file then renaming
/// it into place, so a crash mid-write never leaves a truncated document
/// behind for the next load to choke on.
fn write_json_atomic(path: &Path, value: &Value) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|source| StorageError::CreateDir { path: parent.to_path_buf(), source })?;
    }
    let tmp_path = path.with_extension("json.tmp");
    let bytes = serde_json::to_vec_pretty(value)
        .map_err(|source| StorageError::Malformed { path: path.to_path_buf(), source })?;
    fs::write(&tmp_path, bytes)
        .map_err(|source| StorageError::Write { path: tmp_path.clone(), source })?;
    fs::rename(&tmp_path, path)
        .map_err(|source| StorageError::Write { path: path.to_path_buf(), source })?;
    Ok(())
}

#[cfg(test)]
#[path = "agent_store_tests.rs"]
mod tests;
