// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable persistence for the Telemetry Engine's outbound event queue
//! (§4.5 Queue, §8 "Engine.save() ∘ Engine.load() preserves queued events
//! in order"). One line per event: base64(json(Event)). Load errors on
//! individual records are logged and skipped, never fatal — a single
//! corrupt line must not lose the rest of the queue.

use acme_core::Event;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueLoadError {
    #[error("failed to read queue file {path}: {source}")]
    Read { path: PathBuf, #[source] source: std::io::Error },
    #[error("failed to write queue file {path}: {source}")]
    Write { path: PathBuf, #[source] source: std::io::Error },
}

#[derive(Default)]
pub struct QueueStore;

impl QueueStore {
    pub fn new() -> Self {
        Self
    }

    /// Writes `events` to `path` in order, one base64-encoded JSON record
    /// per line. Overwrites any prior file.
    pub fn save(&self, path: &Path, events: &[Event]) -> Result<(), QueueLoadError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|source| QueueLoadError::Write { path: parent.to_path_buf(), source })?;
        }
        let tmp_path = path.with_extension("tmp");
        {
            let mut file = fs::File::create(&tmp_path)
                .map_err(|source| QueueLoadError::Write { path: tmp_path.clone(), source })?;
            for event in events {
                let Ok(json) = serde_json::to_vec(event) else {
                    tracing::warn!(event_id = %event.id, "dropping unserializable event on save");
                    continue;
                };
                let line = BASE64.encode(json);
                writeln!(file, "{line}")
                    .map_err(|source| QueueLoadError::Write { path: tmp_path.clone(), source })?;
            }
        }
        fs::rename(&tmp_path, path)
            .map_err(|source| QueueLoadError::Write { path: path.to_path_buf(), source })?;
        Ok(())
    }

    /// Loads a previously saved queue, preserving order. Missing file is
    /// an empty queue, not an error (first run). Individual malformed
    /// lines are logged and skipped.
    pub fn load(&self, path: &Path) -> Result<Vec<Event>, QueueLoadError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(QueueLoadError::Read { path: path.to_path_buf(), source }),
        };

        let mut events = Vec::new();
        for (line_no, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match BASE64.decode(line).ok().and_then(|bytes| serde_json::from_slice::<Event>(&bytes).ok()) {
                Some(event) => events.push(event),
                None => {
                    tracing::warn!(path = %path.display(), line = line_no, "skipping unreadable queued event");
                }
            }
        }
        Ok(events)
    }
}

#[cfg(test)]
#[path = "queue_store_tests.rs"]
mod tests;
