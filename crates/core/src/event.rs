// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The core telemetry record and its paging logic. `Event` is the
//! in-process representation; wire serialization (the exact JSON keys
//! shipped to the remote sink) lives in `acme-wire`, which turns a page of
//! an `Event` into a `WireEventRecord`.

use crate::ids::EventId;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default per-record byte budget before an Event must be split into
/// pages (§6 External Interfaces: telemetry sink).
pub const DEFAULT_RECORD_SIZE_LIMIT: usize = 51_000;

/// Core telemetry record, produced anywhere in the system (plugin-load
/// metrics, heartbeats, ownership changes, password rotations) and handed
/// to the Telemetry Engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub event_type: String,
    pub subject_area: String,
    /// Host identifier that produced this event.
    pub source: String,
    pub payload: Value,
    pub produced_date: DateTime<Utc>,
    pub submit_date: Option<DateTime<Utc>>,
    pub template: Option<String>,
}

impl Event {
    pub fn new(event_type: impl Into<String>, subject_area: impl Into<String>, source: impl Into<String>, payload: Value) -> Self {
        Self {
            id: EventId::new(),
            event_type: event_type.into(),
            subject_area: subject_area.into(),
            source: source.into(),
            payload,
            produced_date: Utc::now(),
            submit_date: None,
            template: None,
        }
    }

    /// Split this event's JSON payload into ordered pages, each of which
    /// (once wire-encoded) is expected to stay under `limit` bytes.
    ///
    /// The payload is JSON-encoded and base64-encoded exactly once, up
    /// front; the resulting ASCII string is what gets sliced into pages,
    /// never the raw JSON bytes. Base64's alphabet is safe to cut at any
    /// byte offset, so concatenating pages' payloads in order always
    /// reconstructs the original base64 string byte-for-byte — slicing
    /// raw UTF-8 JSON instead risks cutting a multi-byte character in
    /// half and corrupting it. A single-page event still goes through
    /// this path so callers always deal with `EventPage`s uniformly.
    pub fn into_pages(self, limit: usize) -> Vec<EventPage> {
        let json_bytes = serde_json::to_vec(&self.payload).unwrap_or_default();
        let encoded = BASE64.encode(json_bytes);

        if encoded.len() <= limit || limit == 0 {
            return vec![EventPage {
                event_id: self.id,
                event_type: self.event_type,
                subject_area: self.subject_area,
                source: self.source,
                payload: encoded,
                produced_date: self.produced_date,
                submit_date: self.submit_date,
                template: self.template,
                current_page: 1,
                total_pages: 1,
            }];
        }

        let chunks: Vec<&[u8]> = encoded.as_bytes().chunks(limit).collect();
        let total_pages = chunks.len() as u32;
        chunks
            .into_iter()
            .enumerate()
            .map(|(idx, chunk)| EventPage {
                event_id: self.id,
                event_type: self.event_type.clone(),
                subject_area: self.subject_area.clone(),
                source: self.source.clone(),
                // `chunk` is a byte slice of a pure-ASCII base64 string,
                // so this never hits a multi-byte boundary.
                payload: String::from_utf8_lossy(chunk).into_owned(),
                produced_date: self.produced_date,
                submit_date: self.submit_date,
                template: self.template.clone(),
                current_page: idx as u32 + 1,
                total_pages,
            })
            .collect()
    }
}

/// One page of a (possibly split) Event. Every page inherits the parent
/// event's id so the remote sink can reassemble or dedupe pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventPage {
    pub event_id: EventId,
    pub event_type: String,
    pub subject_area: String,
    pub source: String,
    /// A base64-encoded chunk of the parent event's JSON payload (the
    /// whole thing when `total_pages == 1`). Concatenating every page's
    /// `payload` in `current_page` order and base64-decoding the result
    /// reconstructs the original JSON payload.
    pub payload: String,
    pub produced_date: DateTime<Utc>,
    pub submit_date: Option<DateTime<Utc>>,
    pub template: Option<String>,
    pub current_page: u32,
    pub total_pages: u32,
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
