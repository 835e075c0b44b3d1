// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The exact JSON record shipped to the remote telemetry sink over
//! authenticated HTTPS PUT.

use acme_core::{EventId, EventPage};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("failed to base64/json encode event payload: {0}")]
    PayloadEncoding(#[from] serde_json::Error),
    #[error("payload is not valid base64: {0}")]
    PayloadDecoding(#[from] base64::DecodeError),
}

/// The wire-format record sent to the remote streaming sink. Field names
/// match the external contract exactly: `uuid, src, type, subject,
/// template, date, submit_date, data, sig, current_page, ttl_pages`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WireEventRecord {
    pub uuid: EventId,
    pub src: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub subject: String,
    pub template: Option<String>,
    /// Epoch milliseconds.
    pub date: i64,
    /// Epoch milliseconds.
    pub submit_date: i64,
    /// Base64-encoded JSON payload, or a page-sized slice of it when the
    /// parent event was split across multiple records.
    pub data: String,
    /// Optional MD5 signature of `src|type|date|data`, present only when
    /// signing is configured.
    pub sig: Option<String>,
    pub current_page: u32,
    pub ttl_pages: u32,
}

impl WireEventRecord {
    /// `page.payload` is already base64-encoded by `Event::into_pages` —
    /// re-encoding it here would both double-encode it and, for a
    /// multi-page event, re-serialize an arbitrary byte slice as a new
    /// JSON string, which does not concatenate back into the original
    /// payload the way a plain base64 substring does.
    pub fn from_page(page: &EventPage, submit_date: DateTime<Utc>) -> Result<Self, WireError> {
        Ok(Self {
            uuid: page.event_id,
            src: page.source.clone(),
            event_type: page.event_type.clone(),
            subject: page.subject_area.clone(),
            template: page.template.clone(),
            date: page.produced_date.timestamp_millis(),
            submit_date: submit_date.timestamp_millis(),
            data: page.payload.clone(),
            sig: None,
            current_page: page.current_page,
            ttl_pages: page.total_pages,
        })
    }

    /// The material an MD5 signature is computed over: `src|type|date|data`.
    pub fn signing_material(&self) -> String {
        format!("{}|{}|{}|{}", self.src, self.event_type, self.date, self.data)
    }

    pub fn decode_payload(&self) -> Result<serde_json::Value, WireError> {
        let raw = BASE64.decode(&self.data)?;
        Ok(serde_json::from_slice(&raw)?)
    }

    pub fn approximate_size(&self) -> usize {
        serde_json::to_string(self).map(|s| s.len()).unwrap_or(0)
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
