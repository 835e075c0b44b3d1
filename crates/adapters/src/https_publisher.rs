// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The shipped `Publisher`: signs (MD5, when a PEM signing key is
//! configured) and PUTs the wire-format JSON record (§6) to the remote
//! streaming sink over authenticated HTTPS, using `reqwest` — the
//! standard ecosystem HTTP client. No crate in this lineage previously
//! needed an outbound HTTPS client for a record-streaming protocol; see
//! `DESIGN.md` for the dependency note.

use crate::credential::{CredentialSource, Credentials};
use acme_wire::{PublishError, Publisher, WireEventRecord};
use async_trait::async_trait;
use md5::{Digest, Md5};
use std::sync::Arc;

/// PUTs a [`WireEventRecord`] to a fixed endpoint, signing it first when
/// the current credentials carry a PEM signing key.
pub struct HttpsPublisher {
    client: reqwest::Client,
    endpoint: String,
    credentials: Arc<dyn CredentialSource>,
}

impl HttpsPublisher {
    pub fn new(endpoint: impl Into<String>, credentials: Arc<dyn CredentialSource>) -> Self {
        Self { client: reqwest::Client::new(), endpoint: endpoint.into(), credentials }
    }

    fn sign(record: &mut WireEventRecord, creds: &Credentials) {
        if creds.signing_key_pem.is_none() {
            return;
        }
        let mut hasher = Md5::new();
        hasher.update(record.signing_material().as_bytes());
        record.sig = Some(format!("{:x}", hasher.finalize()));
    }
}

#[async_trait]
impl Publisher for HttpsPublisher {
    async fn publish(&self, record: &WireEventRecord) -> Result<(), PublishError> {
        let creds = self
            .credentials
            .load()
            .await
            .map_err(|e| PublishError::Transport(e.to_string()))?;

        let mut record = record.clone();
        Self::sign(&mut record, &creds);

        let response = self
            .client
            .put(&self.endpoint)
            .header("x-acme-access-key", &creds.access_key)
            .header("x-acme-session-token", &creds.session_token)
            .json(&record)
            .send()
            .await
            .map_err(|e| PublishError::Transport(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(PublishError::Rejected(response.status().to_string()))
        }
    }
}

#[cfg(test)]
#[path = "https_publisher_tests.rs"]
mod tests;
