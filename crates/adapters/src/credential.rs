// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential/route material for the Telemetry Engine's outbound HTTPS
//! client. Cryptographic identity fetch is an external collaborator per
//! `spec.md` §1; this crate only declares the narrow interface the
//! Telemetry Engine consumes it through, plus a static test double.
//!
//! Per `spec.md` §9 Open Questions, a signing key is accepted only as a
//! PEM-encoded string in v1 — binary key material is rejected rather than
//! guessed at.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("credential source unavailable: {0}")]
    Unavailable(String),
    #[error("signing key is not PEM-encoded")]
    NotPem,
}

/// Short-lived credentials for the outbound streaming sink: access key,
/// secret, and session token (§6), plus an optional PEM-encoded signing
/// key that gates per-record MD5 signing (§4.5 Size handling).
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub access_key: String,
    pub secret: String,
    pub session_token: String,
    pub signing_key_pem: Option<String>,
}

impl Credentials {
    /// Validates that a present signing key looks like a PEM block.
    /// Binary key material is out of scope for v1 (§9) and is rejected
    /// here rather than silently ignored.
    pub fn validate(&self) -> Result<(), CredentialError> {
        match &self.signing_key_pem {
            Some(key) if !key.trim_start().starts_with("-----BEGIN") => Err(CredentialError::NotPem),
            _ => Ok(()),
        }
    }
}

/// Supplies fresh credentials on demand. The Telemetry Engine calls this
/// on first dispatch and again after 10 consecutive publish failures
/// (§4.5 step 4).
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn load(&self) -> Result<Credentials, CredentialError>;
}

/// A fixed set of credentials, for tests and for deployments that inject
/// credentials out-of-band rather than fetching them from this process.
pub struct StaticCredentialSource(pub Credentials);

impl StaticCredentialSource {
    pub fn new(credentials: Credentials) -> Self {
        Self(credentials)
    }
}

#[async_trait]
impl CredentialSource for StaticCredentialSource {
    async fn load(&self) -> Result<Credentials, CredentialError> {
        self.0.validate()?;
        Ok(self.0.clone())
    }
}

#[cfg(test)]
#[path = "credential_tests.rs"]
mod tests;
