// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `Publisher` seam the Telemetry Engine's router dispatches a wire
//! record through. `acme-wire` only declares the contract; a concrete
//! HTTPS implementation lives in `acme-adapters` so this crate stays free
//! of a network stack dependency.

use crate::record::WireEventRecord;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("transport error publishing record: {0}")]
    Transport(String),
    #[error("sink rejected record: {0}")]
    Rejected(String),
}

/// Ships one [`WireEventRecord`] to a remote streaming sink. Implementors
/// are expected to be cheap to clone (an `Arc<dyn Publisher>` held by the
/// router) and must not retry internally — the Telemetry Engine's
/// dispatch loop owns retry/backoff (§4.5).
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, record: &WireEventRecord) -> Result<(), PublishError>;
}

#[cfg(test)]
#[path = "publisher_tests.rs"]
mod tests;
