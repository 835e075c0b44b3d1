// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Dispatcher (proxy) (§4.5, §9 Design Notes "Global event dispatcher
//! -> explicit singleton with registration API and `is_configured()`").
//! A fan-out object Executors (and any other in-process event producer)
//! use to inject events toward the Controller's Telemetry Engine without
//! holding a direct reference to it. Expressed as an explicit struct
//! injected where needed, never a module-level mutable registry.

use std::sync::Arc;

use acme_core::Event;
use parking_lot::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no delegate registered")]
    Unconfigured,
    #[error("delegate failed: {0}")]
    DelegateFailed(String),
}

/// One delegate a [`TelemetryDispatcher`] can fan an event out to.
pub trait EventSink: Send + Sync {
    fn commit(&self, event: Event) -> Result<(), DispatchError>;
}

/// Fans an event out to every registered delegate; the first successful
/// delivery counts as success, and only if none succeed is the last
/// failure reported back to the caller (§4.5: "the first successful
/// dispatch counts; if none succeed the last exception is re-raised").
#[derive(Default)]
pub struct TelemetryDispatcher {
    delegates: Mutex<Vec<Arc<dyn EventSink>>>,
}

impl TelemetryDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, sink: Arc<dyn EventSink>) {
        self.delegates.lock().push(sink);
    }

    pub fn is_configured(&self) -> bool {
        !self.delegates.lock().is_empty()
    }

    pub fn dispatch(&self, event: Event) -> Result<(), DispatchError> {
        let delegates = self.delegates.lock().clone();
        let mut last_err = DispatchError::Unconfigured;
        for delegate in &delegates {
            match delegate.commit(event.clone()) {
                Ok(()) => return Ok(()),
                Err(err) => last_err = err,
            }
        }
        Err(last_err)
    }
}

/// An [`EventSink`] that hands events to an `mpsc` channel — the shape
/// used to inject proxied telemetry from an Executor toward the
/// Controller's own `commit_event` path (§4.3 "Proxied logging and
/// telemetry").
pub struct ChannelEventSink(pub tokio::sync::mpsc::Sender<Event>);

impl EventSink for ChannelEventSink {
    fn commit(&self, event: Event) -> Result<(), DispatchError> {
        self.0.try_send(event).map_err(|err| DispatchError::DelegateFailed(err.to_string()))
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
