// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Telemetry Engine's router (§4.5): a map from `(subject_area,
//! event_type)` to the `Publisher` that ships it, with a default
//! fallback. Building one requires loading credentials, so it is lazy
//! and fallible — the engine rebuilds it on first dispatch and again
//! after a run of consecutive publish failures.

use std::collections::HashMap;
use std::sync::Arc;

use acme_adapters::CredentialError;
use acme_core::Event;
use acme_wire::{PublishError, Publisher, WireError, WireEventRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RouterBuildError {
    #[error("credentials unavailable: {0}")]
    Credentials(#[from] CredentialError),
}

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("no publisher configured for this subject_area/event_type and no default route")]
    NoPublisher,
    #[error("failed to encode event for the wire: {0}")]
    Wire(#[from] WireError),
    #[error("publish failed: {0}")]
    Publish(#[from] PublishError),
}

/// Builds (or rebuilds) a [`Router`]. Rebuilding is how the engine picks
/// up fresh credentials after a run of failures (§4.5 step 4).
#[async_trait]
pub trait RouterBuilder: Send + Sync {
    async fn build(&self) -> Result<Router, RouterBuildError>;
}

/// Selects a publisher for an event's `(subject_area, event_type)`,
/// falling back to a default when no specific route matches, exactly as
/// `spec.md` §4.5 describes the router ("owns a map from (subject_area,
/// event_type) -> publisher with a default fallback").
#[derive(Clone, Default)]
pub struct Router {
    routes: HashMap<(String, String), Arc<dyn Publisher>>,
    default: Option<Arc<dyn Publisher>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default(mut self, publisher: Arc<dyn Publisher>) -> Self {
        self.default = Some(publisher);
        self
    }

    pub fn with_route(
        mut self,
        subject_area: impl Into<String>,
        event_type: impl Into<String>,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        self.routes.insert((subject_area.into(), event_type.into()), publisher);
        self
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    fn publisher_for(&self, subject_area: &str, event_type: &str) -> Option<&Arc<dyn Publisher>> {
        self.routes
            .get(&(subject_area.to_string(), event_type.to_string()))
            .or(self.default.as_ref())
    }

    /// Pages `event` if it exceeds `record_size_limit` and publishes
    /// every page in order through the route selected by the event's
    /// `(subject_area, event_type)`. A failure on any page fails the
    /// whole event, which the caller then requeues wholesale — pages are
    /// never tracked independently in the durable queue (§4.5 Size
    /// handling).
    pub async fn route_event(
        &self,
        event: &Event,
        record_size_limit: usize,
        submit_date: DateTime<Utc>,
    ) -> Result<(), RouteError> {
        let publisher = self
            .publisher_for(&event.subject_area, &event.event_type)
            .ok_or(RouteError::NoPublisher)?;

        for page in event.clone().into_pages(record_size_limit) {
            let record = WireEventRecord::from_page(&page, submit_date)?;
            publisher.publish(&record).await?;
        }
        Ok(())
    }
}

/// The shipped [`RouterBuilder`]: confirms credentials are loadable,
/// then routes everything to one [`acme_adapters::HttpsPublisher`]
/// default fallback. `spec.md` §4.5 describes per-`(subject_area,
/// event_type)` routes as a router capability, not a requirement that
/// every deployment populate one — this workspace has no catalog of
/// distinct sinks to route by, so only the default fallback is wired.
pub struct HttpsRouterBuilder {
    endpoint: String,
    credentials: Arc<dyn acme_adapters::CredentialSource>,
}

impl HttpsRouterBuilder {
    pub fn new(endpoint: impl Into<String>, credentials: Arc<dyn acme_adapters::CredentialSource>) -> Self {
        Self { endpoint: endpoint.into(), credentials }
    }
}

#[async_trait]
impl RouterBuilder for HttpsRouterBuilder {
    async fn build(&self) -> Result<Router, RouterBuildError> {
        // Confirm credentials are available now; `HttpsPublisher` reloads
        // them again per-publish, but a router build that can't even do
        // this much should fail fast rather than hand back a router that
        // will fail its first dispatch.
        self.credentials.load().await?;
        let publisher: Arc<dyn Publisher> =
            Arc::new(acme_adapters::HttpsPublisher::new(self.endpoint.clone(), self.credentials.clone()));
        Ok(Router::new().with_default(publisher))
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
