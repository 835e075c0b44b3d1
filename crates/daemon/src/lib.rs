// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! acme-daemon: the Agent Registry & Controller (§4.3), the Telemetry
//! Engine (§4.5), and the process lifecycle (startup/shutdown, runfile,
//! single-instance lock) that wires both of them, plus every other core
//! crate, into the `acmed` binary.

pub mod env;
pub mod lifecycle;
pub mod registry;
pub mod telemetry;

pub use lifecycle::{Config, DaemonState, LifecycleError};
pub use registry::{Controller, LoaderError};
pub use telemetry::{
    ChannelEventSink, DispatchError, EventSink, HttpsRouterBuilder, RouteError, Router,
    RouterBuildError, RouterBuilder, TelemetryDispatcher, TelemetryEngine, TelemetryState,
};
