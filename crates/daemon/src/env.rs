// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;
use std::time::Duration;

use crate::lifecycle::LifecycleError;

/// Resolve state directory: ACME_STATE_DIR > XDG_STATE_HOME/acme > ~/.local/state/acme
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("ACME_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("acme"));
    }
    let home = std::env::var("HOME").map_err(|_| LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/acme"))
}

/// Directory the Loader scans for plugin manifests. Defaults under the
/// state directory so a fresh install has somewhere to look even before
/// any provisioning step runs.
pub fn plugin_dir() -> Result<PathBuf, LifecycleError> {
    match std::env::var("ACME_PLUGIN_DIR") {
        Ok(dir) => Ok(PathBuf::from(dir)),
        Err(_) => Ok(state_dir()?.join("plugins")),
    }
}

/// Upper bound on live Executor workers (§4.3).
pub fn max_executors() -> usize {
    std::env::var("ACME_MAX_EXECUTORS").ok().and_then(|s| s.parse().ok()).unwrap_or(10)
}

/// How long a request may sit queued before it counts toward the
/// over-SLA bump to the ideal executor count (§4.3, default 15 s).
pub fn execution_sla() -> Duration {
    std::env::var("ACME_EXECUTION_SLA_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(15))
}

/// How long an admitted-but-not-yet-finished request is treated as still
/// queued before a duplicate is allowed to replace it (§4.3, default 10 min).
pub fn requeue_threshold() -> Duration {
    std::env::var("ACME_REQUEUE_THRESHOLD_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(10 * 60))
}

/// Scheduler sweep period (§4.3, default 0.5 s).
pub fn sweep_interval() -> Duration {
    std::env::var("ACME_SWEEP_INTERVAL_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_millis(500))
}

/// Telemetry sink endpoint. Absent in local/test deployments, in which
/// case the Telemetry Engine stays UNCONFIGURED.
pub fn telemetry_endpoint() -> Option<String> {
    std::env::var("ACME_TELEMETRY_ENDPOINT").ok().filter(|s| !s.is_empty())
}

/// Host identifier stamped onto every Event as its `source` (§3).
pub fn host_source() -> String {
    std::env::var("ACME_HOST_SOURCE")
        .ok()
        .filter(|s| !s.is_empty())
        .or_else(|| std::env::var("HOSTNAME").ok())
        .unwrap_or_else(|| "unknown-host".to_string())
}

/// Log level passed to the `EnvFilter` the daemon installs at startup.
pub fn log_level() -> String {
    std::env::var("ACME_LOG_LEVEL").unwrap_or_else(|_| "info".to_string())
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
