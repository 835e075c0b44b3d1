// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: resolve configuration, acquire the single-instance
//! lock, write/remove the runfile advertised to out-of-core clients
//! (§6 External Interfaces), and tear everything down on shutdown.

use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use acme_wire::Runfile;
use thiserror::Error;
use tracing::{info, warn};

use crate::env;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("could not determine state directory")]
    NoStateDir,

    #[error("daemon already running (pid {0})")]
    AlreadyRunning(u32),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Resolved configuration for one daemon run. Every path is rooted at
/// [`env::state_dir`] unless overridden.
#[derive(Debug, Clone)]
pub struct Config {
    pub state_dir: PathBuf,
    pub lock_path: PathBuf,
    pub runfile_path: PathBuf,
    pub agent_state_dir: PathBuf,
    pub manifest_dir: PathBuf,
    pub plugin_dir: PathBuf,
    pub telemetry_queue_path: PathBuf,
    pub max_executors: usize,
    pub execution_sla: Duration,
    pub requeue_threshold: Duration,
    pub sweep_interval: Duration,
    pub telemetry_endpoint: Option<String>,
    pub host_source: String,
}

impl Config {
    pub fn load() -> Result<Self, LifecycleError> {
        let state_dir = env::state_dir()?;
        Ok(Self {
            lock_path: state_dir.join("acmed.pid"),
            runfile_path: state_dir.join("run").join("acmed.json"),
            agent_state_dir: state_dir.join("agents"),
            manifest_dir: state_dir.join("manifests"),
            plugin_dir: env::plugin_dir()?,
            telemetry_queue_path: state_dir.join("telemetry.queue"),
            max_executors: env::max_executors(),
            execution_sla: env::execution_sla(),
            requeue_threshold: env::requeue_threshold(),
            sweep_interval: env::sweep_interval(),
            telemetry_endpoint: env::telemetry_endpoint(),
            host_source: env::host_source(),
            state_dir,
        })
    }
}

/// Held for the process lifetime; dropping it never releases the lock
/// file itself (that's [`release_lock`]'s job at clean shutdown) since a
/// crash must leave the pid file behind for the next start's staleness
/// check.
pub struct DaemonState {
    pub config: Config,
    pub start_time: Instant,
}

/// Acquires the single-instance lock, writes the runfile, and returns a
/// [`DaemonState`]. A prior lock file whose pid is no longer alive is
/// treated as stale and silently replaced.
pub fn startup(config: Config) -> Result<DaemonState, LifecycleError> {
    std::fs::create_dir_all(&config.state_dir)?;
    std::fs::create_dir_all(&config.agent_state_dir)?;
    std::fs::create_dir_all(&config.manifest_dir)?;
    if let Some(parent) = config.runfile_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    acquire_lock(&config.lock_path)?;
    write_runfile(&config.runfile_path)?;

    info!(state_dir = %config.state_dir.display(), "daemon started");
    Ok(DaemonState { config, start_time: Instant::now() })
}

/// Removes the runfile and lock file. Called once, on the clean shutdown
/// path only — a crash intentionally leaves both behind so the next
/// start's staleness check has something to evaluate.
pub fn shutdown(state: &DaemonState) {
    if state.config.runfile_path.exists() {
        if let Err(err) = std::fs::remove_file(&state.config.runfile_path) {
            warn!(error = %err, "failed to remove runfile on shutdown");
        }
    }
    if state.config.lock_path.exists() {
        if let Err(err) = std::fs::remove_file(&state.config.lock_path) {
            warn!(error = %err, "failed to remove lock file on shutdown");
        }
    }
    info!(uptime_secs = state.start_time.elapsed().as_secs(), "daemon shutdown complete");
}

fn acquire_lock(lock_path: &std::path::Path) -> Result<(), LifecycleError> {
    if let Some(existing_pid) = read_pid(lock_path) {
        if process_alive(existing_pid) {
            return Err(LifecycleError::AlreadyRunning(existing_pid));
        }
        warn!(pid = existing_pid, "removing stale lock file from a dead process");
        let _ = std::fs::remove_file(lock_path);
    }

    let mut file = std::fs::OpenOptions::new().write(true).create(true).truncate(true).open(lock_path)?;
    writeln!(file, "{}", std::process::id())?;
    Ok(())
}

fn read_pid(lock_path: &std::path::Path) -> Option<u32> {
    std::fs::read_to_string(lock_path).ok()?.trim().parse().ok()
}

#[cfg(target_os = "linux")]
fn process_alive(pid: u32) -> bool {
    std::path::Path::new(&format!("/proc/{pid}")).exists()
}

#[cfg(not(target_os = "linux"))]
fn process_alive(_pid: u32) -> bool {
    // Conservative: assume alive so a non-Linux host never steals a lock
    // it cannot actually verify the liveness of.
    true
}

fn write_runfile(path: &std::path::Path) -> Result<(), LifecycleError> {
    let runfile = Runfile::new(
        "localhost",
        0,
        acme_wire::EndpointKind::UnixSocket,
        whoami(),
        std::process::id(),
    );
    let json = serde_json::to_vec_pretty(&runfile).unwrap_or_default();
    std::fs::write(path, json)?;
    Ok(())
}

fn whoami() -> String {
    std::env::var("USER").or_else(|_| std::env::var("USERNAME")).unwrap_or_else(|_| "unknown".to_string())
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
