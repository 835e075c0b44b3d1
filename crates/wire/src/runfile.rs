// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The on-disk descriptor the daemon writes at startup so the CLI and
//! user-context clients can locate its IPC endpoint.

use serde::{Deserialize, Serialize};

/// The kind of IPC endpoint advertised by a runfile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointKind {
    UnixSocket,
    NamedPipe,
    Tcp,
}

/// Written to `<base>/run/...` on daemon start; removed on clean
/// shutdown. A runfile whose pid no longer belongs to the expected user
/// and command is stale and should be treated as if the file were
/// absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Runfile {
    pub host: String,
    pub port: u16,
    pub kind: EndpointKind,
    pub user: String,
    pub pid: u32,
}

impl Runfile {
    pub fn new(host: impl Into<String>, port: u16, kind: EndpointKind, user: impl Into<String>, pid: u32) -> Self {
        Self { host: host.into(), port, kind, user: user.into(), pid }
    }

    /// A runfile is stale when the recorded process is no longer alive,
    /// or when a liveness probe run by the caller reports the pid has
    /// been recycled by a different user/command. This crate only knows
    /// how to express the predicate; the actual `/proc` or `kill -0`
    /// check is supplied by the caller since it is platform-specific.
    pub fn is_stale(&self, process_alive: impl FnOnce(u32) -> bool) -> bool {
        !process_alive(self.pid)
    }
}

#[cfg(test)]
#[path = "runfile_tests.rs"]
mod tests;
