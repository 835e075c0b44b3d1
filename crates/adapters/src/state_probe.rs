// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A test-grade `StateProbe` implementation. Real systemprofile
//! interrogation (macOS/Ubuntu/RHEL) is an external collaborator per
//! `spec.md` §1 and is not implemented in this workspace; this adapter
//! reads the same composite flags from environment variables so the
//! Controller has something real to construct `Arc<dyn StateProbe>`
//! from outside of tests. A production deployment swaps this for an
//! out-of-core adapter without touching `acme-core` or the Controller.

use acme_core::{StateFlags, StateProbe, StateSnapshot};
use std::env;
use std::time::Duration;

const FLAGS: &[(&str, StateFlags)] = &[
    ("ACME_STATE_ONLINE", StateFlags::ONLINE),
    ("ACME_STATE_OFFLINE", StateFlags::OFFLINE),
    ("ACME_STATE_ONDOMAIN", StateFlags::ONDOMAIN),
    ("ACME_STATE_OFFDOMAIN", StateFlags::OFFDOMAIN),
    ("ACME_STATE_ONVPN", StateFlags::ONVPN),
    ("ACME_STATE_OFFVPN", StateFlags::OFFVPN),
    ("ACME_STATE_IDLE_MACHINE", StateFlags::IDLE_MACHINE),
];

/// Reads host-state flags from environment variables (`ACME_STATE_*=1`),
/// the network site (`ACME_STATE_SITE`), console user
/// (`ACME_CONSOLE_USER`), hardware id (`ACME_HARDWARE_ID`), uptime in
/// seconds (`ACME_UPTIME_SECS`), and last login epoch milliseconds
/// (`ACME_LAST_LOGIN_EPOCH_MS`). An unset or unparsable variable is
/// omitted rather than guessed, matching §4.1's failure-tolerance
/// requirement.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvStateProbe;

impl EnvStateProbe {
    pub fn new() -> Self {
        Self
    }
}

impl StateProbe for EnvStateProbe {
    fn snapshot(&self) -> StateSnapshot {
        let mut flags = StateFlags::NONE;
        for (var, bit) in FLAGS {
            if env::var(var).ok().as_deref() == Some("1") {
                flags |= *bit;
            }
        }

        StateSnapshot {
            flags,
            site: env::var("ACME_STATE_SITE").ok(),
            console_user: env::var("ACME_CONSOLE_USER").ok(),
            hardware_id: env::var("ACME_HARDWARE_ID").ok(),
            uptime: env::var("ACME_UPTIME_SECS").ok().and_then(|v| v.parse().ok()).map(Duration::from_secs),
            last_login: env::var("ACME_LAST_LOGIN_EPOCH_MS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .and_then(|ms| chrono::DateTime::from_timestamp_millis(ms)),
        }
    }
}

#[cfg(test)]
#[path = "state_probe_tests.rs"]
mod tests;
