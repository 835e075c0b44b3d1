// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent data model: identifiers, status/trigger/prerequisite bitmasks,
//! execution limits, and the Agent record itself.

use crate::ids::AgentId;
use bitflags::bitflags;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use crate::ids::ExecutorId;

/// Relative priority of an Agent. Used only as a stable sort key when the
/// Controller drains/queues requests within a sweep — never to bypass
/// qualification (qualification is binary, not weighted).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    None,
    Low,
    Medium,
    High,
    Critical,
}

crate::simple_display! {
    Priority {
        None => "none",
        Low => "low",
        Medium => "medium",
        High => "high",
        Critical => "critical",
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::None
    }
}

bitflags! {
    /// Current lifecycle status of an Agent. Exactly one bit is set at a
    /// time in practice, but modeled as a bitmask to match the wire
    /// representation ported from the original agent.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct AgentStatus: u8 {
        const IDLE = 0;
        const EXECUTING = 1 << 0;
        const QUEUED = 1 << 1;
    }
}

impl Default for AgentStatus {
    fn default() -> Self {
        AgentStatus::IDLE
    }
}

bitflags! {
    /// Catalog of trigger kinds an Agent may register interest in. A
    /// trigger value of zero means "no trigger check" and is used for
    /// scheduled sweeps qualified purely on frequency.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct TriggerKind: u32 {
        const NONE = 0;
        const EVENT_BASED = 1 << 1;
        const STARTUP = 1 << 2;
        const SHUTDOWN = 1 << 3;
        const SESSION_START = 1 << 4;
        const SESSION_END = 1 << 5;
        const SESSION_LOCK = 1 << 6;
        const SESSION_UNLOCK = 1 << 7;
        const SCHEDULED = 1 << 8;
        const NETWORK_CHANGE = 1 << 9;
        const SYSTEM_SUSPEND = 1 << 10;
        const SYSTEM_RESUMED = 1 << 11;
        const INTRANET_CONNECT = 1 << 12;
        const INTRANET_DISCONNECT = 1 << 13;
        const PUBLIC_NETWORK_CONNECT = 1 << 14;
        const PUBLIC_NETWORK_DISCONNECT = 1 << 15;
        const PROCESS_START = 1 << 16;
    }
}

bitflags! {
    /// Composite host-state flags reported by the state probe. Also used
    /// as an Agent's `prerequisites` mask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct StateFlags: u8 {
        const NONE = 0;
        const IDLE_MACHINE = 1 << 0;
        const ONLINE = 1 << 1;
        const OFFLINE = 1 << 2;
        const ONDOMAIN = 1 << 3;
        const OFFDOMAIN = 1 << 4;
        const ONVPN = 1 << 5;
        const OFFVPN = 1 << 6;
    }
}

impl Default for StateFlags {
    fn default() -> Self {
        StateFlags::NONE
    }
}

bitflags! {
    /// Execution-limit policy for an Agent.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct ExecutionLimits: u8 {
        const NONE = 0;
        /// Never execute again once `last_execution` is set.
        const RUN_ONCE = 1 << 0;
        /// Never execute again once a SUCCESS has been recorded.
        const SUCCEED_ONCE = 1 << 1;
    }
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        ExecutionLimits::NONE
    }
}

/// Outcome of the most recent execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    None,
    Success,
    Error,
    Fatal,
}

crate::simple_display! {
    ExecutionStatus {
        None => "none",
        Success => "success",
        Error => "error",
        Fatal => "fatal",
    }
}

impl Default for ExecutionStatus {
    fn default() -> Self {
        ExecutionStatus::None
    }
}

/// Include/exclude domain-site filter: a literal list plus an optional
/// compiled regex; excludes win over includes on a tie.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteFilter {
    pub sites: Vec<String>,
    #[serde(with = "regex_opt", default)]
    pub regex: Option<Regex>,
}

impl SiteFilter {
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty() && self.regex.is_none()
    }

    pub fn matches(&self, site: &str) -> bool {
        self.sites.iter().any(|s| s == site)
            || self.regex.as_ref().is_some_and(|r| r.is_match(site))
    }
}

impl PartialEq for SiteFilter {
    fn eq(&self, other: &Self) -> bool {
        self.sites == other.sites
            && self.regex.as_ref().map(Regex::as_str) == other.regex.as_ref().map(Regex::as_str)
    }
}

mod regex_opt {
    use regex::Regex;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Regex>, s: S) -> Result<S::Ok, S::Error> {
        value.as_ref().map(Regex::as_str).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Regex>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        raw.map(|s| Regex::new(&s).map_err(serde::de::Error::custom)).transpose()
    }
}

/// A unit of work qualified and dispatched by the Controller.
///
/// Persistent fields (name, identifier, random_skew, last_execution,
/// last_execution_status) are serialized to the state store after every
/// execution; the rest is settings, merged from the plugin
/// declaration at load time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub identifier: AgentId,
    pub name: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub status: AgentStatus,
    #[serde(default)]
    pub triggers: TriggerKind,
    #[serde(default)]
    pub prerequisites: StateFlags,
    #[serde(default)]
    pub execution_limits: ExecutionLimits,
    #[serde(with = "duration_opt", default)]
    pub run_frequency: Option<Duration>,
    #[serde(with = "duration_opt", default)]
    pub run_frequency_skew: Option<Duration>,
    /// Signed milliseconds: may be negative, shifting the next scheduled
    /// run earlier than `last_execution + run_frequency` rather than only
    /// ever later.
    #[serde(with = "signed_skew_opt", default)]
    pub random_skew: Option<i64>,
    #[serde(with = "duration_opt", default)]
    pub min_run_frequency: Option<Duration>,
    #[serde(with = "duration_opt", default)]
    pub max_run_frequency: Option<Duration>,
    /// 0–1000 dice roll threshold; `None`/0/1000 always pass.
    #[serde(default)]
    pub run_probability: Option<u16>,
    #[serde(default)]
    pub ad_site_includes: SiteFilter,
    #[serde(default)]
    pub ad_site_excludes: SiteFilter,
    #[serde(with = "epoch_opt", default)]
    pub last_execution: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub last_execution_status: ExecutionStatus,
    /// Whether this Agent enforces at-most-one concurrent execution across
    /// the pool. The mutex itself lives in the Executor Pool, keyed
    /// by identifier — this is just the declaration.
    #[serde(default)]
    pub use_lock: bool,
    /// When set, the Agent's state/settings documents are persisted
    /// under `<dir>/<identifier>/<identifier>.json` instead of flatly as
    /// `<dir>/<identifier>.json` (§6 State persistence).
    #[serde(default)]
    pub needs_state_dir: bool,
}

impl Agent {
    pub fn new(identifier: impl Into<AgentId>, name: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            name: name.into(),
            priority: Priority::None,
            status: AgentStatus::IDLE,
            triggers: TriggerKind::NONE,
            prerequisites: StateFlags::NONE,
            execution_limits: ExecutionLimits::NONE,
            run_frequency: None,
            run_frequency_skew: None,
            random_skew: None,
            min_run_frequency: None,
            max_run_frequency: None,
            run_probability: None,
            ad_site_includes: SiteFilter::default(),
            ad_site_excludes: SiteFilter::default(),
            last_execution: None,
            last_execution_status: ExecutionStatus::None,
            use_lock: false,
            needs_state_dir: false,
        }
    }

    /// Re-roll `random_skew` uniformly in
    /// `[-run_frequency_skew/2, +run_frequency_skew/2]`. The draw is kept
    /// signed and applied signed by the qualifier — a negative draw shifts
    /// the next scheduled run earlier than `last_execution + run_frequency`,
    /// not just later, so the realized interval is uniform over the full
    /// `[T-S/2, T+S/2]` window rather than only its upper half.
    pub fn reset_skew(&mut self, rng: &mut impl rand::Rng) {
        let Some(skew) = self.run_frequency_skew else {
            self.random_skew = None;
            return;
        };
        let half_ms = (skew.as_millis() / 2) as i64;
        self.random_skew = Some(if half_ms == 0 { 0 } else { rng.gen_range(-half_ms..=half_ms) });
    }

    /// Merge the persisted fields of a previously loaded instance onto
    /// this freshly instantiated one, carried forward across a plugin
    /// reload. Status is always forced to IDLE.
    pub fn merge_persisted_state(&mut self, prior: &Agent) {
        self.random_skew = prior.random_skew;
        self.last_execution = prior.last_execution;
        self.last_execution_status = prior.last_execution_status;
        self.status = AgentStatus::IDLE;
    }
}

mod duration_opt {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        value.map(|d| d.as_secs_f64()).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        let raw: Option<f64> = Option::deserialize(d)?;
        Ok(raw.map(Duration::from_secs_f64))
    }
}

mod signed_skew_opt {
    use serde::{Deserialize, Deserializer, Serializer};

    /// Same wire shape as `duration_opt` (fractional seconds) but signed,
    /// since `random_skew` may be negative.
    pub fn serialize<S: Serializer>(value: &Option<i64>, s: S) -> Result<S::Ok, S::Error> {
        value.map(|ms| ms as f64 / 1000.0).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
        let raw: Option<f64> = Option::deserialize(d)?;
        Ok(raw.map(|secs| (secs * 1000.0).round() as i64))
    }
}

mod epoch_opt {
    use chrono::{DateTime, TimeZone, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        s: S,
    ) -> Result<S::Ok, S::Error> {
        value.map(|d| d.timestamp_millis()).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw: Option<i64> = Option::deserialize(d)?;
        Ok(raw.map(|ms| Utc.timestamp_millis_opt(ms).single().unwrap_or_else(Utc::now)))
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
