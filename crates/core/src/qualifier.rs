// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pure qualification decision: given an Agent, the trigger that fired,
//! and a snapshot of host state, decide whether the Agent is eligible to
//! run right now. All checks are evaluated unconditionally — an Agent may
//! fail for more than one reason in a single call, and the caller sees
//! the full set rather than the first failure.

use crate::agent::{Agent, ExecutionLimits, ExecutionStatus, TriggerKind};
use crate::state::StateSnapshot;
use bitflags::bitflags;
use chrono::{DateTime, Utc};
use rand::Rng;

bitflags! {
    /// Bitmask of qualification failure reasons. Zero means the agent is
    /// fully qualified.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct QualResult: u8 {
        const TRIGGER_MISMATCH = 1 << 0;
        const PREREQUISITES_UNMET = 1 << 1;
        const SITE_EXCLUDED = 1 << 2;
        const PROBABILITY_FAILED = 1 << 3;
        const MAX_FREQUENCY_NOT_ELAPSED = 1 << 4;
        const EXECUTION_LIMITS_REACHED = 1 << 5;
    }
}

impl QualResult {
    pub fn is_qualified(self) -> bool {
        self.is_empty()
    }
}

/// Evaluate every ordered check against `agent` for the given `trigger`
/// firing in host state `state` at time `now`. `data` is accepted for
/// interface symmetry with the trigger-dispatch call that produces
/// `AgentExecutionRequest`s but is not consulted by any check defined
/// here.
pub fn qualify(
    agent: &Agent,
    trigger: TriggerKind,
    _data: &serde_json::Value,
    state: &StateSnapshot,
    now: DateTime<Utc>,
    rng: &mut impl Rng,
) -> QualResult {
    let mut result = QualResult::empty();

    // 1. Trigger match. Zero means "no trigger check" (scheduled sweeps).
    if !trigger.is_empty() && !agent.triggers.contains(trigger) {
        result |= QualResult::TRIGGER_MISMATCH;
    }

    // 2. Prerequisites: every asserted bit in agent.prerequisites must
    // also be asserted in the current state.
    if (state.flags & agent.prerequisites) != agent.prerequisites {
        result |= QualResult::PREREQUISITES_UNMET;
    }

    // 3. Site include/exclude. Exclude wins ties.
    let site = state.site.as_deref().unwrap_or("");
    if !agent.ad_site_excludes.is_empty() && agent.ad_site_excludes.matches(site) {
        result |= QualResult::SITE_EXCLUDED;
    } else if !agent.ad_site_includes.is_empty() && !agent.ad_site_includes.matches(site) {
        result |= QualResult::SITE_EXCLUDED;
    }

    // 4. Probability: fail if run_probability < r. Larger run_probability
    // means a higher pass rate. 0 and 1000 always pass.
    if let Some(p) = agent.run_probability {
        if (1..=999).contains(&p) {
            let r: u16 = rng.gen_range(1..=1000);
            if p < r {
                result |= QualResult::PROBABILITY_FAILED;
            }
        }
    }

    // 5. Max frequency: a hard ceiling on how often the agent may run,
    // overriding trigger policy.
    if let (Some(max_freq), Some(last)) = (agent.max_run_frequency, agent.last_execution) {
        if let Ok(max_freq) = chrono::Duration::from_std(max_freq) {
            if now <= last + max_freq {
                result |= QualResult::MAX_FREQUENCY_NOT_ELAPSED;
            }
        }
    }

    // 6. Execution limits.
    if agent.execution_limits.contains(ExecutionLimits::RUN_ONCE) && agent.last_execution.is_some()
    {
        result |= QualResult::EXECUTION_LIMITS_REACHED;
    }
    if agent.execution_limits.contains(ExecutionLimits::SUCCEED_ONCE)
        && agent.last_execution_status == ExecutionStatus::Success
    {
        result |= QualResult::EXECUTION_LIMITS_REACHED;
    }

    result
}

/// Returns true when a scheduled sweep should enqueue `agent`: either it
/// has never executed, or enough time (run_frequency plus the current
/// random_skew draw) has elapsed since the last execution.
pub fn qualifies_for_scheduled_run(agent: &Agent, now: DateTime<Utc>) -> bool {
    let Some(last) = agent.last_execution else {
        return true;
    };
    let Some(freq) = agent.run_frequency else {
        return false;
    };
    let Ok(freq) = chrono::Duration::from_std(freq) else {
        return false;
    };
    // Signed: a negative draw shifts the run earlier than `last + freq`,
    // not just later (§8 Skew fairness). Nothing here computes a delay to
    // sleep for, so there is nothing to clamp to zero.
    let skew = chrono::Duration::milliseconds(agent.random_skew.unwrap_or(0));
    now >= last + freq + skew
}

#[cfg(test)]
#[path = "qualifier_tests.rs"]
mod tests;
