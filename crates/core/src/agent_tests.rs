// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use rand::SeedableRng;
use rand::rngs::StdRng;

#[test]
fn new_agent_starts_idle_with_no_history() {
    let agent = Agent::new("endpoint-inventory", "Endpoint Inventory");
    assert_eq!(agent.status, AgentStatus::IDLE);
    assert_eq!(agent.last_execution, None);
    assert_eq!(agent.last_execution_status, ExecutionStatus::None);
    assert_eq!(agent.priority, Priority::None);
}

#[test]
fn priority_ordering_is_ascending() {
    assert!(Priority::Low < Priority::Medium);
    assert!(Priority::Medium < Priority::High);
    assert!(Priority::High < Priority::Critical);
    assert!(Priority::None < Priority::Low);
}

#[test]
fn agent_status_bits_compose() {
    let both = AgentStatus::EXECUTING | AgentStatus::QUEUED;
    assert!(both.contains(AgentStatus::EXECUTING));
    assert!(both.contains(AgentStatus::QUEUED));
    assert!(!AgentStatus::IDLE.contains(AgentStatus::EXECUTING));
}

#[test]
fn trigger_kind_matches_known_bit_positions() {
    assert_eq!(TriggerKind::STARTUP.bits(), 1 << 2);
    assert_eq!(TriggerKind::NETWORK_CHANGE.bits(), 1 << 9);
    assert_eq!(TriggerKind::PROCESS_START.bits(), 1 << 16);
}

#[test]
fn site_filter_literal_and_regex_both_match() {
    let filter = SiteFilter {
        sites: vec!["hq".into()],
        regex: Some(Regex::new("^lab-.*").unwrap()),
    };
    assert!(filter.matches("hq"));
    assert!(filter.matches("lab-42"));
    assert!(!filter.matches("branch-1"));
}

#[test]
fn empty_site_filter_matches_nothing() {
    let filter = SiteFilter::default();
    assert!(filter.is_empty());
    assert!(!filter.matches("anything"));
}

#[test]
fn reset_skew_stays_within_half_window_on_both_sides() {
    let mut agent = Agent::new("a1", "A1");
    agent.run_frequency_skew = Some(Duration::from_secs(60));
    let mut rng = StdRng::seed_from_u64(7);
    let mut saw_negative = false;
    let mut saw_positive = false;
    for _ in 0..200 {
        agent.reset_skew(&mut rng);
        let skew = agent.random_skew.expect("skew should be set");
        assert!((-30_000..=30_000).contains(&skew));
        saw_negative |= skew < 0;
        saw_positive |= skew > 0;
    }
    assert!(saw_negative, "200 draws never went negative — lower half of the window is unreachable");
    assert!(saw_positive, "200 draws never went positive — upper half of the window is unreachable");
}

#[test]
fn reset_skew_none_when_no_skew_configured() {
    let mut agent = Agent::new("a1", "A1");
    let mut rng = StdRng::seed_from_u64(1);
    agent.reset_skew(&mut rng);
    assert_eq!(agent.random_skew, None);
}

#[test]
fn merge_persisted_state_carries_history_forward_and_forces_idle() {
    let mut prior = Agent::new("a1", "A1");
    prior.random_skew = Some(-5_000);
    prior.last_execution = Some(chrono::Utc::now());
    prior.last_execution_status = ExecutionStatus::Success;
    prior.status = AgentStatus::EXECUTING;

    let mut fresh = Agent::new("a1", "A1 renamed by plugin");
    fresh.merge_persisted_state(&prior);

    assert_eq!(fresh.random_skew, prior.random_skew);
    assert_eq!(fresh.last_execution, prior.last_execution);
    assert_eq!(fresh.last_execution_status, ExecutionStatus::Success);
    assert_eq!(fresh.status, AgentStatus::IDLE);
}

#[test]
fn agent_serde_roundtrip_preserves_all_fields() {
    let mut agent = Agent::new("a1", "A1");
    agent.priority = Priority::High;
    agent.triggers = TriggerKind::SCHEDULED | TriggerKind::NETWORK_CHANGE;
    agent.prerequisites = StateFlags::ONLINE | StateFlags::ONDOMAIN;
    agent.execution_limits = ExecutionLimits::RUN_ONCE;
    agent.run_frequency = Some(Duration::from_secs(3600));
    agent.run_probability = Some(500);
    agent.ad_site_excludes = SiteFilter { sites: vec!["lab".into()], regex: None };
    agent.last_execution = Some(chrono::Utc::now());
    agent.last_execution_status = ExecutionStatus::Error;

    let json = serde_json::to_string(&agent).unwrap();
    let parsed: Agent = serde_json::from_str(&json).unwrap();

    assert_eq!(parsed.priority, agent.priority);
    assert_eq!(parsed.triggers, agent.triggers);
    assert_eq!(parsed.prerequisites, agent.prerequisites);
    assert_eq!(parsed.execution_limits, agent.execution_limits);
    assert_eq!(parsed.run_frequency, agent.run_frequency);
    assert_eq!(parsed.run_probability, agent.run_probability);
    assert_eq!(parsed.ad_site_excludes, agent.ad_site_excludes);
    assert_eq!(parsed.last_execution_status, agent.last_execution_status);
}
