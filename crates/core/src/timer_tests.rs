use super::*;

#[test]
fn completed_has_no_deferral() {
    assert!(TimerOutcome::Completed.is_completed());
    assert_eq!(TimerOutcome::Completed.deferred_for(), None);
}

#[test]
fn deferred_reports_its_duration() {
    let outcome = TimerOutcome::Deferred(Duration::from_secs(60));
    assert!(!outcome.is_completed());
    assert_eq!(outcome.deferred_for(), Some(Duration::from_secs(60)));
}
