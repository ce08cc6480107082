use ipvsd_core::PulseStatus;

use super::Trend;

#[test]
fn stays_up_through_failures_below_threshold() {
    let mut trend = Trend::new();
    assert_eq!(trend.record(false, 3, 2), PulseStatus::Up);
    assert_eq!(trend.record(false, 3, 2), PulseStatus::Up);
    assert_eq!(trend.record(true, 3, 2), PulseStatus::Up);
}

#[test]
fn drops_to_down_once_failure_threshold_is_reached() {
    let mut trend = Trend::new();
    assert_eq!(trend.record(false, 3, 2), PulseStatus::Up);
    assert_eq!(trend.record(false, 3, 2), PulseStatus::Up);
    assert_eq!(trend.record(false, 3, 2), PulseStatus::Down);
}

#[test]
fn a_single_success_resets_the_failure_count() {
    let mut trend = Trend::new();
    assert_eq!(trend.record(false, 3, 2), PulseStatus::Up);
    assert_eq!(trend.record(false, 3, 2), PulseStatus::Up);
    assert_eq!(trend.record(true, 3, 2), PulseStatus::Up);
    assert_eq!(trend.record(false, 3, 2), PulseStatus::Up);
    assert_eq!(trend.record(false, 3, 2), PulseStatus::Up);
    assert_eq!(trend.record(false, 3, 2), PulseStatus::Down);
}

#[test]
fn stays_down_through_successes_below_recovery_threshold() {
    let mut trend = Trend::new();
    for _ in 0..3 {
        trend.record(false, 3, 2);
    }
    assert_eq!(trend.status, PulseStatus::Down);
    assert_eq!(trend.record(true, 3, 2), PulseStatus::Down);
}

#[test]
fn recovers_to_up_once_recovery_threshold_is_reached() {
    let mut trend = Trend::new();
    for _ in 0..3 {
        trend.record(false, 3, 2);
    }
    assert_eq!(trend.status, PulseStatus::Down);
    assert_eq!(trend.record(true, 3, 2), PulseStatus::Down);
    assert_eq!(trend.record(true, 3, 2), PulseStatus::Up);
}

#[test]
fn a_single_failure_resets_the_recovery_count() {
    let mut trend = Trend::new();
    for _ in 0..3 {
        trend.record(false, 3, 2);
    }
    assert_eq!(trend.record(true, 3, 2), PulseStatus::Down);
    assert_eq!(trend.record(false, 3, 2), PulseStatus::Down);
    assert_eq!(trend.record(true, 3, 2), PulseStatus::Down);
    assert_eq!(trend.record(true, 3, 2), PulseStatus::Up);
}

#[test]
fn threshold_of_zero_is_treated_as_one() {
    let mut trend = Trend::new();
    assert_eq!(trend.record(false, 0, 0), PulseStatus::Down);
    assert_eq!(trend.record(true, 0, 0), PulseStatus::Up);
}
