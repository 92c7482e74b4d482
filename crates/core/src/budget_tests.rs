// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;
use yare::parameterized;

fn tracker(usage: u64, last_updated: u64) -> BudgetTracker {
    BudgetTracker {
        session_id: SessionId::new("S"),
        max_tokens: DEFAULT_MAX_TOKENS,
        estimated_usage: usage,
        last_updated,
    }
}

#[test]
fn usage_total_sums_all_token_kinds() {
    let usage = TranscriptUsage {
        input_tokens: 100,
        cache_creation_tokens: 20,
        cache_read_tokens: 3,
        model: None,
        timestamp: String::new(),
    };
    assert_eq!(usage.total(), 123);
    assert!(!usage.is_empty());
}

#[test]
fn zero_usage_is_empty_not_an_error() {
    let usage = TranscriptUsage::default();
    assert_eq!(usage.total(), 0);
    assert!(usage.is_empty());

    // observe() ignores empty usage
    let mut t = tracker(50_000, 1);
    t.observe(&usage, 999);
    assert_eq!(t.estimated_usage, 50_000);
    assert_eq!(t.last_updated, 1);
}

#[parameterized(
    optimal_low = { 0.0, BudgetStatus::Optimal },
    optimal_just_below = { 0.699, BudgetStatus::Optimal },
    warning_at_threshold = { 0.70, BudgetStatus::Warning },
    warning_high = { 0.849, BudgetStatus::Warning },
    critical_at_threshold = { 0.85, BudgetStatus::Critical },
    critical_full = { 1.0, BudgetStatus::Critical },
)]
fn status_thresholds(usage: f64, expected: BudgetStatus) {
    assert_eq!(classify_status(usage), expected);
}

#[parameterized(
    green = { 0.60, Readiness::Green },
    amber = { 0.40, Readiness::Amber },
    amber_high = { 0.599, Readiness::Amber },
    red = { 0.15, Readiness::Red },
    critical = { 0.149, Readiness::Critical },
    exhausted = { 0.0, Readiness::Critical },
)]
fn readiness_tiers(remaining: f64, expected: Readiness) {
    assert_eq!(classify_readiness(remaining), expected);
}

#[test]
fn staleness_requires_a_prior_update() {
    let interval = WATCHDOG_INTERVAL_SECS;
    assert!(!is_stale(0, 10_000_000, interval));
    assert!(!is_stale(1_000, 1_000 + interval * 1000, interval));
    assert!(is_stale(1_000, 1_000 + interval * 1000 + 1, interval));
}

#[test]
fn critical_stale_session_hands_off_now() {
    // 184k of 200k used, last update 30 minutes ago
    let now = 3_600_000_000;
    let t = tracker(184_000, now - 30 * 60 * 1000);
    let status = SessionStatus::evaluate(&t, now, WATCHDOG_INTERVAL_SECS, true);

    assert_eq!(status.status, BudgetStatus::Critical);
    assert_eq!(status.readiness, Readiness::Critical);
    assert!(status.is_stale);
    assert_eq!(status.action, SessionAction::HandoffNow);
    assert!((status.usage_percent - 0.92).abs() < 1e-9);
}

#[test]
fn warning_session_checkpoints() {
    let t = tracker(150_000, 1);
    let status = SessionStatus::evaluate(&t, 1_000, WATCHDOG_INTERVAL_SECS, false);
    assert_eq!(status.status, BudgetStatus::Warning);
    assert_eq!(status.action, SessionAction::CheckpointAndPrepareHandoff);
}

#[test]
fn stale_optimal_session_with_work_recovers() {
    let now = 3_600_000_000;
    let t = tracker(10_000, now - 25 * 60 * 1000);
    let status = SessionStatus::evaluate(&t, now, WATCHDOG_INTERVAL_SECS, true);
    assert_eq!(status.action, SessionAction::RecoverDeadSession);

    let idle = SessionStatus::evaluate(&t, now, WATCHDOG_INTERVAL_SECS, false);
    assert_eq!(idle.action, SessionAction::Continue);
}

#[test]
fn percents_sum_to_one() {
    for usage in [0, 1, 50_000, 140_000, 184_000, 200_000, 250_000] {
        let t = tracker(usage, 0);
        let status = SessionStatus::evaluate(&t, 0, WATCHDOG_INTERVAL_SECS, false);
        let sum = status.usage_percent + status.remaining_percent;
        assert!((0.999..=1.001).contains(&sum), "usage {}: sum {}", usage, sum);
    }
}

#[test]
fn zero_max_tokens_reads_as_unused() {
    let mut t = tracker(5_000, 0);
    t.max_tokens = 0;
    assert_eq!(t.usage_fraction(), 0.0);
}

fn status_fixture(id: &str, readiness: Readiness, status: BudgetStatus, stale: bool) -> SessionStatus {
    SessionStatus {
        session_id: SessionId::new(id),
        status,
        readiness,
        usage_percent: 0.5,
        remaining_percent: 0.5,
        is_stale: stale,
        action: SessionAction::Continue,
        last_task: String::new(),
        restart_attempted: false,
        restart_success: false,
        restart_message: String::new(),
        tmux_target: String::new(),
    }
}

#[test]
fn comparator_orders_by_severity_then_staleness_then_id() {
    let mut statuses = vec![
        status_fixture("b", Readiness::Green, BudgetStatus::Optimal, false),
        status_fixture("a", Readiness::Green, BudgetStatus::Optimal, false),
        status_fixture("c", Readiness::Green, BudgetStatus::Optimal, true),
        status_fixture("d", Readiness::Green, BudgetStatus::Warning, false),
        status_fixture("e", Readiness::Critical, BudgetStatus::Optimal, false),
    ];
    statuses.sort_by(compare_statuses);

    let order: Vec<&str> = statuses.iter().map(|s| s.session_id.as_str()).collect();
    assert_eq!(order, ["e", "d", "c", "a", "b"]);
}

proptest! {
    #[test]
    fn comparator_is_a_total_order(
        seeds in proptest::collection::vec((0u8..4, 0u8..3, any::<bool>(), "[a-z]{1,4}"), 3)
    ) {
        let readiness = [Readiness::Green, Readiness::Amber, Readiness::Red, Readiness::Critical];
        let status = [BudgetStatus::Optimal, BudgetStatus::Warning, BudgetStatus::Critical];
        let items: Vec<SessionStatus> = seeds
            .into_iter()
            .map(|(r, s, stale, id)| status_fixture(&id, readiness[r as usize], status[s as usize], stale))
            .collect();

        let (a, b, c) = (&items[0], &items[1], &items[2]);

        // reflexive
        prop_assert_eq!(compare_statuses(a, a), Ordering::Equal);
        // antisymmetric
        prop_assert_eq!(compare_statuses(a, b), compare_statuses(b, a).reverse());
        // transitive
        if compare_statuses(a, b) != Ordering::Greater && compare_statuses(b, c) != Ordering::Greater {
            prop_assert_ne!(compare_statuses(a, c), Ordering::Greater);
        }
    }
}
