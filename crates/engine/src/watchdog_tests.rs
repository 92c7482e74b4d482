// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ao_adapters::FakeGateway;
use ao_core::budget::{BudgetStatus, Readiness};
use ao_core::FakeClock;
use tempfile::TempDir;

struct Fixture {
    _dir: TempDir,
    paths: RpiPaths,
    gateway: FakeGateway,
    clock: FakeClock,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let paths = RpiPaths::new(dir.path());
        Self {
            _dir: dir,
            paths,
            gateway: FakeGateway::new(),
            clock: FakeClock::new(),
        }
    }

    fn watchdog(&self, config: WatchdogConfig) -> ContextWatchdog<FakeGateway, FakeClock> {
        ContextWatchdog::new(
            self.gateway.clone(),
            self.clock.clone(),
            self.paths.clone(),
            config,
        )
    }

    fn plant_budget(&self, sid: &str, usage: u64, last_updated: u64) {
        let store = ContextStore::new(self.paths.clone());
        let mut tracker = BudgetTracker::new(SessionId::new(sid));
        tracker.estimated_usage = usage;
        tracker.last_updated = last_updated;
        store.save_budget(&tracker).unwrap();
    }
}

#[tokio::test]
async fn stale_critical_session_hands_off_with_recovery_blocker() {
    let fx = Fixture::new();
    let now_ms = 3_600_000_000u64;
    fx.clock.set_epoch_ms(now_ms);
    // 184k of 200k used, last update 30 minutes ago, no transcript at all
    fx.plant_budget("S", 184_000, now_ms - 30 * 60 * 1000);

    let watchdog = fx.watchdog(WatchdogConfig::default());
    let status = watchdog.check_session(&SessionId::new("S"), "").await.unwrap();

    assert_eq!(status.status, BudgetStatus::Critical);
    assert_eq!(status.readiness, Readiness::Critical);
    assert!(status.is_stale);
    assert_eq!(status.action.as_str(), "handoff_now");

    let doc = std::fs::read_to_string(fx.paths.handoff_dir().join("S-handoff.md")).unwrap();
    assert!(doc.contains("watchdog recovery"));
    assert!(doc.contains("92.0%"));

    let pending = HandoffStore::new(&fx.paths).list_pending();
    assert_eq!(pending.len(), 1);
    assert!(!pending[0].1.consumed);
}

#[tokio::test]
async fn healthy_session_continues_without_artifacts() {
    let fx = Fixture::new();
    fx.clock.set_epoch_ms(1_000_000);
    fx.plant_budget("S", 10_000, 990_000);

    let watchdog = fx.watchdog(WatchdogConfig::default());
    let status = watchdog.check_session(&SessionId::new("S"), "ao-rpi-x-p1").await.unwrap();

    assert_eq!(status.action, SessionAction::Continue);
    assert!(HandoffStore::new(&fx.paths).list_pending().is_empty());
}

#[tokio::test]
async fn warning_session_also_writes_a_marker() {
    let fx = Fixture::new();
    fx.clock.set_epoch_ms(1_000_000);
    fx.plant_budget("S", 150_000, 990_000);

    let watchdog = fx.watchdog(WatchdogConfig::default());
    let status = watchdog.check_session(&SessionId::new("S"), "").await.unwrap();

    assert_eq!(status.action, SessionAction::CheckpointAndPrepareHandoff);
    assert_eq!(HandoffStore::new(&fx.paths).list_pending().len(), 1);
}

#[tokio::test]
async fn transcript_refreshes_budget() {
    let fx = Fixture::new();
    let transcripts = fx.paths.repo_root().join("transcripts");
    std::fs::create_dir_all(&transcripts).unwrap();
    std::fs::write(
        transcripts.join("s.jsonl"),
        r#"{"session_id":"S7","type":"user","message":{"content":"finish the gc"}}
{"type":"assistant","message":{"model":"m","usage":{"input_tokens":1000,"cache_creation_input_tokens":0,"cache_read_input_tokens":149000}}}
"#,
    )
    .unwrap();

    fx.clock.set_epoch_ms(5_000_000);
    let config = WatchdogConfig {
        transcripts_root: Some(transcripts),
        ..WatchdogConfig::default()
    };
    let watchdog = fx.watchdog(config);
    let status = watchdog.check_session(&SessionId::new("S7"), "").await.unwrap();

    // 150k of 200k → WARNING, and the task came from the transcript tail
    assert_eq!(status.status, BudgetStatus::Warning);
    assert_eq!(status.last_task, "finish the gc");

    let saved = ContextStore::new(fx.paths.clone())
        .load_budget(&SessionId::new("S7"))
        .unwrap();
    assert_eq!(saved.estimated_usage, 150_000);
    assert_eq!(saved.last_updated, 5_000_000);
}

#[tokio::test]
async fn restart_without_target_reports_missing_mapping() {
    let fx = Fixture::new();
    let now_ms = 3_600_000_000u64;
    fx.clock.set_epoch_ms(now_ms);
    fx.plant_budget("S", 10_000, now_ms - 25 * 60 * 1000);
    // An assignment marks unfinished work
    ContextStore::new(fx.paths.clone())
        .persist_assignment(&SessionId::new("S"), &serde_json::json!({"bead": "bd-9"}))
        .unwrap();

    let watchdog = fx.watchdog(WatchdogConfig::default());
    let status = watchdog.check_session(&SessionId::new("S"), "").await.unwrap();

    assert_eq!(status.action, SessionAction::RecoverDeadSession);
    assert!(status.restart_attempted);
    assert!(!status.restart_success);
    assert_eq!(status.restart_message, "missing tmux target mapping");
}

#[tokio::test]
async fn restart_with_target_nudges_the_session() {
    let fx = Fixture::new();
    let now_ms = 3_600_000_000u64;
    fx.clock.set_epoch_ms(now_ms);
    fx.plant_budget("S", 10_000, now_ms - 25 * 60 * 1000);
    ContextStore::new(fx.paths.clone())
        .persist_assignment(&SessionId::new("S"), &serde_json::json!({"bead": "bd-9"}))
        .unwrap();

    let watchdog = fx.watchdog(WatchdogConfig::default());
    let status = watchdog
        .check_session(&SessionId::new("S"), "ao-rpi-abc-p2")
        .await
        .unwrap();

    assert!(status.restart_attempted);
    assert!(status.restart_success, "got: {}", status.restart_message);
    assert!(fx
        .gateway
        .calls()
        .iter()
        .any(|c| c.contains("send-keys -t ao-rpi-abc-p2")));
}

#[tokio::test]
async fn check_all_sorts_by_severity() {
    let fx = Fixture::new();
    let now_ms = 3_600_000_000u64;
    fx.clock.set_epoch_ms(now_ms);
    fx.plant_budget("calm", 10_000, now_ms - 1000);
    fx.plant_budget("hot", 190_000, now_ms - 1000);

    let watchdog = fx.watchdog(WatchdogConfig::default());
    let statuses = watchdog
        .check_all(&[
            (SessionId::new("calm"), String::new()),
            (SessionId::new("hot"), String::new()),
        ])
        .await
        .unwrap();

    assert_eq!(statuses[0].session_id, "hot");
    assert_eq!(statuses[1].session_id, "calm");
}
