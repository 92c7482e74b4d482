// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use tempfile::TempDir;

fn stores() -> (TempDir, HandoffStore, ContextStore) {
    let dir = TempDir::new().unwrap();
    let paths = RpiPaths::new(dir.path());
    (
        dir,
        HandoffStore::new(&paths),
        ContextStore::new(paths),
    )
}

fn marker(sid: &str) -> HandoffMarker {
    HandoffMarker {
        session_id: SessionId::new(sid),
        handoff_file: PathBuf::from(format!("/tmp/handoff-{sid}.md")),
        consumed: false,
    }
}

#[test]
fn write_then_list_pending() {
    let (_dir, handoffs, _) = stores();
    handoffs.write_pending(&marker("S1")).unwrap();
    handoffs.write_pending(&marker("S2")).unwrap();

    let pending = handoffs.list_pending();
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0].1.session_id, "S1");
    assert!(!pending[0].1.consumed);
}

#[test]
fn consume_is_one_way() {
    let (_dir, handoffs, _) = stores();
    let path = handoffs.write_pending(&marker("S1")).unwrap();

    handoffs.consume(&path).unwrap();
    let (_, consumed) = &handoffs.list_pending()[0];
    assert!(consumed.consumed);

    // Consuming again keeps it consumed
    handoffs.consume(&path).unwrap();
    assert!(handoffs.list_pending()[0].1.consumed);
}

#[test]
fn delete_for_session_removes_only_that_session() {
    let (_dir, handoffs, _) = stores();
    handoffs.write_pending(&marker("S1")).unwrap();
    handoffs.write_pending(&marker("S2")).unwrap();

    assert_eq!(handoffs.delete_for_session(&SessionId::new("S1")), 1);
    let remaining = handoffs.list_pending();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].1.session_id, "S2");

    // Nothing left for S1
    assert_eq!(handoffs.delete_for_session(&SessionId::new("S1")), 0);
}

#[test]
fn budget_round_trips() {
    let (_dir, _, context) = stores();
    let mut tracker = BudgetTracker::new(SessionId::new("S1"));
    tracker.estimated_usage = 123_456;
    tracker.last_updated = 42;

    context.save_budget(&tracker).unwrap();
    assert_eq!(context.load_budget(&SessionId::new("S1")).unwrap(), tracker);
    assert_eq!(context.tracked_sessions(), vec![SessionId::new("S1")]);
}

#[test]
fn missing_budget_is_none() {
    let (_dir, _, context) = stores();
    assert!(context.load_budget(&SessionId::new("nope")).is_none());
    assert!(context.tracked_sessions().is_empty());
}

#[test]
fn empty_assignment_is_a_noop() {
    let (dir, _, context) = stores();
    let sid = SessionId::new("S1");

    for empty in [json!(null), json!(""), json!({}), json!([])] {
        context.persist_assignment(&sid, &empty).unwrap();
    }
    assert!(!dir
        .path()
        .join(".agents/ao/context/assignment-S1.json")
        .exists());

    context
        .persist_assignment(&sid, &json!({"bead": "bd-7", "task": "wire the gc"}))
        .unwrap();
    let loaded = context.load_assignment(&sid).unwrap();
    assert_eq!(loaded["bead"], "bd-7");
}
