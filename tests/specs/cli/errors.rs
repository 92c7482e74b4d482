//! CLI error-path specs.

use crate::prelude::*;

#[test]
fn unknown_subcommand_exits_nonzero() {
    let dir = tempfile::tempdir().unwrap();
    let output = ao(dir.path(), &["frobnicate"]);
    assert!(!output.status.success());
}

#[test]
fn supervise_requires_a_goal_or_run_id() {
    let dir = tempfile::tempdir().unwrap();
    let output = ao(dir.path(), &["supervise"]);
    assert!(!output.status.success());
    assert!(stderr_of(&output).contains("--goal"));
}

#[test]
fn bad_policy_value_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let output = ao(
        dir.path(),
        &["supervise", "--goal", "x", "--failure-policy", "sometimes"],
    );
    assert!(!output.status.success());
}

#[test]
fn bad_duration_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let output = ao(
        dir.path(),
        &["supervise", "--goal", "x", "--command-timeout", "10w"],
    );
    assert!(!output.status.success());
}

#[test]
fn cancel_requires_run_ids_or_all() {
    let dir = tempfile::tempdir().unwrap();
    let output = ao(dir.path(), &["cancel"]);
    assert!(!output.status.success());
}
