//! `ao cancel` specs.

use crate::prelude::*;

#[test]
fn cancel_removes_the_registry_entry() {
    let dir = tempfile::tempdir().unwrap();
    plant_run_record(dir.path(), "abcdef0123", "implementation");

    let output = ao(dir.path(), &["cancel", "abcdef0123"]);
    assert!(
        output.status.success(),
        "stderr: {}",
        stderr_of(&output)
    );
    assert!(!dir.path().join(".agents/rpi/runs/abcdef0123").exists());
}

#[test]
fn second_cancel_succeeds_with_no_changes() {
    let dir = tempfile::tempdir().unwrap();
    plant_run_record(dir.path(), "abcdef0123", "implementation");

    assert!(ao(dir.path(), &["cancel", "abcdef0123"]).status.success());

    let second = ao(dir.path(), &["cancel", "abcdef0123"]);
    assert!(second.status.success());
    assert!(stdout_of(&second).contains("already clean"));
}

#[test]
fn cancel_all_on_empty_repo_is_fine() {
    let dir = tempfile::tempdir().unwrap();
    let output = ao(dir.path(), &["cancel", "--all"]);
    assert!(output.status.success());
}
