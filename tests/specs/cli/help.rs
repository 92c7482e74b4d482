//! Help output specs.

use crate::prelude::*;

#[test]
fn top_level_help_lists_subcommands() {
    let dir = tempfile::tempdir().unwrap();
    let output = ao(dir.path(), &["--help"]);
    assert!(output.status.success());

    let stdout = stdout_of(&output);
    for subcommand in ["init", "status", "cancel", "resume", "worktree", "supervise"] {
        assert!(stdout.contains(subcommand), "help missing {subcommand}");
    }
}

#[test]
fn supervise_help_documents_policies() {
    let dir = tempfile::tempdir().unwrap();
    let output = ao(dir.path(), &["supervise", "--help"]);
    assert!(output.status.success());

    let stdout = stdout_of(&output);
    for flag in [
        "--goal",
        "--failure-policy",
        "--landing-policy",
        "--bd-sync-policy",
        "--gate-policy",
        "--kill-switch-path",
        "--command-timeout",
        "--lease",
    ] {
        assert!(stdout.contains(flag), "supervise help missing {flag}");
    }
}

#[test]
fn version_flag_works() {
    let dir = tempfile::tempdir().unwrap();
    let output = ao(dir.path(), &["--version"]);
    assert!(output.status.success());
    assert!(stdout_of(&output).contains("ao"));
}
