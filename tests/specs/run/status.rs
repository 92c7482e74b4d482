//! `ao status` specs.

use crate::prelude::*;

#[test]
fn empty_repo_reports_no_runs() {
    let dir = tempfile::tempdir().unwrap();
    let output = ao(dir.path(), &["status"]);
    assert!(output.status.success());
    assert!(stdout_of(&output).contains("no runs found"));
}

#[test]
fn json_output_has_active_and_historical_arrays() {
    let dir = tempfile::tempdir().unwrap();
    let output = ao(dir.path(), &["status", "-o", "json"]);
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_str(&stdout_of(&output)).unwrap();
    assert!(json["active"].as_array().unwrap().is_empty());
    assert!(json["historical"].as_array().unwrap().is_empty());
}

#[test]
fn fresh_run_is_listed_as_active() {
    let dir = tempfile::tempdir().unwrap();
    plant_run_record(dir.path(), "abcdef0123", "implementation");

    let output = ao(dir.path(), &["status", "-o", "json"]);
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_str(&stdout_of(&output)).unwrap();
    let active = json["active"].as_array().unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0]["run_id"], "abcdef0123");
    assert_eq!(active[0]["phase"], 2);
}

#[test]
fn text_output_truncates_long_goals() {
    let dir = tempfile::tempdir().unwrap();
    plant_run_record(dir.path(), "abcdef0123", "discovery");

    let output = ao(dir.path(), &["status"]);
    assert!(output.status.success());
    let stdout = stdout_of(&output);
    assert!(stdout.contains("ACTIVE"));
    assert!(stdout.contains("abcdef0123"));
}
