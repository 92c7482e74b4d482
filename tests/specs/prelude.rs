//! Test helpers for behavioral specifications.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::path::Path;
use std::process::{Command, Output};

/// Returns the path to the ao binary, checking llvm-cov target directories
/// first so coverage runs work too.
fn ao_binary() -> std::path::PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));

    let llvm_cov = manifest_dir.join("target/llvm-cov-target/debug/ao");
    if llvm_cov.exists() {
        return llvm_cov;
    }

    let standard = manifest_dir.join("target/debug/ao");
    if standard.exists() {
        return standard;
    }

    // Fallback: resolve relative to the test binary itself. The test
    // binary lives at target/debug/deps/specs-<hash>.
    if let Ok(exe) = std::env::current_exe() {
        if let Some(debug_dir) = exe.parent().and_then(|d| d.parent()) {
            let fallback = debug_dir.join("ao");
            if fallback.exists() {
                return fallback;
            }
        }
    }

    standard
}

/// Run `ao` with the given args in a working directory.
pub fn ao(dir: &Path, args: &[&str]) -> Output {
    Command::new(ao_binary())
        .args(args)
        .current_dir(dir)
        .env("AGENTOPS_RPI_TMUX_COMMAND", "false")
        .output()
        .expect("failed to run ao binary")
}

pub fn stdout_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

pub fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

/// Plant a minimal run record in a repo's registry.
pub fn plant_run_record(repo: &Path, run_id: &str, phase: &str) {
    let dir = repo.join(".agents/rpi/runs").join(run_id);
    std::fs::create_dir_all(&dir).unwrap();
    let state = serde_json::json!({
        "run_id": run_id,
        "schema_version": 2,
        "goal": "fix typo",
        "phase": phase,
        "start_phase": "discovery",
        "cycle": 1,
        "epic_id": format!("epic-{run_id}"),
        "verdicts": {},
        "attempts": {},
        "started_at": "2026-03-01T10:00:00Z",
        "terminated_at": "",
        "terminal_status": "",
        "terminal_reason": "",
        "options": {}
    });
    std::fs::write(
        dir.join("state.json"),
        serde_json::to_string_pretty(&state).unwrap(),
    )
    .unwrap();
    std::fs::write(dir.join("heartbeat"), b"").unwrap();
}
