// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-repo state layout under `.agents/`.
//!
//! Everything the orchestrator persists lives under three roots:
//! `.agents/rpi/` (run state, leases, logs), `.agents/ao/context/`
//! (budget/assignment files), and `.agents/handoff/pending/` (markers).

use crate::id::{RunId, SessionId};
use std::path::{Path, PathBuf};

/// Top-level state directory name, added to `.gitignore` by `ao init`.
pub const AGENTS_DIR: &str = ".agents";

/// Basename of the kill switch file.
pub const KILL_SWITCH_FILE: &str = "KILL";

/// Legacy flat state file accepted read-only at the repo root.
pub const LEGACY_STATE_FILE: &str = "phased-state.json";

/// Resolved state paths for one repository root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpiPaths {
    root: PathBuf,
}

impl RpiPaths {
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self { root: repo_root.into() }
    }

    pub fn repo_root(&self) -> &Path {
        &self.root
    }

    /// `.agents/rpi/`: orchestrator state.
    pub fn state_dir(&self) -> PathBuf {
        self.root.join(AGENTS_DIR).join("rpi")
    }

    pub fn runs_dir(&self) -> PathBuf {
        self.state_dir().join("runs")
    }

    pub fn run_dir(&self, run_id: &RunId) -> PathBuf {
        self.runs_dir().join(run_id.as_str())
    }

    pub fn state_file(&self, run_id: &RunId) -> PathBuf {
        self.run_dir(run_id).join("state.json")
    }

    pub fn heartbeat_file(&self, run_id: &RunId) -> PathBuf {
        self.run_dir(run_id).join("heartbeat")
    }

    pub fn supervisor_lock(&self) -> PathBuf {
        self.state_dir().join("supervisor.lock")
    }

    pub fn landing_lock(&self) -> PathBuf {
        self.state_dir().join("landing.lock")
    }

    pub fn kill_switch(&self) -> PathBuf {
        self.state_dir().join(KILL_SWITCH_FILE)
    }

    pub fn live_status(&self) -> PathBuf {
        self.state_dir().join("live-status.md")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.state_dir().join("logs")
    }

    pub fn legacy_state_file(&self) -> PathBuf {
        self.root.join(LEGACY_STATE_FILE)
    }

    /// `.agents/ao/context/`: watchdog budget and assignment files.
    pub fn context_dir(&self) -> PathBuf {
        self.root.join(AGENTS_DIR).join("ao").join("context")
    }

    pub fn budget_file(&self, session_id: &SessionId) -> PathBuf {
        self.context_dir().join(format!("budget-{}.json", session_id))
    }

    pub fn assignment_file(&self, session_id: &SessionId) -> PathBuf {
        self.context_dir()
            .join(format!("assignment-{}.json", session_id))
    }

    /// `.agents/handoff/pending/`: handoff markers awaiting consumption.
    pub fn handoff_pending_dir(&self) -> PathBuf {
        self.root.join(AGENTS_DIR).join("handoff").join("pending")
    }

    pub fn handoff_dir(&self) -> PathBuf {
        self.root.join(AGENTS_DIR).join("handoff")
    }
}

/// Sibling worktree directory for a run: `<repo-parent>/<repo>-rpi-<id>`.
pub fn worktree_path(repo_root: &Path, run_id: &RunId) -> PathBuf {
    let name = repo_root
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "repo".to_string());
    let parent = repo_root.parent().unwrap_or(repo_root);
    parent.join(format!("{}-rpi-{}", name, run_id))
}

/// Extract the run ID from a worktree basename, if it has the
/// `<repo>-rpi-<id>` shape.
pub fn run_id_from_worktree(path: &Path) -> Option<RunId> {
    let name = path.file_name()?.to_str()?;
    let (_, id) = name.rsplit_once("-rpi-")?;
    RunId::is_valid(id).then(|| RunId::new(id))
}

#[cfg(test)]
#[path = "paths_tests.rs"]
mod tests;
