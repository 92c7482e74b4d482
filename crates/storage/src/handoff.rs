// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handoff markers and watchdog context files.
//!
//! Markers under `.agents/handoff/pending/` are the only channel from the
//! watchdog to whatever resumes the work; consumption is a one-way
//! transition. Budget and assignment files live under
//! `.agents/ao/context/`.

use crate::registry::RegistryError;
use ao_core::{BudgetTracker, RpiPaths, SessionId};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// A pending handoff: the rendered markdown plus consumption state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoffMarker {
    pub session_id: SessionId,
    pub handoff_file: PathBuf,
    pub consumed: bool,
}

/// Store for handoff markers in the pending directory.
#[derive(Debug, Clone)]
pub struct HandoffStore {
    pending_dir: PathBuf,
}

impl HandoffStore {
    pub fn new(paths: &RpiPaths) -> Self {
        Self {
            pending_dir: paths.handoff_pending_dir(),
        }
    }

    pub fn pending_dir(&self) -> &Path {
        &self.pending_dir
    }

    fn marker_path(&self, session_id: &SessionId) -> PathBuf {
        self.pending_dir.join(format!("{}.json", session_id))
    }

    /// Drop a pending marker for a session, overwriting any previous one.
    pub fn write_pending(&self, marker: &HandoffMarker) -> Result<PathBuf, RegistryError> {
        fs::create_dir_all(&self.pending_dir)?;
        let path = self.marker_path(&marker.session_id);
        fs::write(&path, serde_json::to_string_pretty(marker)?)?;
        Ok(path)
    }

    /// All pending markers, malformed files skipped.
    pub fn list_pending(&self) -> Vec<(PathBuf, HandoffMarker)> {
        let mut markers = Vec::new();
        if let Ok(entries) = fs::read_dir(&self.pending_dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                if let Some(marker) = read_marker(&path) {
                    markers.push((path, marker));
                }
            }
        }
        markers.sort_by(|a, b| a.0.cmp(&b.0));
        markers
    }

    /// Consume a marker: one-way transition to `consumed = true`.
    pub fn consume(&self, path: &Path) -> Result<(), RegistryError> {
        let Some(mut marker) = read_marker(path) else {
            return Ok(());
        };
        if marker.consumed {
            return Ok(());
        }
        marker.consumed = true;
        fs::write(path, serde_json::to_string_pretty(&marker)?)?;
        Ok(())
    }

    /// Remove every marker for a session; returns how many were deleted.
    pub fn delete_for_session(&self, session_id: &SessionId) -> usize {
        let mut deleted = 0;
        for (path, marker) in self.list_pending() {
            if &marker.session_id == session_id && fs::remove_file(&path).is_ok() {
                deleted += 1;
            }
        }
        deleted
    }
}

fn read_marker(path: &Path) -> Option<HandoffMarker> {
    let content = fs::read_to_string(path).ok()?;
    serde_json::from_str(&content).ok()
}

/// Store for per-session budget and assignment files.
#[derive(Debug, Clone)]
pub struct ContextStore {
    paths: RpiPaths,
}

impl ContextStore {
    pub fn new(paths: RpiPaths) -> Self {
        Self { paths }
    }

    pub fn save_budget(&self, tracker: &BudgetTracker) -> Result<(), RegistryError> {
        let path = self.paths.budget_file(&tracker.session_id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, serde_json::to_string_pretty(tracker)?)?;
        Ok(())
    }

    pub fn load_budget(&self, session_id: &SessionId) -> Option<BudgetTracker> {
        let content = fs::read_to_string(self.paths.budget_file(session_id)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Session IDs that have a budget file.
    pub fn tracked_sessions(&self) -> Vec<SessionId> {
        let mut sessions = Vec::new();
        if let Ok(entries) = fs::read_dir(self.paths.context_dir()) {
            for entry in entries.flatten() {
                let name = entry.file_name().to_string_lossy().to_string();
                if let Some(sid) = name
                    .strip_prefix("budget-")
                    .and_then(|rest| rest.strip_suffix(".json"))
                {
                    sessions.push(SessionId::new(sid));
                }
            }
        }
        sessions.sort();
        sessions
    }

    /// Persist an assignment payload. An empty payload is a no-op.
    pub fn persist_assignment(
        &self,
        session_id: &SessionId,
        payload: &serde_json::Value,
    ) -> Result<(), RegistryError> {
        if assignment_is_empty(payload) {
            return Ok(());
        }
        let path = self.paths.assignment_file(session_id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, serde_json::to_string_pretty(payload)?)?;
        Ok(())
    }

    pub fn load_assignment(&self, session_id: &SessionId) -> Option<serde_json::Value> {
        let content = fs::read_to_string(self.paths.assignment_file(session_id)).ok()?;
        serde_json::from_str(&content).ok()
    }
}

fn assignment_is_empty(payload: &serde_json::Value) -> bool {
    match payload {
        serde_json::Value::Null => true,
        serde_json::Value::String(s) => s.is_empty(),
        serde_json::Value::Object(map) => map.is_empty(),
        serde_json::Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
#[path = "handoff_tests.rs"]
mod tests;
