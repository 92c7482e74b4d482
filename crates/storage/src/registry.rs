// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run registry: one directory per run under `.agents/rpi/runs/`.
//!
//! Each run directory holds `state.json` (pretty-printed) and `heartbeat`
//! (empty, mtime is the liveness timestamp). Writes are atomic: temp file,
//! fsync, rename. Readers bracketing no writer always see one consistent
//! snapshot.

use ao_core::{Run, RpiPaths, RunId};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::time::SystemTime;
use thiserror::Error;
use tracing::warn;

/// Errors from registry operations
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Persistent store of run records for one repository.
#[derive(Debug, Clone)]
pub struct RunRegistry {
    paths: RpiPaths,
}

impl RunRegistry {
    pub fn new(repo_root: impl Into<std::path::PathBuf>) -> Self {
        Self {
            paths: RpiPaths::new(repo_root),
        }
    }

    pub fn from_paths(paths: RpiPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &RpiPaths {
        &self.paths
    }

    /// Write a record atomically (temp + fsync + rename).
    ///
    /// Creates the run directory and an initial heartbeat on first write.
    pub fn put(&self, run: &Run) -> Result<(), RegistryError> {
        let dir = self.paths.run_dir(&run.run_id);
        fs::create_dir_all(&dir)?;

        let state_path = self.paths.state_file(&run.run_id);
        let tmp_path = state_path.with_extension("json.tmp");
        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(serde_json::to_string_pretty(run)?.as_bytes())?;
            file.write_all(b"\n")?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &state_path)?;

        let heartbeat = self.paths.heartbeat_file(&run.run_id);
        if !heartbeat.exists() {
            fs::write(&heartbeat, b"")?;
        }
        Ok(())
    }

    /// Read one record. Missing or malformed entries read as `None`.
    pub fn get(&self, run_id: &RunId) -> Option<Run> {
        let state_path = self.paths.state_file(run_id);
        if state_path.exists() {
            return read_record(&state_path);
        }
        // Legacy flat layout, accepted only while the registry is empty
        if self.is_empty() {
            if let Some(run) = self.read_legacy() {
                if &run.run_id == run_id {
                    return Some(run);
                }
            }
        }
        None
    }

    /// Enumerate all records, skipping non-directories and malformed
    /// entries silently.
    pub fn list(&self) -> Vec<Run> {
        let mut runs = Vec::new();
        if let Ok(entries) = fs::read_dir(self.paths.runs_dir()) {
            for entry in entries.flatten() {
                let path = entry.path();
                if !path.is_dir() {
                    continue;
                }
                if let Some(run) = read_record(&path.join("state.json")) {
                    runs.push(run);
                }
            }
        }
        if runs.is_empty() {
            if let Some(legacy) = self.read_legacy() {
                runs.push(legacy);
            }
        }
        runs
    }

    /// Refresh the heartbeat mtime.
    pub fn touch(&self, run_id: &RunId) -> Result<(), RegistryError> {
        let path = self.paths.heartbeat_file(run_id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, b"")?;
        Ok(())
    }

    /// Heartbeat timestamp, if the run has one.
    pub fn heartbeat_mtime(&self, run_id: &RunId) -> Option<SystemTime> {
        fs::metadata(self.paths.heartbeat_file(run_id))
            .and_then(|m| m.modified())
            .ok()
    }

    /// Remove the run directory. Missing entries are fine.
    pub fn delete(&self, run_id: &RunId) -> Result<(), RegistryError> {
        let dir = self.paths.run_dir(run_id);
        match fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn is_empty(&self) -> bool {
        fs::read_dir(self.paths.runs_dir())
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(true)
    }

    fn read_legacy(&self) -> Option<Run> {
        read_record(&self.paths.legacy_state_file())
    }
}

fn read_record(path: &Path) -> Option<Run> {
    let content = fs::read_to_string(path).ok()?;
    match serde_json::from_str(&content) {
        Ok(run) => Some(run),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "skipping malformed run record");
            None
        }
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
