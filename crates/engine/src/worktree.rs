// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sibling git worktrees, one per run.
//!
//! A run's worktree is `<repo-parent>/<repo>-rpi-<run_id>` on branch
//! `rpi/<run_id>`. Removal is best-effort: `git worktree remove --force`,
//! then a filesystem delete for remnants, then `git worktree prune`.

use crate::error::EngineError;
use ao_adapters::ProcessGateway;
use ao_core::paths::{run_id_from_worktree, worktree_path};
use ao_core::{RpiPaths, RunId};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Default timeout for git worktree operations.
const GIT_TIMEOUT: Duration = Duration::from_secs(60);

/// A worktree eligible for garbage collection.
#[derive(Debug, Clone)]
pub struct GcCandidate {
    pub path: PathBuf,
    pub run_id: RunId,
    pub age: Duration,
    pub dirty: bool,
}

/// Creates, inspects, and removes run worktrees.
#[derive(Clone)]
pub struct WorktreeManager<G> {
    gateway: G,
    repo_root: PathBuf,
}

impl<G: ProcessGateway> WorktreeManager<G> {
    pub fn new(gateway: G, repo_root: impl Into<PathBuf>) -> Self {
        Self {
            gateway,
            repo_root: repo_root.into(),
        }
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    /// Sibling directory this run's worktree occupies.
    pub fn path_for(&self, run_id: &RunId) -> PathBuf {
        worktree_path(&self.repo_root, run_id)
    }

    /// Create the worktree on a fresh `rpi/<run_id>` branch.
    pub async fn create(&self, run_id: &RunId) -> Result<PathBuf, EngineError> {
        let path = self.path_for(run_id);
        let path_str = path.to_string_lossy().to_string();
        let branch = format!("rpi/{}", run_id);
        self.gateway
            .run(
                GIT_TIMEOUT,
                &self.repo_root,
                "git",
                &["worktree", "add", &path_str, "-b", &branch],
            )
            .await?;
        Ok(path)
    }

    /// Remove a worktree and prune git's bookkeeping. Safe to call when the
    /// worktree is already gone.
    pub async fn remove(&self, run_id: &RunId) -> Result<(), EngineError> {
        let path = self.path_for(run_id);
        let path_str = path.to_string_lossy().to_string();

        // Best-effort: the worktree may be locked, dirty, or unregistered
        if let Err(e) = self
            .gateway
            .run(
                GIT_TIMEOUT,
                &self.repo_root,
                "git",
                &["worktree", "remove", "--force", &path_str],
            )
            .await
        {
            tracing::debug!(path = %path.display(), error = %e, "git worktree remove skipped");
        }

        if path.exists() {
            fs::remove_dir_all(&path)?;
        }

        self.prune().await;
        Ok(())
    }

    pub async fn prune(&self) {
        if let Err(e) = self
            .gateway
            .run(GIT_TIMEOUT, &self.repo_root, "git", &["worktree", "prune"])
            .await
        {
            tracing::debug!(error = %e, "git worktree prune skipped");
        }
    }

    /// Whether a worktree has uncommitted changes.
    pub async fn is_dirty(&self, path: &Path) -> Result<bool, EngineError> {
        let output = self
            .gateway
            .run_capture(GIT_TIMEOUT, path, "git", &["status", "--porcelain"])
            .await?;
        Ok(!output.trim().is_empty())
    }

    /// Newest of: the run's state.json, live-status.md, and the worktree
    /// directory itself.
    pub fn reference_time(&self, path: &Path) -> Option<SystemTime> {
        let rpi = RpiPaths::new(path);
        let mut candidates = vec![path.to_path_buf(), rpi.live_status()];
        if let Some(run_id) = run_id_from_worktree(path) {
            candidates.push(rpi.state_file(&run_id));
        }

        candidates
            .into_iter()
            .filter_map(|p| fs::metadata(p).and_then(|m| m.modified()).ok())
            .max()
    }

    /// Sibling worktrees eligible for GC.
    ///
    /// A candidate is stale for at least `stale_after`, not in the active
    /// set, and clean unless `include_dirty` is set.
    pub async fn gc_candidates(
        &self,
        now: SystemTime,
        stale_after: Duration,
        active: &HashSet<RunId>,
        include_dirty: bool,
    ) -> Vec<GcCandidate> {
        let mut candidates = Vec::new();
        for (path, run_id) in self.sibling_worktrees() {
            if active.contains(&run_id) {
                continue;
            }
            let age = self
                .reference_time(&path)
                .and_then(|t| now.duration_since(t).ok())
                .unwrap_or(Duration::ZERO);
            if age < stale_after {
                continue;
            }
            let dirty = self.is_dirty(&path).await.unwrap_or(true);
            if dirty && !include_dirty {
                continue;
            }
            candidates.push(GcCandidate {
                path,
                run_id,
                age,
                dirty,
            });
        }
        candidates.sort_by(|a, b| a.run_id.cmp(&b.run_id));
        candidates
    }

    /// All sibling directories matching `<repo>-rpi-<id>`.
    pub fn sibling_worktrees(&self) -> Vec<(PathBuf, RunId)> {
        let repo_name = match self.repo_root.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => return Vec::new(),
        };
        let parent = match self.repo_root.parent() {
            Some(p) => p,
            None => return Vec::new(),
        };
        let prefix = format!("{}-rpi-", repo_name);

        let mut found = Vec::new();
        if let Ok(entries) = fs::read_dir(parent) {
            for entry in entries.flatten() {
                let path = entry.path();
                if !path.is_dir() {
                    continue;
                }
                let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                if !name.starts_with(&prefix) {
                    continue;
                }
                if let Some(run_id) = run_id_from_worktree(&path) {
                    found.push((path, run_id));
                }
            }
        }
        found.sort();
        found
    }

    /// Roots reported by `git worktree list --porcelain`, falling back to
    /// the sibling glob when git is unavailable.
    pub async fn worktree_roots(&self) -> Vec<PathBuf> {
        match self
            .gateway
            .run_capture(
                GIT_TIMEOUT,
                &self.repo_root,
                "git",
                &["worktree", "list", "--porcelain"],
            )
            .await
        {
            Ok(output) => parse_worktree_list(&output),
            Err(e) => {
                tracing::debug!(error = %e, "worktree list failed; using sibling glob");
                self.sibling_worktrees()
                    .into_iter()
                    .map(|(path, _)| path)
                    .collect()
            }
        }
    }
}

/// Parse `worktree <path>` stanzas from porcelain output.
fn parse_worktree_list(output: &str) -> Vec<PathBuf> {
    output
        .lines()
        .filter_map(|line| line.strip_prefix("worktree "))
        .map(PathBuf::from)
        .collect()
}

#[cfg(test)]
#[path = "worktree_tests.rs"]
mod tests;
