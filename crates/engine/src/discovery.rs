// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Multi-worktree run discovery.
//!
//! Discovery scans the run registry of the current checkout plus every git
//! worktree root, dedupes by run ID (first root wins), and classifies each
//! record as active or historical via the liveness ladder.

use crate::worktree::WorktreeManager;
use ao_adapters::{ProcessGateway, TmuxProbe};
use ao_core::{Clock, Phase, Run, RunId};
use ao_storage::{determine_liveness, heartbeat_age, heartbeat_fresh, RunRegistry};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// One discovered run with its classification.
#[derive(Debug, Clone)]
pub struct DiscoveredRun {
    pub run: Run,
    /// Root whose registry the record came from.
    pub root: PathBuf,
    pub alive: bool,
    /// Derived status string for historical runs.
    pub status: String,
}

/// Status string for a run that is not alive.
///
/// Terminal status wins; otherwise a run past the final phase reads as
/// completed, a run whose worktree vanished as stale, anything else as
/// unknown.
pub fn classify_run_status(run: &Run, worktree_missing: bool) -> String {
    if !run.terminal_status.is_empty() {
        return run.terminal_status.clone();
    }
    if run.phase >= Phase::FINAL {
        return "completed".to_string();
    }
    if worktree_missing {
        return "stale".to_string();
    }
    "unknown".to_string()
}

/// Scans registries across worktrees and classifies runs.
pub struct DiscoveryService<G, C> {
    gateway: G,
    clock: C,
    tmux_command: String,
}

impl<G: ProcessGateway, C: Clock> DiscoveryService<G, C> {
    pub fn new(gateway: G, clock: C, tmux_command: impl Into<String>) -> Self {
        Self {
            gateway,
            clock,
            tmux_command: tmux_command.into(),
        }
    }

    /// Discover `(active, historical)` runs reachable from `cwd`.
    pub async fn discover(&self, cwd: &Path) -> (Vec<DiscoveredRun>, Vec<DiscoveredRun>) {
        let probe = TmuxProbe::new(self.gateway.clone(), self.tmux_command.clone());
        let now = self.clock.wall();

        let mut seen: HashSet<RunId> = HashSet::new();
        let mut active = Vec::new();
        let mut historical = Vec::new();

        for root in self.search_roots(cwd).await {
            let registry = RunRegistry::new(&root);
            for run in registry.list() {
                if !seen.insert(run.run_id.clone()) {
                    continue;
                }

                let worktree_missing = run
                    .worktree_path
                    .as_deref()
                    .map(|p| !p.exists())
                    .unwrap_or(false);
                let age = registry
                    .heartbeat_mtime(&run.run_id)
                    .map(|mtime| heartbeat_age(mtime, now));

                // Probe tmux only when the cheap signals are inconclusive
                let tmux_alive = if worktree_missing || heartbeat_fresh(age) {
                    false
                } else {
                    probe.is_alive(&run.run_id).await
                };

                let alive = determine_liveness(worktree_missing, age, tmux_alive);
                let status = if alive {
                    "active".to_string()
                } else {
                    classify_run_status(&run, worktree_missing)
                };

                let discovered = DiscoveredRun {
                    run,
                    root: root.clone(),
                    alive,
                    status,
                };
                if alive {
                    active.push(discovered);
                } else {
                    historical.push(discovered);
                }
            }
        }

        (active, historical)
    }

    /// Locate an existing run record by ID across all search roots.
    pub async fn locate_run(&self, cwd: &Path, run_id: &RunId) -> Option<(PathBuf, Run)> {
        for root in self.search_roots(cwd).await {
            if let Some(run) = RunRegistry::new(&root).get(run_id) {
                return Some((root, run));
            }
        }
        None
    }

    /// cwd plus all git worktree roots; sibling glob as fallback.
    async fn search_roots(&self, cwd: &Path) -> Vec<PathBuf> {
        let manager = WorktreeManager::new(self.gateway.clone(), cwd);
        let mut roots = vec![cwd.to_path_buf()];
        for root in manager.worktree_roots().await {
            if !roots.contains(&root) {
                roots.push(root);
            }
        }
        roots
    }
}

#[cfg(test)]
#[path = "discovery_tests.rs"]
mod tests;
