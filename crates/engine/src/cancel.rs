// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run cancellation: kill everything, clean everything, twice if asked.
//!
//! Cancellation finds the run's processes (command lines mentioning the
//! worktree, plus descendants of the orchestrator PID), escalates SIGTERM
//! to SIGKILL, releases the supervisor lease, kills the tmux sessions,
//! removes the worktree, and deletes the registry entry and pending
//! handoff markers. Every step tolerates absence, so cancelling an
//! already-clean run is a no-op.

use crate::error::EngineError;
use crate::worktree::WorktreeManager;
use ao_adapters::{ProcessGateway, ProcessTree, TmuxProbe};
use ao_core::{RpiPaths, Run, SessionId};
use ao_storage::{HandoffStore, Lease, RunRegistry};
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

/// Grace period between SIGTERM and SIGKILL.
const KILL_GRACE: Duration = Duration::from_millis(500);

/// What a cancellation actually did.
#[derive(Debug, Clone, Default)]
pub struct CancelOutcome {
    pub killed_pids: Vec<u32>,
    pub lease_released: bool,
    pub worktree_removed: bool,
    pub registry_deleted: bool,
    pub markers_deleted: usize,
}

/// Terminates runs and reclaims their resources.
pub struct Cancellation<G, P> {
    gateway: G,
    process_tree: P,
    tmux_command: String,
}

impl<G: ProcessGateway, P: ProcessTree> Cancellation<G, P> {
    pub fn new(gateway: G, process_tree: P, tmux_command: impl Into<String>) -> Self {
        Self {
            gateway,
            process_tree,
            tmux_command: tmux_command.into(),
        }
    }

    /// Cancel one run found at `root` (the registry root that owns it).
    pub async fn cancel(&self, root: &Path, run: &Run) -> Result<CancelOutcome, EngineError> {
        let mut outcome = CancelOutcome::default();
        let registry = RunRegistry::new(root);
        let paths = RpiPaths::new(root);

        // 1. Kill the run's process tree, SIGTERM then SIGKILL
        let pids = self.collect_pids(run);
        for pid in &pids {
            self.process_tree.terminate(*pid);
        }
        if !pids.is_empty() {
            tokio::time::sleep(KILL_GRACE).await;
            for pid in &pids {
                if self.process_tree.pid_alive(*pid) {
                    self.process_tree.kill_hard(*pid);
                }
            }
        }
        outcome.killed_pids = pids;

        // 2. Release the supervisor lease if this run owns it
        outcome.lease_released = self.release_owned_lease(&paths, run);
        if let Some(worktree) = run.worktree_path.as_deref() {
            // Leases live in the worktree too; same ownership rule
            self.release_owned_lease(&RpiPaths::new(worktree), run);
        }

        // 3. Kill the run's tmux sessions
        let probe = TmuxProbe::new(self.gateway.clone(), self.tmux_command.clone());
        probe.kill_run_sessions(&run.run_id).await;

        // 4. Remove the worktree
        let manager = WorktreeManager::new(self.gateway.clone(), root);
        let worktree_existed = run
            .worktree_path
            .as_deref()
            .map(Path::exists)
            .unwrap_or(false);
        manager.remove(&run.run_id).await?;
        outcome.worktree_removed = worktree_existed;

        // 5. Delete the registry entry and any pending handoff markers
        outcome.registry_deleted = registry.get(&run.run_id).is_some();
        registry.delete(&run.run_id)?;
        outcome.markers_deleted = HandoffStore::new(&paths)
            .delete_for_session(&SessionId::new(run.run_id.as_str()));

        tracing::info!(
            run_id = %run.run_id,
            killed = outcome.killed_pids.len(),
            "run cancelled"
        );
        Ok(outcome)
    }

    /// PIDs attributable to the run: worktree mentions plus orchestrator
    /// descendants. PID 0, PID 1, and the canceller itself are never
    /// touched.
    fn collect_pids(&self, run: &Run) -> Vec<u32> {
        let mut pids: BTreeSet<u32> = BTreeSet::new();

        if let Some(worktree) = run.worktree_path.as_deref() {
            let needle = worktree.to_string_lossy();
            pids.extend(self.process_tree.find_by_cmdline(&needle));
        }
        if let Some(orchestrator) = run.orchestrator_pid {
            pids.extend(self.process_tree.descendants(orchestrator));
            pids.insert(orchestrator);
        }

        let own = std::process::id();
        pids.into_iter()
            .filter(|&pid| pid > 1 && pid != own)
            .filter(|&pid| self.process_tree.pid_alive(pid))
            .collect()
    }

    /// Unlink the supervisor lease iff its metadata names this run.
    fn release_owned_lease(&self, paths: &RpiPaths, run: &Run) -> bool {
        let lock = paths.supervisor_lock();
        match Lease::read_meta(&lock) {
            Some(meta) if meta.run_id == run.run_id => std::fs::remove_file(&lock).is_ok(),
            _ => false,
        }
    }
}

#[cfg(test)]
#[path = "cancel_tests.rs"]
mod tests;
