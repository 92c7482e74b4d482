// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The landing sequence: scoped commit, then fetch + rebase + push.
//!
//! Landing only ever stages files this run created or modified. The scope
//! is the set of paths already dirty when the cycle started; those stay
//! untouched so a dirty baseline in the repo is preserved unchanged. Any
//! sync failure runs deterministic state recovery (`git rebase --abort`,
//! then `git status -sb`) before surfacing the error.

use crate::error::EngineError;
use ao_adapters::ProcessGateway;
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

/// Paths that were already dirty at cycle start.
#[derive(Debug, Clone, Default)]
pub struct LandingScope {
    baseline: BTreeSet<String>,
}

impl LandingScope {
    pub fn baseline(&self) -> &BTreeSet<String> {
        &self.baseline
    }

    /// Whether a path belongs to the pre-existing dirty baseline.
    pub fn in_baseline(&self, path: &str) -> bool {
        self.baseline.contains(path)
    }
}

/// Parse paths from `git status --porcelain` output.
fn porcelain_paths(output: &str) -> BTreeSet<String> {
    output
        .lines()
        .filter_map(|line| line.get(3..))
        .map(|p| {
            // Renames read as "old -> new"; the new path is what changed
            match p.split_once(" -> ") {
                Some((_, new)) => new.to_string(),
                None => p.to_string(),
            }
        })
        .filter(|p| !p.is_empty())
        .collect()
}

/// Render the landing commit message from its template.
pub fn render_commit_message(template: &str, cycle: u32, attempt: u32, goal: &str) -> String {
    template
        .replace("{{cycle}}", &cycle.to_string())
        .replace("{{attempt}}", &attempt.to_string())
        .replace("{{goal}}", goal)
}

/// Runs the commit/fetch/rebase/push sequence inside one worktree.
#[derive(Clone)]
pub struct LandingCoordinator<G> {
    gateway: G,
    timeout: Duration,
}

impl<G: ProcessGateway> LandingCoordinator<G> {
    pub fn new(gateway: G, timeout: Duration) -> Self {
        Self { gateway, timeout }
    }

    /// Snapshot the dirty set at cycle start.
    pub async fn capture_scope(&self, dir: &Path) -> Result<LandingScope, EngineError> {
        let output = self
            .gateway
            .run_capture(self.timeout, dir, "git", &["status", "--porcelain"])
            .await?;
        Ok(LandingScope {
            baseline: porcelain_paths(&output),
        })
    }

    /// Stage and commit files changed since the scope was captured.
    ///
    /// Returns `false` when nothing attributable to this run changed.
    pub async fn commit_if_dirty(
        &self,
        dir: &Path,
        scope: &LandingScope,
        message: &str,
    ) -> Result<bool, EngineError> {
        let output = self
            .gateway
            .run_capture(self.timeout, dir, "git", &["status", "--porcelain"])
            .await?;
        let run_paths: Vec<String> = porcelain_paths(&output)
            .into_iter()
            .filter(|p| !scope.in_baseline(p))
            .collect();

        if run_paths.is_empty() {
            tracing::debug!("nothing to land");
            return Ok(false);
        }

        let mut add_args = vec!["add", "--"];
        add_args.extend(run_paths.iter().map(String::as_str));
        self.gateway.run(self.timeout, dir, "git", &add_args).await?;

        self.gateway
            .run(self.timeout, dir, "git", &["commit", "-m", message])
            .await?;
        tracing::info!(files = run_paths.len(), "landed commit");
        Ok(true)
    }

    /// Fetch, rebase onto origin, and push.
    ///
    /// On any failure the worktree is recovered to a known state and the
    /// returned error says so.
    pub async fn sync_push(&self, dir: &Path, branch: &str) -> Result<(), EngineError> {
        if let Err(e) = self
            .gateway
            .run(self.timeout, dir, "git", &["fetch", "origin", branch])
            .await
        {
            return self.recover(dir, format!("landing fetch failed: {}", e)).await;
        }

        let upstream = format!("origin/{}", branch);
        if let Err(e) = self
            .gateway
            .run(self.timeout, dir, "git", &["rebase", &upstream])
            .await
        {
            return self
                .recover(dir, format!("landing rebase failed: {}", e))
                .await;
        }

        if let Err(e) = self.gateway.run(self.timeout, dir, "git", &["push"]).await {
            return self.recover(dir, format!("landing push failed: {}", e)).await;
        }

        Ok(())
    }

    /// Deterministic state recovery: abort any in-progress rebase (ignoring
    /// "no rebase in progress"), then leave `git status -sb` in the log.
    async fn recover(&self, dir: &Path, cause: String) -> Result<(), EngineError> {
        if let Err(e) = self
            .gateway
            .run(self.timeout, dir, "git", &["rebase", "--abort"])
            .await
        {
            if !e.to_string().contains("no rebase in progress") {
                tracing::warn!(error = %e, "rebase --abort failed during recovery");
            }
        }

        match self
            .gateway
            .run_capture(self.timeout, dir, "git", &["status", "-sb"])
            .await
        {
            Ok(status) => tracing::info!(status = %status.trim(), "tree state after recovery"),
            Err(e) => tracing::warn!(error = %e, "status check failed during recovery"),
        }

        Err(EngineError::Landing(format!("{}; state recovered", cause)))
    }
}

#[cfg(test)]
#[path = "landing_tests.rs"]
mod tests;
