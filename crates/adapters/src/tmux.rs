// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded-timeout tmux probing.
//!
//! Each run owns up to three sessions, one per phase, named
//! `ao-rpi-<run_id>-p<N>`. Probes are individually bounded so a wedged tmux
//! server cannot stall discovery.

use crate::gateway::ProcessGateway;
use ao_core::RunId;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Prefix shared by every orchestrator-owned session.
pub const SESSION_PREFIX: &str = "ao-rpi-";

/// Per-probe deadline.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Session name for one phase of a run.
pub fn session_name(run_id: &RunId, phase_number: u8) -> String {
    format!("{}{}-p{}", SESSION_PREFIX, run_id, phase_number)
}

/// Parse `ao-rpi-<id>-p<N>` into its run ID and phase number.
///
/// Returns `None` for sessions outside the orchestrator's namespace.
pub fn parse_session_name(name: &str) -> Option<(RunId, u8)> {
    let rest = name.strip_prefix(SESSION_PREFIX)?;
    let (id, phase) = rest.rsplit_once("-p")?;
    let phase: u8 = phase.parse().ok()?;
    if !(1..=3).contains(&phase) || id.is_empty() {
        return None;
    }
    Some((RunId::new(id), phase))
}

/// A live session reported by `tmux list-sessions`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TmuxSessionInfo {
    pub name: String,
    pub run_id: RunId,
    /// Epoch seconds from `#{session_created}`.
    pub created_at: u64,
}

/// Bounded-timeout queries against the tmux server.
#[derive(Clone)]
pub struct TmuxProbe<G> {
    gateway: G,
    tmux_command: String,
    cwd: PathBuf,
}

impl<G: ProcessGateway> TmuxProbe<G> {
    pub fn new(gateway: G, tmux_command: impl Into<String>) -> Self {
        Self {
            gateway,
            tmux_command: tmux_command.into(),
            cwd: std::env::temp_dir(),
        }
    }

    /// Probe all three expected sessions; alive on any hit.
    ///
    /// Probe errors (no server, timeout) read as "not found".
    pub async fn is_alive(&self, run_id: &RunId) -> bool {
        for phase in 1..=3u8 {
            if self.has_session(&session_name(run_id, phase)).await {
                return true;
            }
        }
        false
    }

    async fn has_session(&self, name: &str) -> bool {
        let target = format!("={}", name);
        self.gateway
            .run(
                PROBE_TIMEOUT,
                &self.cwd,
                &self.tmux_command,
                &["has-session", "-t", &target],
            )
            .await
            .is_ok()
    }

    /// Enumerate orchestrator-owned sessions.
    pub async fn list(&self) -> Vec<TmuxSessionInfo> {
        let output = match self
            .gateway
            .run_capture(
                PROBE_TIMEOUT,
                &self.cwd,
                &self.tmux_command,
                &["list-sessions", "-F", "#{session_name}\t#{session_created}"],
            )
            .await
        {
            Ok(out) => out,
            // No server running is the common case, not an error
            Err(_) => return Vec::new(),
        };

        parse_session_list(&output)
    }

    /// Kill every session belonging to a run. Best-effort: missing sessions
    /// are fine.
    pub async fn kill_run_sessions(&self, run_id: &RunId) {
        for phase in 1..=3u8 {
            let name = session_name(run_id, phase);
            let target = format!("={}", name);
            if let Err(e) = self
                .gateway
                .run(
                    PROBE_TIMEOUT,
                    &self.cwd,
                    &self.tmux_command,
                    &["kill-session", "-t", &target],
                )
                .await
            {
                tracing::debug!(session = %name, error = %e, "kill-session skipped");
            }
        }
    }

    /// Run probes from a specific directory instead of the default.
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = cwd.into();
        self
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }
}

/// Parse `list-sessions` output, retaining only `ao-rpi-<id>-p[1-3]` names.
fn parse_session_list(output: &str) -> Vec<TmuxSessionInfo> {
    output
        .lines()
        .filter_map(|line| {
            let (name, created) = line.split_once('\t')?;
            let (run_id, _phase) = parse_session_name(name)?;
            Some(TmuxSessionInfo {
                name: name.to_string(),
                run_id,
                created_at: created.trim().parse().unwrap_or(0),
            })
        })
        .collect()
}

#[cfg(test)]
#[path = "tmux_tests.rs"]
mod tests;
