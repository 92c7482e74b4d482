// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Context-budget watchdog.
//!
//! Each pass refreshes per-session budgets from transcript tails,
//! classifies readiness, and emits handoff artifacts. The watchdog never
//! talks to the phase engine: pending handoff markers are the only
//! channel. It may nudge a stale tmux session back to life, but only when
//! a target mapping exists.

use crate::error::EngineError;
use crate::handoff::{render_handoff, HandoffContext};
use crate::transcript::{find_transcript, read_tail, TAIL_MAX_BYTES};
use ao_adapters::ProcessGateway;
use ao_core::budget::{
    compare_statuses, BudgetTracker, SessionAction, SessionStatus, DEFAULT_MAX_TOKENS,
    WATCHDOG_INTERVAL_SECS,
};
use ao_core::{Clock, RpiPaths, SessionId};
use ao_storage::{ContextStore, HandoffMarker, HandoffStore};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Timeout for the watchdog's own git/tmux calls.
const WATCHDOG_CMD_TIMEOUT: Duration = Duration::from_secs(10);

/// Watchdog tuning.
#[derive(Debug, Clone)]
pub struct WatchdogConfig {
    pub max_tokens: u64,
    pub interval_secs: u64,
    /// Where transcripts live; `None` disables transcript refresh.
    pub transcripts_root: Option<PathBuf>,
    /// Attempt to nudge stale sessions back to life.
    pub auto_restart: bool,
    pub tmux_command: String,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            interval_secs: WATCHDOG_INTERVAL_SECS,
            transcripts_root: None,
            auto_restart: true,
            tmux_command: "tmux".to_string(),
        }
    }
}

/// Default transcript location: `~/.claude/projects`, when it exists.
pub fn default_transcripts_root() -> Option<PathBuf> {
    let home = std::env::var_os("HOME")?;
    let root = PathBuf::from(home).join(".claude").join("projects");
    root.is_dir().then_some(root)
}

/// Per-repo context watchdog.
pub struct ContextWatchdog<G, C> {
    gateway: G,
    clock: C,
    paths: RpiPaths,
    context: ContextStore,
    handoffs: HandoffStore,
    config: WatchdogConfig,
}

impl<G: ProcessGateway, C: Clock> ContextWatchdog<G, C> {
    pub fn new(gateway: G, clock: C, paths: RpiPaths, config: WatchdogConfig) -> Self {
        let context = ContextStore::new(paths.clone());
        let handoffs = HandoffStore::new(&paths);
        Self {
            gateway,
            clock,
            paths,
            context,
            handoffs,
            config,
        }
    }

    /// Evaluate one session, refreshing its budget and emitting artifacts.
    pub async fn check_session(
        &self,
        session_id: &SessionId,
        tmux_target: &str,
    ) -> Result<SessionStatus, EngineError> {
        let now_ms = self.clock.epoch_ms();

        let mut tracker = self.context.load_budget(session_id).unwrap_or_else(|| {
            let mut t = BudgetTracker::new(session_id.clone());
            t.max_tokens = self.config.max_tokens;
            t
        });

        // Refresh from the newest transcript mentioning this session
        let mut tail = crate::transcript::TranscriptTail::default();
        if let Some(root) = &self.config.transcripts_root {
            if let Some(path) = find_transcript(root, session_id) {
                tail = read_tail(&path, TAIL_MAX_BYTES);
                tracker.observe(&tail.usage, now_ms);
            }
        }
        self.context.save_budget(&tracker)?;

        let has_unfinished_work = !tail.last_task.is_empty()
            || self.context.load_assignment(session_id).is_some();

        let mut status = SessionStatus::evaluate(
            &tracker,
            now_ms,
            self.config.interval_secs,
            has_unfinished_work,
        );
        status.last_task = tail.last_task.clone();
        status.tmux_target = tmux_target.to_string();

        match status.action {
            SessionAction::Continue => {}
            SessionAction::CheckpointAndPrepareHandoff => {
                // WARNING both logs the recommendation and drops a marker;
                // the marker stays advisory until consumed.
                tracing::info!(
                    session = %session_id,
                    usage = format!("{:.1}%", status.usage_percent * 100.0),
                    "checkpoint recommended"
                );
                self.emit_handoff(&mut status, &tail.usage).await?;
            }
            SessionAction::HandoffNow | SessionAction::RecoverDeadSession => {
                if status.action == SessionAction::RecoverDeadSession && self.config.auto_restart {
                    self.attempt_restart(&mut status).await;
                }
                self.emit_handoff(&mut status, &tail.usage).await?;
            }
        }

        Ok(status)
    }

    /// Evaluate many sessions and return them in severity order.
    pub async fn check_all(
        &self,
        sessions: &[(SessionId, String)],
    ) -> Result<Vec<SessionStatus>, EngineError> {
        let mut statuses = Vec::with_capacity(sessions.len());
        for (session_id, tmux_target) in sessions {
            statuses.push(self.check_session(session_id, tmux_target).await?);
        }
        statuses.sort_by(compare_statuses);
        Ok(statuses)
    }

    /// Sessions with budget files, for callers that track nothing else.
    pub fn tracked_sessions(&self) -> Vec<SessionId> {
        self.context.tracked_sessions()
    }

    async fn emit_handoff(
        &self,
        status: &mut SessionStatus,
        usage: &ao_core::budget::TranscriptUsage,
    ) -> Result<(), EngineError> {
        let ctx = HandoffContext {
            active_bead: self
                .context
                .load_assignment(&status.session_id)
                .and_then(|a| a.get("bead").and_then(|b| b.as_str()).map(String::from))
                .unwrap_or_default(),
            agent_identity: status.session_id.to_string(),
            modified_files: self.modified_files().await,
            usage: usage.clone(),
        };

        let doc = render_handoff(status, &ctx);
        let handoff_path = self
            .paths
            .handoff_dir()
            .join(format!("{}-handoff.md", status.session_id));
        if let Some(parent) = handoff_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&handoff_path, doc)?;

        self.handoffs.write_pending(&HandoffMarker {
            session_id: status.session_id.clone(),
            handoff_file: handoff_path,
            consumed: false,
        })?;
        Ok(())
    }

    /// Nudge a stale session. Requires a tmux target mapping.
    async fn attempt_restart(&self, status: &mut SessionStatus) {
        status.restart_attempted = true;
        if status.tmux_target.is_empty() {
            status.restart_success = false;
            status.restart_message = "missing tmux target mapping".to_string();
            return;
        }

        let nudge = "Session looks stalled. Pick up the pending task and continue.";
        let send = self
            .gateway
            .run(
                WATCHDOG_CMD_TIMEOUT,
                self.paths.repo_root(),
                &self.config.tmux_command,
                &["send-keys", "-t", &status.tmux_target, "-l", "--", nudge],
            )
            .await;
        let enter = match send {
            Ok(()) => {
                self.gateway
                    .run(
                        WATCHDOG_CMD_TIMEOUT,
                        self.paths.repo_root(),
                        &self.config.tmux_command,
                        &["send-keys", "-t", &status.tmux_target, "Enter"],
                    )
                    .await
            }
            Err(e) => Err(e),
        };

        match enter {
            Ok(()) => {
                status.restart_success = true;
                status.restart_message = format!("nudged {}", status.tmux_target);
            }
            Err(e) => {
                status.restart_success = false;
                status.restart_message = e.to_string();
            }
        }
    }

    async fn modified_files(&self) -> Vec<String> {
        let output = match self
            .gateway
            .run_capture(
                WATCHDOG_CMD_TIMEOUT,
                self.paths.repo_root(),
                "git",
                &["status", "--porcelain"],
            )
            .await
        {
            Ok(out) => out,
            Err(_) => return Vec::new(),
        };

        output
            .lines()
            .filter_map(|line| line.get(3..).map(str::to_string))
            .filter(|p| !p.is_empty())
            .collect()
    }
}

#[cfg(test)]
#[path = "watchdog_tests.rs"]
mod tests;
