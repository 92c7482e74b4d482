// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run records: one unit of autonomous work through the three phases.
//!
//! A `Run` is the registry's unit of persistence. Exactly one record exists
//! per run ID; the owning phase engine is the only writer while the run is
//! active. A run is either in a non-terminal phase or carries a non-empty
//! terminal status, never both.

use crate::id::{EpicId, RunId};
use crate::phase::{Phase, Verdict};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Current schema version written to new records.
pub const RUN_SCHEMA_VERSION: u32 = 2;

/// Goal complexity classification driving fast-path selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    /// Trivial goal: reduced ceremony, swarm-first subsystems skipped.
    Fast,
    #[default]
    Standard,
    Full,
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Complexity::Fast => write!(f, "fast"),
            Complexity::Standard => write!(f, "standard"),
            Complexity::Full => write!(f, "full"),
        }
    }
}

/// Goals shorter than this are trivially fast-path.
const FAST_GOAL_LEN: usize = 20;
/// Goals with fewer distinct words than this are lexically trivial.
const FAST_DISTINCT_WORDS: usize = 4;
/// Upper bound for standard complexity; anything longer is full.
const STANDARD_GOAL_LEN: usize = 120;

/// Classify a goal by length and lexical complexity.
pub fn classify_complexity(goal: &str) -> Complexity {
    let trimmed = goal.trim();
    let distinct: std::collections::BTreeSet<&str> = trimmed.split_whitespace().collect();
    if trimmed.len() < FAST_GOAL_LEN || distinct.len() < FAST_DISTINCT_WORDS {
        Complexity::Fast
    } else if trimmed.len() < STANDARD_GOAL_LEN {
        Complexity::Standard
    } else {
        Complexity::Full
    }
}

/// Options snapshot taken when the run is created.
///
/// Resume reconstructs the exact behavior from this snapshot rather than
/// from the current environment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunOptions {
    #[serde(default)]
    pub fast_path: bool,
    #[serde(default)]
    pub test_first: bool,
    #[serde(default)]
    pub swarm_first: bool,
    #[serde(default)]
    pub complexity: Complexity,
    /// Per-tool command snapshot (runtime, ao, bd, tmux).
    #[serde(default)]
    pub runtime_command: String,
    #[serde(default)]
    pub ao_command: String,
    #[serde(default)]
    pub bd_command: String,
    #[serde(default)]
    pub tmux_command: String,
}

/// Invariant violations detected by [`Run::validate`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RunInvariantError {
    #[error("terminal status {status:?} set without terminated_at")]
    TerminalWithoutTimestamp { status: String },
    #[error("terminated_at {at:?} set without terminal status")]
    TimestampWithoutTerminal { at: String },
    #[error("current phase {phase} precedes start phase {start_phase}")]
    PhaseBeforeStart { phase: Phase, start_phase: Phase },
}

/// One unit of autonomous work, persisted as `runs/<id>/state.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub run_id: RunId,
    pub schema_version: u32,
    pub goal: String,
    /// Current phase. Never decreases during normal execution; only resume
    /// with an explicit start-phase override may move it backwards.
    pub phase: Phase,
    pub start_phase: Phase,
    /// Supervisor cycle counter.
    #[serde(default)]
    pub cycle: u32,
    pub epic_id: EpicId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worktree_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orchestrator_pid: Option<u32>,
    /// Verdicts keyed by artifact name (`pre_mortem`, `vibe`, `post_mortem`).
    #[serde(default)]
    pub verdicts: BTreeMap<String, Verdict>,
    /// Attempt counters keyed by phase name.
    #[serde(default)]
    pub attempts: BTreeMap<String, u32>,
    /// RFC 3339; empty string while unset.
    #[serde(default)]
    pub started_at: String,
    #[serde(default)]
    pub terminated_at: String,
    /// Empty while the run is active; `completed`/`failed`/`cancelled` after.
    #[serde(default)]
    pub terminal_status: String,
    #[serde(default)]
    pub terminal_reason: String,
    #[serde(default)]
    pub options: RunOptions,
}

impl Run {
    /// Create a fresh record at the requested start phase.
    pub fn new(run_id: RunId, goal: impl Into<String>, start_phase: Phase) -> Self {
        let goal = goal.into();
        let complexity = classify_complexity(&goal);
        let epic_id = EpicId::new(format!("epic-{}", run_id.as_str()));
        Self {
            run_id,
            schema_version: RUN_SCHEMA_VERSION,
            goal,
            phase: start_phase,
            start_phase,
            cycle: 0,
            epic_id,
            worktree_path: None,
            orchestrator_pid: None,
            verdicts: BTreeMap::new(),
            attempts: BTreeMap::new(),
            started_at: String::new(),
            terminated_at: String::new(),
            terminal_status: String::new(),
            terminal_reason: String::new(),
            options: RunOptions {
                fast_path: complexity == Complexity::Fast,
                complexity,
                ..RunOptions::default()
            },
        }
    }

    /// Whether the run has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        !self.terminal_status.is_empty()
    }

    /// Record a verdict under the phase's fixed artifact key.
    pub fn record_verdict(&mut self, phase: Phase, verdict: Verdict) {
        self.verdicts.insert(phase.verdict_key().to_string(), verdict);
    }

    /// Increment and return the attempt count for a phase.
    pub fn bump_attempt(&mut self, phase: Phase) -> u32 {
        let count = self.attempts.entry(phase.name().to_string()).or_insert(0);
        *count += 1;
        *count
    }

    pub fn attempt(&self, phase: Phase) -> u32 {
        self.attempts.get(phase.name()).copied().unwrap_or(0)
    }

    /// Write the terminal triple. `terminated_at` is the caller's RFC 3339 now.
    pub fn finalize(&mut self, status: impl Into<String>, reason: impl Into<String>, at: impl Into<String>) {
        self.terminal_status = status.into();
        self.terminal_reason = reason.into();
        self.terminated_at = at.into();
    }

    /// Merge verdicts, attempts, and options from an existing record into a
    /// resume of the same run.
    pub fn merge_for_resume(&mut self, existing: &Run) {
        for (k, v) in &existing.verdicts {
            self.verdicts.entry(k.clone()).or_insert(*v);
        }
        for (k, v) in &existing.attempts {
            self.attempts.entry(k.clone()).or_insert(*v);
        }
        self.options = existing.options.clone();
        self.cycle = existing.cycle;
        self.epic_id = existing.epic_id.clone();
        self.started_at = existing.started_at.clone();
        if self.worktree_path.is_none() {
            self.worktree_path = existing.worktree_path.clone();
        }
    }

    /// Check record invariants.
    pub fn validate(&self) -> Result<(), RunInvariantError> {
        if !self.terminal_status.is_empty() && self.terminated_at.is_empty() {
            return Err(RunInvariantError::TerminalWithoutTimestamp {
                status: self.terminal_status.clone(),
            });
        }
        if self.terminal_status.is_empty() && !self.terminated_at.is_empty() {
            return Err(RunInvariantError::TimestampWithoutTerminal {
                at: self.terminated_at.clone(),
            });
        }
        if self.phase < self.start_phase {
            return Err(RunInvariantError::PhaseBeforeStart {
                phase: self.phase,
                start_phase: self.start_phase,
            });
        }
        Ok(())
    }
}

/// Builder for `Run` with test defaults.
#[cfg(any(test, feature = "test-support"))]
pub struct RunBuilder {
    run: Run,
}

#[cfg(any(test, feature = "test-support"))]
impl Default for RunBuilder {
    fn default() -> Self {
        Self {
            run: Run::new(RunId::new("abcdef0123"), "exercise the orchestrator end to end", Phase::Discovery),
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
impl RunBuilder {
    pub fn run_id(mut self, v: impl Into<String>) -> Self {
        self.run.run_id = RunId::new(v);
        self
    }
    pub fn goal(mut self, v: impl Into<String>) -> Self {
        self.run.goal = v.into();
        self
    }
    pub fn phase(mut self, v: Phase) -> Self {
        self.run.phase = v;
        self
    }
    pub fn start_phase(mut self, v: Phase) -> Self {
        self.run.start_phase = v;
        self
    }
    pub fn worktree_path(mut self, v: impl Into<PathBuf>) -> Self {
        self.run.worktree_path = Some(v.into());
        self
    }
    pub fn orchestrator_pid(mut self, v: u32) -> Self {
        self.run.orchestrator_pid = Some(v);
        self
    }
    pub fn terminal(mut self, status: &str, reason: &str, at: &str) -> Self {
        self.run.finalize(status, reason, at);
        self
    }
    pub fn build(self) -> Run {
        self.run
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Run {
    /// Create a builder with test defaults.
    pub fn builder() -> RunBuilder {
        RunBuilder::default()
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
