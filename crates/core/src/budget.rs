// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Context-budget accounting and session readiness classification.
//!
//! The watchdog estimates how much of a session's context window is spent
//! from transcript usage records, classifies the session, and picks the
//! next action. All of the math lives here so it can be tested without
//! touching transcripts or tmux.

use crate::id::SessionId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Default context window budget per session.
pub const DEFAULT_MAX_TOKENS: u64 = 200_000;

/// Watchdog pass interval; sessions not updated within it are stale.
pub const WATCHDOG_INTERVAL_SECS: u64 = 20 * 60;

/// Usage fraction at which a session leaves OPTIMAL.
const WARNING_THRESHOLD: f64 = 0.70;
/// Usage fraction at which a session becomes CRITICAL.
const CRITICAL_THRESHOLD: f64 = 0.85;

/// Token usage parsed from the tail of a JSONL transcript.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscriptUsage {
    pub input_tokens: u64,
    pub cache_creation_tokens: u64,
    pub cache_read_tokens: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default)]
    pub timestamp: String,
}

impl TranscriptUsage {
    pub fn total(&self) -> u64 {
        self.input_tokens + self.cache_creation_tokens + self.cache_read_tokens
    }

    /// A zero total means "no usage found", not an error.
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Running token estimate for one session, persisted as `budget-<sid>.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetTracker {
    pub session_id: SessionId,
    pub max_tokens: u64,
    pub estimated_usage: u64,
    /// Epoch milliseconds of the last update; 0 means never updated.
    pub last_updated: u64,
}

impl BudgetTracker {
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            max_tokens: DEFAULT_MAX_TOKENS,
            estimated_usage: 0,
            last_updated: 0,
        }
    }

    /// Fraction of the budget spent, in `[0, 1]`.
    pub fn usage_fraction(&self) -> f64 {
        if self.max_tokens == 0 {
            return 0.0;
        }
        (self.estimated_usage as f64 / self.max_tokens as f64).clamp(0.0, 1.0)
    }

    /// Record a fresh usage observation.
    pub fn observe(&mut self, usage: &TranscriptUsage, now_ms: u64) {
        if usage.is_empty() {
            return;
        }
        self.estimated_usage = usage.total();
        self.last_updated = now_ms;
    }
}

/// Budget status thresholds: OPTIMAL < 0.70 ≤ WARNING < 0.85 ≤ CRITICAL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BudgetStatus {
    Optimal,
    Warning,
    Critical,
}

impl BudgetStatus {
    /// Severity rank, most severe first.
    fn severity(&self) -> u8 {
        match self {
            BudgetStatus::Critical => 0,
            BudgetStatus::Warning => 1,
            BudgetStatus::Optimal => 2,
        }
    }
}

impl fmt::Display for BudgetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BudgetStatus::Optimal => write!(f, "OPTIMAL"),
            BudgetStatus::Warning => write!(f, "WARNING"),
            BudgetStatus::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Coarse classification of remaining context window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Readiness {
    Green,
    Amber,
    Red,
    Critical,
}

impl Readiness {
    fn severity(&self) -> u8 {
        match self {
            Readiness::Critical => 0,
            Readiness::Red => 1,
            Readiness::Amber => 2,
            Readiness::Green => 3,
        }
    }
}

impl fmt::Display for Readiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Readiness::Green => write!(f, "GREEN"),
            Readiness::Amber => write!(f, "AMBER"),
            Readiness::Red => write!(f, "RED"),
            Readiness::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Next action the watchdog recommends for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionAction {
    Continue,
    CheckpointAndPrepareHandoff,
    HandoffNow,
    RecoverDeadSession,
}

impl SessionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionAction::Continue => "continue",
            SessionAction::CheckpointAndPrepareHandoff => "checkpoint_and_prepare_handoff",
            SessionAction::HandoffNow => "handoff_now",
            SessionAction::RecoverDeadSession => "recover_dead_session",
        }
    }
}

impl fmt::Display for SessionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Map a usage fraction to a budget status.
pub fn classify_status(usage_fraction: f64) -> BudgetStatus {
    if usage_fraction >= CRITICAL_THRESHOLD {
        BudgetStatus::Critical
    } else if usage_fraction >= WARNING_THRESHOLD {
        BudgetStatus::Warning
    } else {
        BudgetStatus::Optimal
    }
}

/// Map a remaining fraction to a readiness tier.
pub fn classify_readiness(remaining_fraction: f64) -> Readiness {
    if remaining_fraction >= 0.60 {
        Readiness::Green
    } else if remaining_fraction >= 0.40 {
        Readiness::Amber
    } else if remaining_fraction >= 0.15 {
        Readiness::Red
    } else {
        Readiness::Critical
    }
}

/// A session is stale iff it has been updated at least once and the update
/// is older than the watchdog interval.
pub fn is_stale(last_updated_ms: u64, now_ms: u64, interval_secs: u64) -> bool {
    last_updated_ms != 0 && now_ms.saturating_sub(last_updated_ms) > interval_secs * 1000
}

/// Computed snapshot of one session's budget health.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub session_id: SessionId,
    pub status: BudgetStatus,
    pub readiness: Readiness,
    /// Fraction of the budget spent; pairs with `remaining_percent` to ~1.0.
    pub usage_percent: f64,
    pub remaining_percent: f64,
    pub is_stale: bool,
    pub action: SessionAction,
    #[serde(default)]
    pub last_task: String,
    #[serde(default)]
    pub restart_attempted: bool,
    #[serde(default)]
    pub restart_success: bool,
    #[serde(default)]
    pub restart_message: String,
    #[serde(default)]
    pub tmux_target: String,
}

impl SessionStatus {
    /// Evaluate a tracker into a status snapshot.
    ///
    /// `has_unfinished_work` gates the recovery action for stale sessions;
    /// restart fields start false/empty and are filled in by the watchdog
    /// after an actual restart attempt.
    pub fn evaluate(
        tracker: &BudgetTracker,
        now_ms: u64,
        interval_secs: u64,
        has_unfinished_work: bool,
    ) -> Self {
        let usage = tracker.usage_fraction();
        let remaining = 1.0 - usage;
        let status = classify_status(usage);
        let stale = is_stale(tracker.last_updated, now_ms, interval_secs);

        let action = if status == BudgetStatus::Critical {
            SessionAction::HandoffNow
        } else if status == BudgetStatus::Warning {
            SessionAction::CheckpointAndPrepareHandoff
        } else if stale && has_unfinished_work {
            SessionAction::RecoverDeadSession
        } else {
            SessionAction::Continue
        };

        Self {
            session_id: tracker.session_id.clone(),
            status,
            readiness: classify_readiness(remaining),
            usage_percent: usage,
            remaining_percent: remaining,
            is_stale: stale,
            action,
            last_task: String::new(),
            restart_attempted: false,
            restart_success: false,
            restart_message: String::new(),
            tmux_target: String::new(),
        }
    }
}

/// Total deterministic ordering for session statuses.
///
/// Sorts by readiness (CRITICAL first), then status (CRITICAL first), then
/// stale before non-stale, then session ID ascending.
pub fn compare_statuses(a: &SessionStatus, b: &SessionStatus) -> Ordering {
    a.readiness
        .severity()
        .cmp(&b.readiness.severity())
        .then(a.status.severity().cmp(&b.status.severity()))
        .then(b.is_stale.cmp(&a.is_stale))
        .then(a.session_id.cmp(&b.session_id))
}

#[cfg(test)]
#[path = "budget_tests.rs"]
mod tests;
