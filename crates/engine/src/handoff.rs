// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Auto-handoff markdown rendering.
//!
//! The handoff tells a fresh session (or a human) everything needed to
//! resume: budget state, the active bead, what changed, and why the
//! handoff happened. Section headers are fixed; downstream consumers key
//! on them.

use ao_core::budget::{SessionStatus, TranscriptUsage};

/// Inputs for one rendered handoff.
#[derive(Debug, Clone, Default)]
pub struct HandoffContext {
    pub active_bead: String,
    pub agent_identity: String,
    pub modified_files: Vec<String>,
    pub usage: TranscriptUsage,
}

/// Render the handoff markdown for a session.
pub fn render_handoff(status: &SessionStatus, ctx: &HandoffContext) -> String {
    let mut doc = String::new();
    doc.push_str("# Auto-Handoff (Context Guard)\n\n");

    doc.push_str("## Status\n\n");
    doc.push_str(&format!("- Session: {}\n", status.session_id));
    doc.push_str(&format!("- Status: {}\n", status.status));
    doc.push_str(&format!("- Readiness: {}\n", status.readiness));
    doc.push_str(&format!(
        "- Context used: {:.1}% ({:.1}% remaining)\n",
        status.usage_percent * 100.0,
        status.remaining_percent * 100.0
    ));
    if status.is_stale {
        doc.push_str("- Last update is older than the watchdog interval\n");
    }

    doc.push_str("\n## Active Bead\n\n");
    if ctx.active_bead.is_empty() {
        doc.push_str("- none recorded\n");
    } else {
        doc.push_str(&format!("- {}\n", ctx.active_bead));
    }

    doc.push_str("\n## Agent\n\n");
    let identity = if ctx.agent_identity.is_empty() {
        "unknown"
    } else {
        ctx.agent_identity.as_str()
    };
    doc.push_str(&format!("- {}\n", identity));

    doc.push_str("\n## Modified Files\n\n");
    if ctx.modified_files.is_empty() {
        doc.push_str("- none detected\n");
    } else {
        for file in &ctx.modified_files {
            doc.push_str(&format!("- {}\n", file));
        }
    }

    doc.push_str("\n## Usage\n\n");
    doc.push_str(&format!("- Input tokens: {}\n", ctx.usage.input_tokens));
    doc.push_str(&format!(
        "- Cache creation tokens: {}\n",
        ctx.usage.cache_creation_tokens
    ));
    doc.push_str(&format!(
        "- Cache read tokens: {}\n",
        ctx.usage.cache_read_tokens
    ));
    doc.push_str(&format!("- Total: {}\n", ctx.usage.total()));
    if let Some(model) = &ctx.usage.model {
        doc.push_str(&format!("- Model: {}\n", model));
    }

    doc.push_str("\n## Recommendation\n\n");
    doc.push_str(&format!("- {}\n", recommendation(status)));

    doc.push_str("\n## Next Action\n\n");
    doc.push_str(&format!("- {}\n", status.action));
    if !status.last_task.is_empty() {
        doc.push_str(&format!("- Resume task: {}\n", status.last_task));
    }

    doc.push_str("\n## Blockers\n\n");
    let mut any_blocker = false;
    if status.is_stale {
        doc.push_str("- watchdog recovery\n");
        any_blocker = true;
    }
    if status.restart_attempted && !status.restart_success {
        doc.push_str(&format!("- restart failed: {}\n", status.restart_message));
        any_blocker = true;
    }
    if !any_blocker {
        doc.push_str("- none\n");
    }

    doc
}

fn recommendation(status: &SessionStatus) -> &'static str {
    use ao_core::budget::SessionAction;
    match status.action {
        SessionAction::HandoffNow => {
            "Hand off to a fresh session now; context budget is critical"
        }
        SessionAction::CheckpointAndPrepareHandoff => {
            "Checkpoint progress and prepare a handoff before the budget tightens"
        }
        SessionAction::RecoverDeadSession => {
            "Session looks dead with unfinished work; restart or reassign it"
        }
        SessionAction::Continue => "Continue; budget is healthy",
    }
}

#[cfg(test)]
#[path = "handoff_render_tests.rs"]
mod tests;
