// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Heartbeat freshness and the run liveness decision.
//!
//! Liveness is a deterministic function of `(heartbeat_age,
//! worktree_exists, tmux_probe_result)`. The tmux probe is expensive, so
//! callers only resolve it when the heartbeat is no longer fresh; the
//! decision itself stays pure.

use std::time::{Duration, SystemTime};

/// A heartbeat younger than this counts as alive without probing tmux.
pub const HEARTBEAT_FRESH_SECS: u64 = 5 * 60;

/// Age of a heartbeat file given its mtime. Clock skew (mtime in the
/// future) reads as age zero.
pub fn heartbeat_age(mtime: SystemTime, now: SystemTime) -> Duration {
    now.duration_since(mtime).unwrap_or(Duration::ZERO)
}

/// Strict less-than: an age of exactly five minutes is no longer fresh and
/// falls through to the tmux probe.
pub fn heartbeat_fresh(age: Option<Duration>) -> bool {
    matches!(age, Some(a) if a < Duration::from_secs(HEARTBEAT_FRESH_SECS))
}

/// The liveness decision ladder:
///
/// 1. a recorded worktree whose directory is gone → dead;
/// 2. fresh heartbeat → alive;
/// 3. otherwise, alive iff the tmux probe found an expected session.
///
/// `heartbeat_age` is `None` when the run has no heartbeat file.
pub fn determine_liveness(
    worktree_missing: bool,
    heartbeat_age: Option<Duration>,
    tmux_alive: bool,
) -> bool {
    if worktree_missing {
        return false;
    }
    if heartbeat_fresh(heartbeat_age) {
        return true;
    }
    tmux_alive
}

#[cfg(test)]
#[path = "heartbeat_tests.rs"]
mod tests;
