// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Failure taxonomy for supervisor cycles.
//!
//! Task failures mean the goal itself did not satisfy a success criterion
//! and mark the queue entry failed. Infrastructure failures mean a
//! dependency (git, tmux, the runtime) misbehaved; the supervisor may retry
//! without marking the entry. Classification happens where the typed error
//! lives (`EngineError::failure_kind`); anything uncategorized there is a
//! task failure (fail-closed).

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Task,
    Infrastructure,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Task => write!(f, "task"),
            FailureKind::Infrastructure => write!(f, "infrastructure"),
        }
    }
}
