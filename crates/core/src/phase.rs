// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The three-phase run state machine vocabulary.
//!
//! Every run moves through discovery → implementation → validation. Each
//! phase yields a markdown summary and a verdict keyed by a fixed artifact
//! name (`pre_mortem`, `vibe`, `post_mortem`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One of the three run phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Discovery,
    Implementation,
    Validation,
}

/// Error parsing a phase name or number.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown phase: {0}")]
pub struct PhaseParseError(pub String);

impl Phase {
    /// The final phase; completing it with a passing verdict completes the run.
    pub const FINAL: Phase = Phase::Validation;

    /// All phases in execution order.
    pub fn all() -> [Phase; 3] {
        [Phase::Discovery, Phase::Implementation, Phase::Validation]
    }

    /// 1-based phase number.
    pub fn number(&self) -> u8 {
        match self {
            Phase::Discovery => 1,
            Phase::Implementation => 2,
            Phase::Validation => 3,
        }
    }

    pub fn from_number(n: u8) -> Result<Phase, PhaseParseError> {
        match n {
            1 => Ok(Phase::Discovery),
            2 => Ok(Phase::Implementation),
            3 => Ok(Phase::Validation),
            _ => Err(PhaseParseError(n.to_string())),
        }
    }

    /// The phase after this one, or `None` after validation.
    pub fn next(&self) -> Option<Phase> {
        match self {
            Phase::Discovery => Some(Phase::Implementation),
            Phase::Implementation => Some(Phase::Validation),
            Phase::Validation => None,
        }
    }

    /// Verdict-map key for this phase's artifact.
    pub fn verdict_key(&self) -> &'static str {
        match self {
            Phase::Discovery => "pre_mortem",
            Phase::Implementation => "vibe",
            Phase::Validation => "post_mortem",
        }
    }

    /// Name of the summary file this phase writes into the worktree.
    pub fn summary_file(&self) -> String {
        format!("phase-{}-summary.md", self.number())
    }

    pub fn name(&self) -> &'static str {
        match self {
            Phase::Discovery => "discovery",
            Phase::Implementation => "implementation",
            Phase::Validation => "validation",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Phase {
    type Err = PhaseParseError;

    /// Accepts both phase numbers (`"2"`) and names (`"implementation"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "discovery" => Ok(Phase::Discovery),
            "2" | "implementation" => Ok(Phase::Implementation),
            "3" | "validation" => Ok(Phase::Validation),
            other => Err(PhaseParseError(other.to_string())),
        }
    }
}

/// Outcome verdict for a phase artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "PASS")]
    Pass,
    #[serde(rename = "WARN")]
    Warn,
    #[serde(rename = "FAIL")]
    Fail,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Pass => "PASS",
            Verdict::Warn => "WARN",
            Verdict::Fail => "FAIL",
        }
    }

    /// Scan free-form log detail text for an inline verdict mention.
    ///
    /// The last mention wins, so a retry that ends in `PASS` overrides an
    /// earlier `FAIL` in the same detail blob.
    pub fn detect_inline(details: &str) -> Option<Verdict> {
        let mut found = None;
        for word in details.split(|c: char| !c.is_ascii_alphabetic()) {
            match word {
                "PASS" => found = Some(Verdict::Pass),
                "WARN" => found = Some(Verdict::Warn),
                "FAIL" => found = Some(Verdict::Fail),
                _ => {}
            }
        }
        found
    }

    /// A verdict that lets a non-final phase advance. Completing the run
    /// itself requires a PASS on validation.
    pub fn is_passing(&self) -> bool {
        matches!(self, Verdict::Pass | Verdict::Warn)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Verdict {
    type Err = PhaseParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PASS" => Ok(Verdict::Pass),
            "WARN" => Ok(Verdict::Warn),
            "FAIL" => Ok(Verdict::Fail),
            other => Err(PhaseParseError(other.to_string())),
        }
    }
}

#[cfg(test)]
#[path = "phase_tests.rs"]
mod tests;
