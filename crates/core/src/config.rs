// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor configuration and policy enums.
//!
//! Configuration is an explicit struct threaded through the supervisor and
//! snapshotted into the run record at start, so a resume reconstructs the
//! exact behavior. Environment overrides are resolved once here; empty
//! values normalize to the built-in defaults.

use crate::id::RunId;
use crate::phase::Phase;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors surface to the user and exit non-zero immediately.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid duration {0:?} (expected e.g. 30s, 5m, 2h)")]
    InvalidDuration(String),
    #[error("unknown {what}: {value}")]
    UnknownValue { what: &'static str, value: String },
}

macro_rules! policy_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident { $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)? }
        what = $what:literal;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($(#[$vmeta])* $variant,)+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ConfigError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    other => Err(ConfigError::UnknownValue {
                        what: $what,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

policy_enum! {
    /// What to do when a supervisor cycle fails.
    pub enum FailurePolicy {
        /// Exit on the first cycle failure.
        Stop => "stop",
        /// Retry up to `cycle_retries`, then move to the next cycle.
        Continue => "continue",
    }
    what = "failure policy";
}

policy_enum! {
    /// Whether gate scripts are required to pass.
    pub enum GatePolicy {
        Off => "off",
        Required => "required",
    }
    what = "gate policy";
}

policy_enum! {
    /// What happens to the worktree at the end of a successful cycle.
    pub enum LandingPolicy {
        Off => "off",
        /// Commit run-scoped changes under the landing lease.
        Commit => "commit",
        /// Commit, then fetch + rebase + push.
        SyncPush => "sync_push",
    }
    what = "landing policy";
}

policy_enum! {
    /// Whether to invoke the external `bd` issue sync before cycles.
    pub enum BdSyncPolicy {
        /// Sync only if the binary resolves AND `.beads` exists.
        Auto => "auto",
        /// Sync unconditionally; error when the binary is missing.
        Always => "always",
        Never => "never",
    }
    what = "bd sync policy";
}

policy_enum! {
    /// How the agent runtime is invoked.
    pub enum RuntimeMode {
        /// Pick stream when the runtime supports it, else direct.
        Auto => "auto",
        Direct => "direct",
        Stream => "stream",
    }
    what = "runtime mode";
}

/// Parse `"30s"`, `"5m"`, `"2h"`, or bare seconds into a `Duration`.
pub fn parse_duration(s: &str) -> Result<Duration, ConfigError> {
    let s = s.trim();
    let (digits, unit) = match s.char_indices().find(|(_, c)| !c.is_ascii_digit()) {
        Some((idx, _)) => s.split_at(idx),
        None => (s, ""),
    };
    let value: u64 = digits
        .parse()
        .map_err(|_| ConfigError::InvalidDuration(s.to_string()))?;
    match unit {
        "" | "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value * 60)),
        "h" => Ok(Duration::from_secs(value * 3600)),
        "d" => Ok(Duration::from_secs(value * 86400)),
        _ => Err(ConfigError::InvalidDuration(s.to_string())),
    }
}

/// External tool commands, overridable via `AGENTOPS_RPI_*`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCommands {
    /// Runtime kind (currently only `claude`).
    pub runtime: String,
    pub runtime_mode: RuntimeMode,
    /// Binary used to invoke the runtime.
    pub runtime_command: String,
    pub ao_command: String,
    pub bd_command: String,
    pub tmux_command: String,
}

impl Default for ToolCommands {
    fn default() -> Self {
        Self {
            runtime: "claude".to_string(),
            runtime_mode: RuntimeMode::Auto,
            runtime_command: "claude".to_string(),
            ao_command: "ao".to_string(),
            bd_command: "bd".to_string(),
            tmux_command: "tmux".to_string(),
        }
    }
}

/// Read an env override, treating unset and empty alike.
fn env_or(name: &str, default: &str) -> String {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => v,
        _ => default.to_string(),
    }
}

impl ToolCommands {
    /// Resolve tool commands from the environment.
    ///
    /// An unparseable `AGENTOPS_RPI_RUNTIME_MODE` is a configuration error;
    /// empty values fall back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let mode = env_or("AGENTOPS_RPI_RUNTIME_MODE", defaults.runtime_mode.as_str());
        Ok(Self {
            runtime: env_or("AGENTOPS_RPI_RUNTIME", &defaults.runtime),
            runtime_mode: mode.parse()?,
            runtime_command: env_or("AGENTOPS_RPI_RUNTIME_COMMAND", &defaults.runtime_command),
            ao_command: env_or("AGENTOPS_RPI_AO_COMMAND", &defaults.ao_command),
            bd_command: env_or("AGENTOPS_RPI_BD_COMMAND", &defaults.bd_command),
            tmux_command: env_or("AGENTOPS_RPI_TMUX_COMMAND", &defaults.tmux_command),
        })
    }
}

/// Optional gate scripts run inside the worktree after each cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GateCommands {
    pub validate_fast: Option<String>,
    pub security_gate: Option<String>,
}

/// Full supervisor configuration for one `supervise` invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
    pub goal: String,
    /// Resume an existing run instead of creating a new one.
    pub run_id: Option<RunId>,
    /// Explicit start-phase override (`--from`).
    pub start_phase: Option<Phase>,
    pub cycles: u32,
    pub cycle_retries: u32,
    pub cycle_delay: Duration,
    /// Upper bound for the exponential retry backoff.
    pub retry_backoff: Duration,
    pub failure_policy: FailurePolicy,
    pub gate_policy: GatePolicy,
    pub landing_policy: LandingPolicy,
    pub bd_sync_policy: BdSyncPolicy,
    /// Hold the single-flight supervisor lease across the loop.
    pub use_lease: bool,
    /// Override for the kill switch location (default `.agents/rpi/KILL`).
    pub kill_switch_path: Option<PathBuf>,
    pub command_timeout: Duration,
    /// Landing commit message template with `{{cycle}}`, `{{attempt}}`,
    /// `{{goal}}` placeholders.
    pub commit_template: String,
    pub gates: GateCommands,
    pub tools: ToolCommands,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            goal: String::new(),
            run_id: None,
            start_phase: None,
            cycles: 1,
            cycle_retries: 0,
            cycle_delay: Duration::ZERO,
            retry_backoff: Duration::from_secs(60),
            failure_policy: FailurePolicy::Stop,
            gate_policy: GatePolicy::Off,
            landing_policy: LandingPolicy::Off,
            bd_sync_policy: BdSyncPolicy::Auto,
            use_lease: false,
            kill_switch_path: None,
            command_timeout: Duration::from_secs(600),
            commit_template: "cycle {{cycle}} attempt {{attempt}}: {{goal}}".to_string(),
            gates: GateCommands::default(),
            tools: ToolCommands::default(),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
