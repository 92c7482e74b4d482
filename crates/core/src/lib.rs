// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ao-core: Core library for the Agent Operations (ao) CLI tool

pub mod budget;
pub mod clock;
pub mod config;
pub mod failure;
pub mod id;
pub mod paths;
pub mod phase;
pub mod run;
pub mod time_fmt;

pub use budget::{
    classify_readiness, classify_status, compare_statuses, BudgetStatus, BudgetTracker, Readiness,
    SessionAction, SessionStatus, TranscriptUsage, DEFAULT_MAX_TOKENS, WATCHDOG_INTERVAL_SECS,
};
pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{
    parse_duration, BdSyncPolicy, ConfigError, FailurePolicy, GateCommands, GatePolicy,
    LandingPolicy, RuntimeMode, SupervisorConfig, ToolCommands,
};
pub use failure::FailureKind;
pub use id::{EpicId, RunId, SessionId};
pub use paths::RpiPaths;
pub use phase::{Phase, PhaseParseError, Verdict};
pub use run::{classify_complexity, Complexity, Run, RunOptions, RUN_SCHEMA_VERSION};
pub use time_fmt::{format_elapsed, format_elapsed_ms, truncate_display};
