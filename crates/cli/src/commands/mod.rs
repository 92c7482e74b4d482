// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subcommand implementations

pub mod cancel;
pub mod init;
pub mod resume;
pub mod status;
pub mod supervise;
pub mod worktree;

use std::time::Duration;

/// clap value parser for `30s` / `5m` / `2h` style durations.
pub fn duration_arg(s: &str) -> Result<Duration, String> {
    ao_core::parse_duration(s).map_err(|e| e.to_string())
}
