// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process gateway: the single seam for external tool invocation.
//!
//! Every git, tmux, and runtime call goes through [`ProcessGateway`] so the
//! engine can be tested against a fake. Each call enforces a wall-clock
//! deadline; on timeout the child's process group receives SIGTERM and,
//! after a grace period, SIGKILL.

mod system;

pub use system::SystemGateway;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeGateway, GatewayCall};

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors from gateway invocations.
///
/// Non-zero exits carry the captured stderr so callers can surface it.
#[derive(Debug, Error, Clone)]
pub enum GatewayError {
    #[error("{program} failed to spawn: {message}")]
    Spawn { program: String, message: String },
    #[error("{program} timed out after {secs}s")]
    Timeout { program: String, secs: u64 },
    #[error("{program} exited with code {code}: {stderr}")]
    NonZero {
        program: String,
        code: i32,
        stderr: String,
    },
}

impl GatewayError {
    /// Whether the failure came from the tool not finishing (as opposed to
    /// finishing unhappily).
    pub fn is_timeout(&self) -> bool {
        matches!(self, GatewayError::Timeout { .. })
    }
}

/// Render a command line the way call logs and fakes key on it.
pub fn render_command(program: &str, args: &[&str]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}

/// Adapter for invoking external tools with deadlines.
#[async_trait]
pub trait ProcessGateway: Clone + Send + Sync + 'static {
    /// Run a command, discarding stdout.
    async fn run(
        &self,
        timeout: Duration,
        dir: &Path,
        program: &str,
        args: &[&str],
    ) -> Result<(), GatewayError>;

    /// Run a command and capture stdout.
    async fn run_capture(
        &self,
        timeout: Duration,
        dir: &Path,
        program: &str,
        args: &[&str],
    ) -> Result<String, GatewayError>;
}
