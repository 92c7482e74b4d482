// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake process gateway for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{render_command, GatewayError, ProcessGateway};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Recorded gateway call.
#[derive(Debug, Clone)]
pub struct GatewayCall {
    pub dir: PathBuf,
    /// Rendered command line, e.g. `git status -sb`.
    pub command: String,
}

struct Rule {
    pattern: String,
    result: Result<String, GatewayError>,
}

struct FakeState {
    rules: Vec<Rule>,
    calls: Vec<GatewayCall>,
}

/// Fake gateway with scripted responses and a recorded call log.
///
/// Responses are matched by substring against the rendered command line,
/// first matching rule wins. Unmatched commands succeed with empty stdout.
#[derive(Clone)]
pub struct FakeGateway {
    inner: Arc<Mutex<FakeState>>,
}

impl Default for FakeGateway {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeState {
                rules: Vec::new(),
                calls: Vec::new(),
            })),
        }
    }
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a successful response for commands containing `pattern`.
    pub fn succeed_with(&self, pattern: impl Into<String>, stdout: impl Into<String>) {
        self.inner.lock().rules.push(Rule {
            pattern: pattern.into(),
            result: Ok(stdout.into()),
        });
    }

    /// Script a non-zero exit for commands containing `pattern`.
    pub fn fail_with(&self, pattern: impl Into<String>, stderr: impl Into<String>) {
        let pattern = pattern.into();
        self.inner.lock().rules.push(Rule {
            result: Err(GatewayError::NonZero {
                program: pattern.clone(),
                code: 1,
                stderr: stderr.into(),
            }),
            pattern,
        });
    }

    /// Script a timeout for commands containing `pattern`.
    pub fn time_out(&self, pattern: impl Into<String>, secs: u64) {
        let pattern = pattern.into();
        self.inner.lock().rules.push(Rule {
            result: Err(GatewayError::Timeout {
                program: pattern.clone(),
                secs,
            }),
            pattern,
        });
    }

    /// All recorded command lines, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.inner.lock().calls.iter().map(|c| c.command.clone()).collect()
    }

    /// Recorded calls including their working directories.
    pub fn calls_with_dirs(&self) -> Vec<GatewayCall> {
        self.inner.lock().calls.clone()
    }

    /// Index of the first call containing `needle`, if any.
    pub fn call_index(&self, needle: &str) -> Option<usize> {
        self.inner
            .lock()
            .calls
            .iter()
            .position(|c| c.command.contains(needle))
    }

    fn dispatch(&self, dir: &Path, program: &str, args: &[&str]) -> Result<String, GatewayError> {
        let command = render_command(program, args);
        let mut state = self.inner.lock();
        state.calls.push(GatewayCall {
            dir: dir.to_path_buf(),
            command: command.clone(),
        });
        for rule in &state.rules {
            if command.contains(&rule.pattern) {
                return rule.result.clone();
            }
        }
        Ok(String::new())
    }
}

#[async_trait]
impl ProcessGateway for FakeGateway {
    async fn run(
        &self,
        _timeout: Duration,
        dir: &Path,
        program: &str,
        args: &[&str],
    ) -> Result<(), GatewayError> {
        self.dispatch(dir, program, args).map(|_| ())
    }

    async fn run_capture(
        &self,
        _timeout: Duration,
        dir: &Path,
        program: &str,
        args: &[&str],
    ) -> Result<String, GatewayError> {
        self.dispatch(dir, program, args)
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
