// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Real process gateway backed by tokio subprocesses.

use super::{GatewayError, ProcessGateway};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

/// Grace period between SIGTERM and SIGKILL on timeout.
const KILL_GRACE: Duration = Duration::from_millis(500);

/// Gateway that spawns real child processes.
///
/// Children run in their own process group so a timeout can terminate the
/// whole tree, not just the direct child.
#[derive(Clone, Default)]
pub struct SystemGateway;

impl SystemGateway {
    pub fn new() -> Self {
        Self
    }

    async fn invoke(
        &self,
        timeout: Duration,
        dir: &Path,
        program: &str,
        args: &[&str],
    ) -> Result<std::process::Output, GatewayError> {
        let mut cmd = std::process::Command::new(program);
        cmd.args(args)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let mut tokio_cmd = tokio::process::Command::from(cmd);
        let child = tokio_cmd.spawn().map_err(|e| GatewayError::Spawn {
            program: program.to_string(),
            message: e.to_string(),
        })?;
        let pid = child.id();

        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(io_err)) => Err(GatewayError::Spawn {
                program: program.to_string(),
                message: io_err.to_string(),
            }),
            Err(_elapsed) => {
                if let Some(pid) = pid {
                    terminate_group(pid).await;
                }
                tracing::warn!(program, secs = timeout.as_secs(), "command timed out");
                Err(GatewayError::Timeout {
                    program: program.to_string(),
                    secs: timeout.as_secs(),
                })
            }
        }
    }
}

#[async_trait]
impl ProcessGateway for SystemGateway {
    async fn run(
        &self,
        timeout: Duration,
        dir: &Path,
        program: &str,
        args: &[&str],
    ) -> Result<(), GatewayError> {
        let output = self.invoke(timeout, dir, program, args).await?;
        check_status(program, &output)?;
        Ok(())
    }

    async fn run_capture(
        &self,
        timeout: Duration,
        dir: &Path,
        program: &str,
        args: &[&str],
    ) -> Result<String, GatewayError> {
        let output = self.invoke(timeout, dir, program, args).await?;
        check_status(program, &output)?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

fn check_status(program: &str, output: &std::process::Output) -> Result<(), GatewayError> {
    if output.status.success() {
        return Ok(());
    }
    Err(GatewayError::NonZero {
        program: program.to_string(),
        code: output.status.code().unwrap_or(-1),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}

/// SIGTERM the child's process group, wait the grace period, then SIGKILL.
///
/// ESRCH is expected when the group exited during the grace period.
#[cfg(unix)]
async fn terminate_group(pid: u32) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let pgid = Pid::from_raw(pid as i32);
    let _ = killpg(pgid, Signal::SIGTERM);
    tokio::time::sleep(KILL_GRACE).await;
    let _ = killpg(pgid, Signal::SIGKILL);
}

#[cfg(not(unix))]
async fn terminate_group(_pid: u32) {
    // The dropped tokio child handle is the best we can do off-unix.
}

#[cfg(test)]
#[path = "system_tests.rs"]
mod tests;
