// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Multi-cycle supervisor loop.
//!
//! The supervisor owns policy: the kill switch, bd sync, the single-flight
//! supervisor lease, gates, landing, and the failure taxonomy. The phase
//! engine owns the state machine and never reaches back; it receives the
//! gateway, registry, and lease paths it needs as plain values.

use crate::discovery::DiscoveryService;
use crate::error::EngineError;
use crate::landing::{render_commit_message, LandingCoordinator};
use crate::phases::PhaseEngine;
use crate::watchdog::{default_transcripts_root, ContextWatchdog, WatchdogConfig};
use crate::worktree::WorktreeManager;
use ao_adapters::tmux::session_name;
use ao_adapters::{resolve_binary, ProcessGateway, ProcessTree};
use ao_core::budget::SessionAction;
use ao_core::config::{BdSyncPolicy, FailurePolicy, GatePolicy, LandingPolicy, SupervisorConfig};
use ao_core::{Clock, EpicId, Phase, RpiPaths, Run, RunId, SessionId};
use ao_storage::{Lease, LeaseMeta, RunRegistry};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// TTL for the single-flight supervisor lease.
const SUPERVISOR_LEASE_TTL_SECS: u64 = 2 * 60 * 60;
/// TTL for the landing lease; the sequence is short.
const LANDING_LEASE_TTL_SECS: u64 = 10 * 60;
/// First retry backoff step; doubles per attempt up to the configured bound.
const BACKOFF_BASE: Duration = Duration::from_secs(1);

/// What a supervise invocation accomplished.
#[derive(Debug, Clone)]
pub struct SuperviseSummary {
    pub run_id: RunId,
    pub epic_id: EpicId,
    pub cycles_run: u32,
    pub completed: bool,
    /// The kill switch ended the loop cleanly.
    pub kill_switch: bool,
}

/// The supervisor loop for one goal.
pub struct Supervisor<G, C, P> {
    gateway: G,
    clock: C,
    process_tree: P,
    repo_root: PathBuf,
    config: SupervisorConfig,
}

impl<G: ProcessGateway, C: Clock, P: ProcessTree> Supervisor<G, C, P> {
    pub fn new(
        gateway: G,
        clock: C,
        process_tree: P,
        repo_root: impl Into<PathBuf>,
        config: SupervisorConfig,
    ) -> Self {
        Self {
            gateway,
            clock,
            process_tree,
            repo_root: repo_root.into(),
            config,
        }
    }

    /// Run the supervisor loop to completion, kill switch, or failure.
    pub async fn run(&self) -> Result<SuperviseSummary, EngineError> {
        let (workdir, mut run) = self.prepare_run().await?;
        let registry = RunRegistry::new(&workdir);
        let rpi = RpiPaths::new(&workdir);

        // Leases live inside the worktree so forced removal cleans them
        let mut supervisor_lease = None;
        if self.config.use_lease {
            let meta = LeaseMeta::new(
                run.run_id.clone(),
                std::process::id(),
                SUPERVISOR_LEASE_TTL_SECS,
            );
            let tree = self.process_tree.clone();
            supervisor_lease = Some(Lease::acquire(
                &rpi.supervisor_lock(),
                &meta,
                move |pid| tree.pid_alive(pid),
            )?);
        }

        let stream_supported = resolve_binary(&self.config.tools.runtime_command).is_some();
        let engine = PhaseEngine::new(
            self.gateway.clone(),
            self.clock.clone(),
            registry.clone(),
            self.config.tools.clone(),
            self.config.command_timeout,
        )
        .with_stream_supported(stream_supported);

        // Context guard over this run's phase sessions, one pass per cycle
        let watchdog = ContextWatchdog::new(
            self.gateway.clone(),
            self.clock.clone(),
            rpi.clone(),
            WatchdogConfig {
                transcripts_root: default_transcripts_root(),
                tmux_command: self.config.tools.tmux_command.clone(),
                ..WatchdogConfig::default()
            },
        );

        let mut summary = SuperviseSummary {
            run_id: run.run_id.clone(),
            epic_id: run.epic_id.clone(),
            cycles_run: 0,
            completed: false,
            kill_switch: false,
        };

        let result = self
            .cycle_loop(&engine, &watchdog, &registry, &rpi, &workdir, &mut run, &mut summary)
            .await;

        if let Some(lease) = supervisor_lease.as_mut() {
            lease.release()?;
        }

        result.map(|()| summary)
    }

    #[allow(clippy::too_many_arguments)]
    async fn cycle_loop(
        &self,
        engine: &PhaseEngine<G, C>,
        watchdog: &ContextWatchdog<G, C>,
        registry: &RunRegistry,
        rpi: &RpiPaths,
        workdir: &Path,
        run: &mut Run,
        summary: &mut SuperviseSummary,
    ) -> Result<(), EngineError> {
        for cycle in 1..=self.config.cycles.max(1) {
            if self.kill_switch_present() {
                tracing::info!(cycle, "kill switch present; exiting cleanly");
                summary.kill_switch = true;
                return Ok(());
            }

            self.bd_sync(workdir).await?;

            run.cycle = cycle;
            summary.cycles_run = cycle;
            self.write_live_status(rpi, run);
            self.watchdog_pass(watchdog, run).await;

            let mut attempt = 0u32;
            let cycle_result = loop {
                attempt += 1;
                let result = self.one_cycle(engine, rpi, workdir, run, cycle, attempt).await;
                let Err(e) = result else { break Ok(()) };

                let kind = e.failure_kind();
                tracing::warn!(
                    cycle,
                    attempt,
                    kind = %kind,
                    error = %e,
                    "cycle attempt failed"
                );

                match self.config.failure_policy {
                    FailurePolicy::Stop => break Err(e),
                    FailurePolicy::Continue => {
                        if attempt > self.config.cycle_retries {
                            // Retries exhausted: the next cycle starts on
                            // schedule.
                            break Err(e);
                        }
                        tokio::time::sleep(self.backoff(attempt)).await;
                        self.reactivate(registry, run)?;
                    }
                }
            };

            match cycle_result {
                Ok(()) => {
                    summary.completed = true;
                    self.write_live_status(rpi, run);
                    return Ok(());
                }
                Err(e) if self.config.failure_policy == FailurePolicy::Stop => {
                    return Err(e);
                }
                Err(e) => {
                    // continue policy: swallow, reactivate, move on
                    tracing::warn!(cycle, error = %e, "cycle failed; continuing");
                    if cycle < self.config.cycles {
                        self.reactivate(registry, run)?;
                        tokio::time::sleep(self.config.cycle_delay).await;
                    }
                }
            }
        }
        Ok(())
    }

    /// One full cycle: phases, then gates, then landing.
    async fn one_cycle(
        &self,
        engine: &PhaseEngine<G, C>,
        rpi: &RpiPaths,
        workdir: &Path,
        run: &mut Run,
        cycle: u32,
        attempt: u32,
    ) -> Result<(), EngineError> {
        let landing = LandingCoordinator::new(self.gateway.clone(), self.config.command_timeout);
        let scope = if self.config.landing_policy == LandingPolicy::Off {
            None
        } else {
            Some(landing.capture_scope(workdir).await?)
        };

        engine.execute(run).await?;
        self.run_gates(workdir).await?;

        if let Some(scope) = scope {
            let message = render_commit_message(
                &self.config.commit_template,
                cycle,
                attempt,
                &run.goal,
            );

            let meta = LeaseMeta::new(
                run.run_id.clone(),
                std::process::id(),
                LANDING_LEASE_TTL_SECS,
            );
            let tree = self.process_tree.clone();
            let mut lease =
                Lease::acquire(&rpi.landing_lock(), &meta, move |pid| tree.pid_alive(pid))?;

            let landed = async {
                landing.commit_if_dirty(workdir, &scope, &message).await?;
                if self.config.landing_policy == LandingPolicy::SyncPush {
                    let branch = self.current_branch(workdir).await?;
                    landing.sync_push(workdir, &branch).await?;
                }
                Ok::<(), EngineError>(())
            }
            .await;

            // The lease is released on every path
            lease.release()?;
            landed?;
        }

        Ok(())
    }

    /// Context-guard pass over the run's phase sessions.
    ///
    /// Best-effort: budget refresh and handoff emission never fail the
    /// cycle; anything actionable is surfaced through markers and the log.
    async fn watchdog_pass(&self, watchdog: &ContextWatchdog<G, C>, run: &Run) {
        let sessions: Vec<(SessionId, String)> = (1..=3u8)
            .map(|n| {
                let name = session_name(&run.run_id, n);
                (SessionId::new(name.clone()), name)
            })
            .collect();

        match watchdog.check_all(&sessions).await {
            Ok(statuses) => {
                for status in statuses.iter().filter(|s| s.action != SessionAction::Continue) {
                    tracing::info!(
                        session = %status.session_id,
                        action = %status.action,
                        usage = format!("{:.1}%", status.usage_percent * 100.0),
                        stale = status.is_stale,
                        "context guard"
                    );
                }
            }
            Err(e) => tracing::warn!(error = %e, "watchdog pass failed"),
        }
    }

    /// Gates run inside the worktree; with a required policy any failure
    /// fails the cycle as a task failure.
    async fn run_gates(&self, workdir: &Path) -> Result<(), EngineError> {
        if self.config.gate_policy == GatePolicy::Off {
            return Ok(());
        }
        let gates = [
            ("validate_fast", &self.config.gates.validate_fast),
            ("security_gate", &self.config.gates.security_gate),
        ];
        for (name, script) in gates {
            let Some(script) = script else { continue };
            tracing::info!(gate = name, "running gate");
            self.gateway
                .run(
                    self.config.command_timeout,
                    workdir,
                    "sh",
                    &["-c", script],
                )
                .await
                .map_err(|e| EngineError::TaskFailed(format!("gate {} failed: {}", name, e)))?;
        }
        Ok(())
    }

    /// Invoke `bd sync` according to policy.
    async fn bd_sync(&self, workdir: &Path) -> Result<(), EngineError> {
        let bd = &self.config.tools.bd_command;
        match self.config.bd_sync_policy {
            BdSyncPolicy::Never => Ok(()),
            BdSyncPolicy::Auto => {
                if resolve_binary(bd).is_some() && workdir.join(".beads").exists() {
                    self.gateway
                        .run(self.config.command_timeout, workdir, bd, &["sync"])
                        .await?;
                }
                Ok(())
            }
            BdSyncPolicy::Always => {
                if resolve_binary(bd).is_none() {
                    return Err(EngineError::TaskFailed(format!(
                        "bd sync policy is always but {} is not on PATH",
                        bd
                    )));
                }
                self.gateway
                    .run(self.config.command_timeout, workdir, bd, &["sync"])
                    .await?;
                Ok(())
            }
        }
    }

    /// Create a new run + worktree, or locate and merge an existing one.
    async fn prepare_run(&self) -> Result<(PathBuf, Run), EngineError> {
        if let Some(run_id) = &self.config.run_id {
            let discovery = DiscoveryService::new(
                self.gateway.clone(),
                self.clock.clone(),
                self.config.tools.tmux_command.clone(),
            );
            let (root, existing) = discovery
                .locate_run(&self.repo_root, run_id)
                .await
                .ok_or_else(|| EngineError::RunNotFound(run_id.to_string()))?;

            let goal = if self.config.goal.is_empty() {
                existing.goal.clone()
            } else {
                self.config.goal.clone()
            };
            // Resume from the persisted phase unless --from overrides it
            let start = self.config.start_phase.unwrap_or(existing.phase);
            let mut run = Run::new(run_id.clone(), goal, start);
            run.merge_for_resume(&existing);

            let workdir = run
                .worktree_path
                .clone()
                .filter(|p| p.exists())
                .unwrap_or(root);
            Ok((workdir, run))
        } else {
            let run_id = RunId::generate();
            let start = self.config.start_phase.unwrap_or(Phase::Discovery);
            let mut run = Run::new(run_id.clone(), self.config.goal.clone(), start);
            run.options.runtime_command = self.config.tools.runtime_command.clone();
            run.options.ao_command = self.config.tools.ao_command.clone();
            run.options.bd_command = self.config.tools.bd_command.clone();
            run.options.tmux_command = self.config.tools.tmux_command.clone();

            let manager = WorktreeManager::new(self.gateway.clone(), &self.repo_root);
            let path = manager.create(&run_id).await?;
            run.worktree_path = Some(path.clone());
            Ok((path, run))
        }
    }

    /// Clear terminal state so a retry or the next cycle can run again.
    fn reactivate(&self, registry: &RunRegistry, run: &mut Run) -> Result<(), EngineError> {
        run.terminal_status.clear();
        run.terminal_reason.clear();
        run.terminated_at.clear();
        run.phase = run.start_phase;
        run.attempts.clear();
        registry.put(run)?;
        Ok(())
    }

    fn kill_switch_present(&self) -> bool {
        let path = self
            .config
            .kill_switch_path
            .clone()
            .unwrap_or_else(|| RpiPaths::new(&self.repo_root).kill_switch());
        path.exists()
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let exp = BACKOFF_BASE.saturating_mul(1u32 << attempt.saturating_sub(1).min(16));
        exp.min(self.config.retry_backoff)
    }

    async fn current_branch(&self, workdir: &Path) -> Result<String, EngineError> {
        let branch = self
            .gateway
            .run_capture(
                self.config.command_timeout,
                workdir,
                "git",
                &["rev-parse", "--abbrev-ref", "HEAD"],
            )
            .await?;
        Ok(branch.trim().to_string())
    }

    fn write_live_status(&self, rpi: &RpiPaths, run: &Run) {
        let status = if run.is_terminal() {
            run.terminal_status.clone()
        } else {
            format!("phase {}", run.phase)
        };
        let content = format!(
            "# Run {}\n\n- Goal: {}\n- Cycle: {}\n- Status: {}\n",
            run.run_id, run.goal, run.cycle, status
        );
        let path = rpi.live_status();
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        if let Err(e) = fs::write(&path, content) {
            tracing::debug!(error = %e, "live status write failed");
        }
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
