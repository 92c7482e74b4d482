// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The three-phase state machine for one run.
//!
//! Each phase builds a prompt from the goal, the prior phase summaries,
//! and the verdicts so far, invokes the runtime through the gateway,
//! records the verdict, and touches the heartbeat. Retryable failures
//! re-run the phase with the failure history appended; the attempt cap is
//! per phase. Terminal state is written back before the engine returns on
//! every path.

use crate::error::EngineError;
use ao_adapters::{build_invocation, ProcessGateway};
use ao_core::config::ToolCommands;
use ao_core::{Clock, Phase, Run, Verdict};
use ao_storage::RunRegistry;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Attempts allowed per phase before the run fails.
pub const PHASE_ATTEMPT_CAP: u32 = 3;

/// Drives one run through its remaining phases.
pub struct PhaseEngine<G, C> {
    gateway: G,
    clock: C,
    registry: RunRegistry,
    tools: ToolCommands,
    command_timeout: Duration,
    stream_supported: bool,
}

impl<G: ProcessGateway, C: Clock> PhaseEngine<G, C> {
    pub fn new(
        gateway: G,
        clock: C,
        registry: RunRegistry,
        tools: ToolCommands,
        command_timeout: Duration,
    ) -> Self {
        Self {
            gateway,
            clock,
            registry,
            tools,
            command_timeout,
            stream_supported: false,
        }
    }

    /// Set whether the runtime supports stream output (resolved once by the
    /// supervisor).
    pub fn with_stream_supported(mut self, supported: bool) -> Self {
        self.stream_supported = supported;
        self
    }

    pub fn registry(&self) -> &RunRegistry {
        &self.registry
    }

    /// Execute from the run's current phase through validation.
    ///
    /// On success the run is finalized as completed; on error a failed
    /// terminal state is written before the error propagates.
    pub async fn execute(&self, run: &mut Run) -> Result<(), EngineError> {
        let workdir = run
            .worktree_path
            .clone()
            .unwrap_or_else(|| self.registry.paths().repo_root().to_path_buf());

        if run.started_at.is_empty() {
            run.started_at = self.now_rfc3339();
        }
        run.orchestrator_pid = Some(std::process::id());
        self.registry.put(run)?;

        let result = self.execute_phases(run, &workdir).await;
        match result {
            Ok(()) => {
                run.finalize("completed", "all phases passed", self.now_rfc3339());
                self.registry.put(run)?;
                self.write_final_report(run, &workdir);
                Ok(())
            }
            Err(e) => {
                if !run.is_terminal() {
                    let status = if matches!(e, EngineError::Cancelled) {
                        "cancelled"
                    } else {
                        "failed"
                    };
                    run.finalize(status, e.to_string(), self.now_rfc3339());
                    self.registry.put(run)?;
                }
                Err(e)
            }
        }
    }

    async fn execute_phases(&self, run: &mut Run, workdir: &Path) -> Result<(), EngineError> {
        let mut phase = run.phase;
        loop {
            run.phase = phase;
            self.registry.put(run)?;
            self.run_phase(run, phase, workdir).await?;

            match phase.next() {
                Some(next) => phase = next,
                None => return Ok(()),
            }
        }
    }

    async fn run_phase(
        &self,
        run: &mut Run,
        phase: Phase,
        workdir: &Path,
    ) -> Result<(), EngineError> {
        let mut failures: Vec<String> = Vec::new();

        loop {
            let attempt = run.bump_attempt(phase);
            self.registry.put(run)?;

            tracing::info!(
                run_id = %run.run_id,
                phase = %phase,
                attempt,
                "invoking runtime"
            );

            let prompt = self.build_prompt(run, phase, workdir, &failures);
            let invocation = build_invocation(&self.tools, &prompt, self.stream_supported);
            let args = invocation.arg_refs();
            let result = self
                .gateway
                .run_capture(self.command_timeout, workdir, &invocation.program, &args)
                .await;

            // Progress heartbeat regardless of outcome
            self.registry.touch(&run.run_id)?;

            match result {
                Ok(output) => {
                    self.write_summary(phase, workdir, &output);
                    let verdict = Verdict::detect_inline(&output).unwrap_or(Verdict::Pass);
                    run.record_verdict(phase, verdict);
                    self.registry.put(run)?;

                    // WARN advances an intermediate phase, but completing
                    // the run requires validation to end in a clean PASS.
                    let advances = if phase == Phase::FINAL {
                        verdict == Verdict::Pass
                    } else {
                        verdict.is_passing()
                    };

                    if !advances {
                        failures.push(format!(
                            "attempt {} ended with verdict {}",
                            attempt, verdict
                        ));
                        if attempt >= PHASE_ATTEMPT_CAP {
                            return Err(EngineError::RetriesExhausted {
                                phase: phase.to_string(),
                                attempts: attempt,
                            });
                        }
                        continue;
                    }
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(
                        run_id = %run.run_id,
                        phase = %phase,
                        attempt,
                        error = %e,
                        "runtime invocation failed"
                    );
                    failures.push(format!("attempt {} failed: {}", attempt, e));
                    if attempt >= PHASE_ATTEMPT_CAP {
                        return Err(e.into());
                    }
                }
            }
        }
    }

    /// Prompt context: goal, prior summaries, verdicts so far, budget hint,
    /// and the failure history for retries.
    fn build_prompt(
        &self,
        run: &Run,
        phase: Phase,
        workdir: &Path,
        failures: &[String],
    ) -> String {
        let mut prompt = format!(
            "Phase {} ({}) for run {}.\nGoal: {}\n",
            phase.number(),
            phase,
            run.run_id,
            run.goal
        );

        if run.options.fast_path {
            prompt.push_str("Complexity: fast. Keep ceremony minimal.\n");
        }

        for prior in Phase::all() {
            if prior >= phase {
                break;
            }
            let path = self.summary_path(prior, workdir);
            if let Ok(summary) = fs::read_to_string(&path) {
                prompt.push_str(&format!(
                    "\nSummary of phase {} ({}):\n{}\n",
                    prior.number(),
                    prior,
                    summary.trim()
                ));
            }
        }

        if !run.verdicts.is_empty() {
            prompt.push_str("\nVerdicts so far:\n");
            for (key, verdict) in &run.verdicts {
                prompt.push_str(&format!("- {}: {}\n", key, verdict));
            }
        }

        if !failures.is_empty() {
            prompt.push_str("\nEarlier attempts at this phase failed:\n");
            for failure in failures {
                prompt.push_str(&format!("- {}\n", failure));
            }
        }

        prompt.push_str(
            "\nStay within the session context budget; summarize before it tightens.\n",
        );
        prompt.push_str(&format!(
            "End with a verdict line: {} PASS, WARN, or FAIL.\n",
            phase.verdict_key()
        ));
        prompt
    }

    fn summary_path(&self, phase: Phase, workdir: &Path) -> PathBuf {
        ao_core::RpiPaths::new(workdir)
            .state_dir()
            .join(phase.summary_file())
    }

    fn write_summary(&self, phase: Phase, workdir: &Path, output: &str) {
        let path = self.summary_path(phase, workdir);
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        if let Err(e) = fs::write(&path, output) {
            tracing::warn!(path = %path.display(), error = %e, "summary write failed");
        }
    }

    fn write_final_report(&self, run: &Run, workdir: &Path) {
        let mut report = format!(
            "# Run {} final report\n\nGoal: {}\nEpic: {}\n\n## Verdicts\n\n",
            run.run_id, run.goal, run.epic_id
        );
        for (key, verdict) in &run.verdicts {
            report.push_str(&format!("- {}: {}\n", key, verdict));
        }
        let path = ao_core::RpiPaths::new(workdir)
            .state_dir()
            .join("final-report.md");
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        if let Err(e) = fs::write(&path, report) {
            tracing::warn!(path = %path.display(), error = %e, "final report write failed");
        }
    }

    fn now_rfc3339(&self) -> String {
        let ms = self.clock.epoch_ms();
        chrono::DateTime::<chrono::Utc>::from_timestamp_millis(ms as i64)
            .map(|t| t.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
            .unwrap_or_default()
    }
}

#[cfg(test)]
#[path = "phases_tests.rs"]
mod tests;
