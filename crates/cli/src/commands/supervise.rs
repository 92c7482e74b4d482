// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ao supervise`: run the supervisor loop for a goal.

use super::duration_arg;
use anyhow::Result;
use ao_adapters::{SystemGateway, UnixProcessTree};
use ao_core::config::{
    BdSyncPolicy, FailurePolicy, GateCommands, GatePolicy, LandingPolicy, SupervisorConfig,
    ToolCommands,
};
use ao_core::{Phase, RunId, SystemClock};
use ao_engine::Supervisor;
use clap::Args;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Args)]
pub struct SuperviseArgs {
    /// Goal the run should accomplish
    #[arg(long, required_unless_present = "run_id")]
    pub goal: Option<String>,

    /// Resume an existing run instead of starting a new one
    #[arg(long, value_name = "RUN_ID")]
    pub run_id: Option<String>,

    /// Start phase override (1-3 or a phase name)
    #[arg(long, value_name = "PHASE")]
    pub from: Option<Phase>,

    /// Maximum supervisor cycles
    #[arg(long, default_value_t = 1)]
    pub cycles: u32,

    /// Retries per failed cycle (continue policy only)
    #[arg(long, default_value_t = 0)]
    pub cycle_retries: u32,

    /// Delay between cycles
    #[arg(long, value_parser = duration_arg, default_value = "0s")]
    pub cycle_delay: Duration,

    /// Upper bound for the exponential retry backoff
    #[arg(long, value_parser = duration_arg, default_value = "60s")]
    pub retry_backoff: Duration,

    #[arg(long, value_name = "POLICY", default_value = "stop")]
    pub failure_policy: FailurePolicy,

    #[arg(long, value_name = "POLICY", default_value = "off")]
    pub gate_policy: GatePolicy,

    #[arg(long, value_name = "POLICY", default_value = "off")]
    pub landing_policy: LandingPolicy,

    #[arg(long, value_name = "POLICY", default_value = "auto")]
    pub bd_sync_policy: BdSyncPolicy,

    /// Hold the single-flight supervisor lease
    #[arg(long)]
    pub lease: bool,

    /// Kill switch location (default .agents/rpi/KILL)
    #[arg(long, value_name = "PATH")]
    pub kill_switch_path: Option<PathBuf>,

    /// Deadline for each external command
    #[arg(long, value_parser = duration_arg, default_value = "10m")]
    pub command_timeout: Duration,

    /// Gate script run before landing
    #[arg(long, value_name = "CMD")]
    pub validate_fast: Option<String>,

    /// Security gate script run before landing
    #[arg(long, value_name = "CMD")]
    pub security_gate: Option<String>,

    /// Landing commit message template
    #[arg(long, value_name = "TEMPLATE")]
    pub commit_template: Option<String>,
}

impl SuperviseArgs {
    pub fn into_config(self) -> Result<SupervisorConfig> {
        let defaults = SupervisorConfig::default();
        Ok(SupervisorConfig {
            goal: self.goal.unwrap_or_default(),
            run_id: self.run_id.map(RunId::new),
            start_phase: self.from,
            cycles: self.cycles,
            cycle_retries: self.cycle_retries,
            cycle_delay: self.cycle_delay,
            retry_backoff: self.retry_backoff,
            failure_policy: self.failure_policy,
            gate_policy: self.gate_policy,
            landing_policy: self.landing_policy,
            bd_sync_policy: self.bd_sync_policy,
            use_lease: self.lease,
            kill_switch_path: self.kill_switch_path,
            command_timeout: self.command_timeout,
            commit_template: self.commit_template.unwrap_or(defaults.commit_template),
            gates: GateCommands {
                validate_fast: self.validate_fast,
                security_gate: self.security_gate,
            },
            tools: ToolCommands::from_env()?,
        })
    }
}

pub async fn run(cwd: &Path, args: SuperviseArgs) -> Result<i32> {
    let config = args.into_config()?;
    let supervisor = Supervisor::new(
        SystemGateway::new(),
        SystemClock,
        UnixProcessTree::new(),
        cwd,
        config,
    );

    let summary = supervisor.run().await?;
    if summary.kill_switch {
        println!("run {} stopped by kill switch", summary.run_id);
        return Ok(0);
    }
    if summary.completed {
        println!(
            "run {} complete (epic {}) after {} cycle(s)",
            summary.run_id, summary.epic_id, summary.cycles_run
        );
        return Ok(0);
    }
    eprintln!(
        "run {} did not complete within {} cycle(s)",
        summary.run_id, summary.cycles_run
    );
    Ok(1)
}
