// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ao resume`: continue an existing run.

use anyhow::Result;
use ao_adapters::{SystemGateway, UnixProcessTree};
use ao_core::config::{SupervisorConfig, ToolCommands};
use ao_core::{Phase, RunId, SystemClock};
use ao_engine::Supervisor;
use clap::Args;
use std::path::Path;

#[derive(Args)]
pub struct ResumeArgs {
    /// Run ID to resume
    #[arg(value_name = "RUN_ID")]
    pub run_id: String,

    /// Start phase override (1-3 or a phase name)
    #[arg(long, value_name = "PHASE")]
    pub from: Option<Phase>,
}

pub async fn run(cwd: &Path, args: ResumeArgs) -> Result<i32> {
    let config = SupervisorConfig {
        run_id: Some(RunId::new(args.run_id)),
        start_phase: args.from,
        tools: ToolCommands::from_env()?,
        ..SupervisorConfig::default()
    };

    let supervisor = Supervisor::new(
        SystemGateway::new(),
        SystemClock,
        UnixProcessTree::new(),
        cwd,
        config,
    );

    let summary = supervisor.run().await?;
    if summary.completed {
        println!("run {} complete (epic {})", summary.run_id, summary.epic_id);
        Ok(0)
    } else if summary.kill_switch {
        println!("run {} stopped by kill switch", summary.run_id);
        Ok(0)
    } else {
        eprintln!("run {} did not complete", summary.run_id);
        Ok(1)
    }
}
