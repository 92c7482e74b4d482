// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ao status`: render active and historical runs.

use crate::output::OutputFormat;
use anyhow::Result;
use ao_adapters::SystemGateway;
use ao_core::{truncate_display, SystemClock, ToolCommands};
use ao_engine::{DiscoveredRun, DiscoveryService};
use clap::Args;
use std::path::Path;
use std::time::Duration;

/// Poll interval for `--watch`.
const WATCH_INTERVAL: Duration = Duration::from_secs(5);

/// Width budget for goal strings in the text view.
const GOAL_WIDTH: usize = 48;

#[derive(Args)]
pub struct StatusArgs {
    /// Poll every 5 seconds instead of rendering once
    #[arg(long)]
    pub watch: bool,
}

pub async fn run(cwd: &Path, args: StatusArgs, format: OutputFormat) -> Result<i32> {
    let tools = ToolCommands::from_env()?;
    let service = DiscoveryService::new(SystemGateway::new(), SystemClock, tools.tmux_command);

    loop {
        let (active, historical) = service.discover(cwd).await;
        render(&active, &historical, format)?;

        if !args.watch {
            return Ok(0);
        }
        tokio::time::sleep(WATCH_INTERVAL).await;
        println!();
    }
}

fn render(active: &[DiscoveredRun], historical: &[DiscoveredRun], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let obj = serde_json::json!({
                "active": active.iter().map(run_json).collect::<Vec<_>>(),
                "historical": historical.iter().map(run_json).collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&obj)?);
        }
        OutputFormat::Text => {
            if active.is_empty() && historical.is_empty() {
                println!("no runs found");
                return Ok(());
            }
            if !active.is_empty() {
                println!("ACTIVE");
                for d in active {
                    println!(
                        "  {}  phase {}  cycle {}  {}",
                        d.run.run_id,
                        d.run.phase.number(),
                        d.run.cycle,
                        truncate_display(&d.run.goal, GOAL_WIDTH)
                    );
                }
            }
            if !historical.is_empty() {
                println!("HISTORICAL");
                for d in historical {
                    println!(
                        "  {}  {}  {}",
                        d.run.run_id,
                        d.status,
                        truncate_display(&d.run.goal, GOAL_WIDTH)
                    );
                }
            }
        }
    }
    Ok(())
}

fn run_json(d: &DiscoveredRun) -> serde_json::Value {
    serde_json::json!({
        "run_id": d.run.run_id,
        "goal": d.run.goal,
        "phase": d.run.phase.number(),
        "cycle": d.run.cycle,
        "status": d.status,
        "alive": d.alive,
        "worktree": d.run.worktree_path,
        "root": d.root,
        "verdicts": d.run.verdicts,
        "terminal_reason": d.run.terminal_reason,
    })
}
