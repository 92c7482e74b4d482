// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ao worktree`: worktree maintenance (GC of stale run worktrees).

use super::duration_arg;
use crate::output::OutputFormat;
use anyhow::Result;
use ao_adapters::{parse_session_name, SystemGateway, TmuxProbe};
use ao_core::{format_elapsed, RunId, SystemClock, ToolCommands};
use ao_core::clock::Clock as _;
use ao_engine::{DiscoveryService, WorktreeManager};
use clap::{Args, Subcommand};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

#[derive(Args)]
pub struct WorktreeArgs {
    #[command(subcommand)]
    pub command: WorktreeCommand,
}

#[derive(Subcommand)]
pub enum WorktreeCommand {
    /// Remove stale run worktrees and orphaned tmux sessions
    Gc(GcArgs),
}

#[derive(Args)]
pub struct GcArgs {
    /// Age before a worktree becomes a deletion candidate
    #[arg(long, value_parser = duration_arg, default_value = "24h")]
    pub stale_after: Duration,

    /// Actually delete; the default is a dry-run listing
    #[arg(long)]
    pub prune: bool,

    /// Also kill orphaned ao-rpi tmux sessions
    #[arg(long)]
    pub clean_tmux: bool,

    /// Collect dirty worktrees too
    #[arg(long)]
    pub include_dirty: bool,
}

pub async fn run(cwd: &Path, args: WorktreeArgs, format: OutputFormat) -> Result<i32> {
    match args.command {
        WorktreeCommand::Gc(gc) => run_gc(cwd, gc, format).await,
    }
}

async fn run_gc(cwd: &Path, args: GcArgs, format: OutputFormat) -> Result<i32> {
    let tools = ToolCommands::from_env()?;
    let gateway = SystemGateway::new();
    let clock = SystemClock;
    let manager = WorktreeManager::new(gateway.clone(), cwd);

    // Active runs are never collected
    let service = DiscoveryService::new(gateway.clone(), clock.clone(), tools.tmux_command.clone());
    let (active, _) = service.discover(cwd).await;
    let active_ids: HashSet<RunId> = active.into_iter().map(|d| d.run.run_id).collect();

    let candidates = manager
        .gc_candidates(clock.wall(), args.stale_after, &active_ids, args.include_dirty)
        .await;

    match format {
        OutputFormat::Json => {
            let obj = serde_json::json!({
                "pruned": args.prune,
                "candidates": candidates.iter().map(|c| serde_json::json!({
                    "run_id": c.run_id,
                    "path": c.path,
                    "age_secs": c.age.as_secs(),
                    "dirty": c.dirty,
                })).collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&obj)?);
        }
        OutputFormat::Text => {
            if candidates.is_empty() {
                println!("no stale worktrees");
            }
            for c in &candidates {
                let marker = if c.dirty { " (dirty)" } else { "" };
                println!(
                    "{}  {}  idle {}{}",
                    c.run_id,
                    c.path.display(),
                    format_elapsed(c.age.as_secs()),
                    marker
                );
            }
        }
    }

    if args.prune {
        for c in &candidates {
            manager.remove(&c.run_id).await?;
            println!("removed {}", c.path.display());
        }
    }

    if args.clean_tmux {
        clean_orphan_sessions(&gateway, &tools.tmux_command, &active_ids).await;
    }

    Ok(0)
}

/// Kill ao-rpi sessions whose run is not active anywhere.
async fn clean_orphan_sessions(
    gateway: &SystemGateway,
    tmux_command: &str,
    active_ids: &HashSet<RunId>,
) {
    let probe = TmuxProbe::new(gateway.clone(), tmux_command);
    for session in probe.list().await {
        if active_ids.contains(&session.run_id) {
            continue;
        }
        if parse_session_name(&session.name).is_some() {
            probe.kill_run_sessions(&session.run_id).await;
            println!("killed orphaned tmux sessions for {}", session.run_id);
        }
    }
}
