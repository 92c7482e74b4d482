// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ao cancel`: terminate runs and clean their resources.

use anyhow::Result;
use ao_adapters::{SystemGateway, UnixProcessTree};
use ao_core::{RunId, SystemClock, ToolCommands};
use ao_engine::{Cancellation, DiscoveryService};
use clap::Args;
use std::path::Path;

#[derive(Args)]
pub struct CancelArgs {
    /// Run IDs to cancel
    #[arg(value_name = "RUN_ID", required_unless_present = "all")]
    pub run_ids: Vec<String>,

    /// Cancel every discovered run
    #[arg(long, conflicts_with = "run_ids")]
    pub all: bool,
}

pub async fn run(cwd: &Path, args: CancelArgs) -> Result<i32> {
    let tools = ToolCommands::from_env()?;
    let gateway = SystemGateway::new();
    let service = DiscoveryService::new(gateway.clone(), SystemClock, tools.tmux_command.clone());
    let cancellation = Cancellation::new(gateway, UnixProcessTree::new(), tools.tmux_command);

    let targets: Vec<(std::path::PathBuf, ao_core::Run)> = if args.all {
        let (active, historical) = service.discover(cwd).await;
        active
            .into_iter()
            .chain(historical)
            .map(|d| (d.root, d.run))
            .collect()
    } else {
        let mut found = Vec::new();
        for id in &args.run_ids {
            let run_id = RunId::new(id.as_str());
            match service.locate_run(cwd, &run_id).await {
                Some((root, run)) => found.push((root, run)),
                // Cancellation is idempotent: nothing to find means
                // nothing left to clean
                None => println!("{} already clean", id),
            }
        }
        found
    };

    let mut failures = 0;
    for (root, run) in targets {
        match cancellation.cancel(&root, &run).await {
            Ok(outcome) => {
                println!(
                    "cancelled {} (killed {} processes, {} markers)",
                    run.run_id,
                    outcome.killed_pids.len(),
                    outcome.markers_deleted
                );
            }
            Err(e) => {
                eprintln!("cancel {} failed: {}", run.run_id, e);
                failures += 1;
            }
        }
    }

    Ok(if failures > 0 { 1 } else { 0 })
}
