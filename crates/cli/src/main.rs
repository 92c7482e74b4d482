// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ao - Agent Operations CLI

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{cancel, init, resume, status, supervise, worktree};
use output::OutputFormat;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "ao",
    version,
    about = "Agent Operations - a phased run supervisor for coding agents"
)]
struct Cli {
    /// Change to <dir> before doing anything
    #[arg(short = 'C', global = true, value_name = "DIR")]
    directory: Option<PathBuf>,

    /// Output format
    #[arg(
        short = 'o',
        long = "output",
        value_enum,
        default_value_t,
        global = true
    )]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the .agents state layout in this repo
    Init,
    /// Show active and historical runs
    Status(status::StatusArgs),
    /// Terminate runs and clean their resources
    Cancel(cancel::CancelArgs),
    /// Continue an existing run
    Resume(resume::ResumeArgs),
    /// Worktree maintenance
    Worktree(worktree::WorktreeArgs),
    /// Run the supervisor loop for a goal
    Supervise(supervise::SuperviseArgs),
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn dispatch(cli: Cli) -> Result<i32> {
    let cwd = std::env::current_dir()?;
    match cli.command {
        Commands::Init => init::run(&cwd),
        Commands::Status(args) => status::run(&cwd, args, cli.output).await,
        Commands::Cancel(args) => cancel::run(&cwd, args).await,
        Commands::Resume(args) => resume::run(&cwd, args).await,
        Commands::Worktree(args) => worktree::run(&cwd, args, cli.output).await,
        Commands::Supervise(args) => supervise::run(&cwd, args).await,
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Some(dir) = &cli.directory {
        if let Err(e) = std::env::set_current_dir(dir) {
            eprintln!("error: cannot change to {}: {}", dir.display(), e);
            std::process::exit(2);
        }
    }

    let code = match dispatch(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            1
        }
    };
    std::process::exit(code);
}
