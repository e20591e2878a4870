// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! heimdall-monitor - supervisor CLI for the markdown documentation watcher.
//!
//! This binary never links against `monitor-daemon` directly: it spawns
//! `heimdall-monitord` as a detached child and thereafter communicates with
//! it only through the filesystem artifacts under `.heimdall/` (the lock
//! file, PID file, and status record).

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod commands;
mod output;
mod supervisor;

use clap::{Parser, Subcommand};
use commands::monitor;

#[derive(Parser)]
#[command(
    name = "heimdall-monitor",
    version,
    about = "Supervisor for the heimdall markdown-documentation monitor"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the monitor daemon for a project
    Start(monitor::StartArgs),
    /// Stop the monitor daemon for a project
    Stop(monitor::StopArgs),
    /// Stop then start the monitor daemon
    Restart(monitor::RestartArgs),
    /// Report whether the monitor daemon is running
    Status(monitor::StatusArgs),
    /// Report the monitor daemon's health based on its status record
    Health(monitor::HealthArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let code = match cli.command {
        Commands::Start(args) => monitor::start(args).await,
        Commands::Stop(args) => monitor::stop(args).await,
        Commands::Restart(args) => monitor::restart(args).await,
        Commands::Status(args) => monitor::status(args),
        Commands::Health(args) => monitor::health(args),
    };

    std::process::exit(code);
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
