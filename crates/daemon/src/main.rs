// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Heimdall Monitor Daemon (heimdall-monitord)
//!
//! Resident process that watches a project's markdown documentation tree
//! and dispatches changes to the ingestion command.
//!
//! Started and supervised by the `heimdall-monitor` CLI; not meant to be
//! invoked directly by an operator.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use monitor_core::config::{ConfigOverrides, MonitorConfig};
use monitor_core::MonitorError;
use monitor_daemon::{logging, Daemon};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("heimdall-monitord {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("heimdall-monitord {}", env!("CARGO_PKG_VERSION"));
                println!("Heimdall Monitor Daemon - watches a project's markdown tree");
                println!("and dispatches changes to the ingestion command.");
                println!();
                println!("Normally started by `heimdall-monitor start`, not invoked directly.");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: heimdall-monitord [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let project_root = std::env::var("MONITOR_PROJECT_ROOT")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| std::env::current_dir().expect("current directory must be readable"));

    let config = match MonitorConfig::load(&project_root, &ConfigOverrides::default()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: invalid configuration: {e}");
            std::process::exit(e.start_exit_code());
        }
    };

    logging::rotate_log_if_needed(&config.log_path());
    let _log_guard = logging::setup_logging(&config.log_path())?;

    info!(project_root = %config.project_root.display(), "starting heimdall monitor daemon");

    let mut daemon = match Daemon::start(config).await {
        Ok(d) => d,
        Err(MonitorError::AlreadyHeld) => {
            eprintln!("heimdall-monitord is already running for this project");
            std::process::exit(MonitorError::AlreadyHeld.start_exit_code());
        }
        Err(e) => {
            error!("failed to start daemon: {e}");
            std::process::exit(e.start_exit_code());
        }
    };

    println!("READY");

    daemon.run().await?;
    info!("daemon exited cleanly");
    Ok(())
}
