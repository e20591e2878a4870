// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `heimdall-monitor start|stop|restart|status|health`.
//!
//! Each handler returns its process exit code directly rather than an
//! `anyhow::Result`, since every outcome here (including "already running",
//! "not running", "stale") is an expected branch of the contract, not a
//! failure to propagate up a call stack.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use monitor_core::config::{ConfigOverrides, MonitorConfig};

use crate::output::{print_health, print_status, OutputFormat};
use crate::supervisor::{self, StopOutcome, SupervisorStatus};

const DEFAULT_START_DEADLINE: Duration = Duration::from_secs(10);
const DEFAULT_STOP_TIMEOUT_SECS: u64 = 30;

#[derive(Args)]
pub struct StartArgs {
    /// Project root to watch (defaults to the current directory)
    #[arg(long = "project-root", value_name = "PATH")]
    pub project_root: Option<PathBuf>,
}

#[derive(Args)]
pub struct StopArgs {
    #[arg(long = "project-root", value_name = "PATH")]
    pub project_root: Option<PathBuf>,
    /// Seconds to wait for a graceful stop before hard-killing
    #[arg(long = "timeout", default_value_t = DEFAULT_STOP_TIMEOUT_SECS)]
    pub timeout: u64,
}

#[derive(Args)]
pub struct RestartArgs {
    #[arg(long = "project-root", value_name = "PATH")]
    pub project_root: Option<PathBuf>,
    #[arg(long = "timeout", default_value_t = DEFAULT_STOP_TIMEOUT_SECS)]
    pub timeout: u64,
}

#[derive(Args)]
pub struct StatusArgs {
    #[arg(long = "project-root", value_name = "PATH")]
    pub project_root: Option<PathBuf>,
    /// Emit machine-readable JSON instead of text
    #[arg(long = "json")]
    pub json: bool,
}

#[derive(Args)]
pub struct HealthArgs {
    #[arg(long = "project-root", value_name = "PATH")]
    pub project_root: Option<PathBuf>,
    #[arg(long = "json")]
    pub json: bool,
}

fn resolve_project_root(arg: Option<PathBuf>) -> PathBuf {
    arg.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

fn load_config(project_root: &std::path::Path) -> Result<MonitorConfig, i32> {
    MonitorConfig::load(project_root, &ConfigOverrides::default()).map_err(|e| {
        eprintln!("error: invalid configuration: {e}");
        e.start_exit_code()
    })
}

/// `monitor start`: 0 success; 2 already running; 3 failed to start;
/// 4 config invalid.
pub async fn start(args: StartArgs) -> i32 {
    let project_root = resolve_project_root(args.project_root);
    let config = match load_config(&project_root) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let (existing, _) = supervisor::status(&config);
    if existing == SupervisorStatus::Running {
        eprintln!("heimdall-monitor is already running for this project");
        return 2;
    }

    match supervisor::start(&config, DEFAULT_START_DEADLINE).await {
        Ok(()) => {
            println!("heimdall-monitor started for {}", project_root.display());
            0
        }
        Err(e) => {
            eprintln!("error: failed to start monitor: {e}");
            3
        }
    }
}

/// `monitor stop`: 0 stopped; 1 not running; 5 timeout hard-killed.
pub async fn stop(args: StopArgs) -> i32 {
    let project_root = resolve_project_root(args.project_root);
    let config = match load_config(&project_root) {
        Ok(c) => c,
        Err(code) => return code,
    };

    match supervisor::stop(&config, Duration::from_secs(args.timeout)).await {
        Ok(StopOutcome::NotRunning) => {
            println!("heimdall-monitor is not running for this project");
            1
        }
        Ok(StopOutcome::Stopped) => {
            println!("heimdall-monitor stopped");
            0
        }
        Ok(StopOutcome::TimedOutKilled) => {
            eprintln!("heimdall-monitor did not stop within {}s, hard-killed", args.timeout);
            5
        }
        Err(e) => {
            eprintln!("error: failed to stop monitor: {e}");
            5
        }
    }
}

/// `monitor restart`: 0, or the worst of the stop/start codes.
/// "Not running" during the stop half is not itself a failure to restart,
/// so it is normalized to 0 before combining.
pub async fn restart(args: RestartArgs) -> i32 {
    let project_root = resolve_project_root(args.project_root.clone());

    let stop_code = stop(StopArgs {
        project_root: Some(project_root.clone()),
        timeout: args.timeout,
    })
    .await;
    let stop_code = if stop_code == 1 { 0 } else { stop_code };

    let start_code = start(StartArgs {
        project_root: Some(project_root),
    })
    .await;

    stop_code.max(start_code)
}

/// `monitor status`: 0 running; 1 not running; 6 stale.
pub fn status(args: StatusArgs) -> i32 {
    let project_root = resolve_project_root(args.project_root);
    let format = if args.json { OutputFormat::Json } else { OutputFormat::Text };

    let config = match load_config(&project_root) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let (status, snapshot) = supervisor::status(&config);
    print_status(status, snapshot.as_ref(), format);

    match status {
        SupervisorStatus::Running => 0,
        SupervisorStatus::NotConfigured | SupervisorStatus::NotRunning => 1,
        SupervisorStatus::StaleStatus => 6,
    }
}

/// `monitor health`: 0 healthy; 7 degraded; 8 unhealthy.
pub fn health(args: HealthArgs) -> i32 {
    let project_root = resolve_project_root(args.project_root);
    let format = if args.json { OutputFormat::Json } else { OutputFormat::Text };

    let config = match load_config(&project_root) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let report = supervisor::health(&config);
    print_health(report.as_ref(), format);

    match report {
        Some(r) => r.verdict.exit_code(),
        None => 8,
    }
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
