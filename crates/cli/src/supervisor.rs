// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor service: spawns the monitor daemon as a detached child,
//! tracks its PID in `.heimdall/monitor.pid`, and answers status/health
//! queries by polling the daemon's own status record.
//!
//! The CLI never links against the daemon's code, it only spawns the
//! binary and reads filesystem artifacts it leaves behind.

use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use fs2::FileExt;
use monitor_core::config::MonitorConfig;
use monitor_core::health::{compute_health, HealthReport};
use monitor_core::{DaemonPhase, StatusSnapshot};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("failed to locate heimdall-monitord binary")]
    BinaryNotFound,
    #[error("failed to spawn daemon: {0}")]
    SpawnFailed(#[from] std::io::Error),
    #[error("daemon did not report Running within {0:?}")]
    StartTimeout(Duration),
    #[error("daemon exited during startup with code {0:?}")]
    StartupFailed(Option<i32>),
}

/// Reported lifecycle state, from the supervisor's outside view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorStatus {
    NotConfigured,
    NotRunning,
    Running,
    StaleStatus,
}

/// Outcome of a `monitor stop` invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// Nothing was running; there was nothing to stop.
    NotRunning,
    /// The daemon exited on its own within `timeout` after the graceful signal.
    Stopped,
    /// The daemon did not exit gracefully and had to be hard-killed.
    TimedOutKilled,
}

/// Locate the `heimdall-monitord` binary: an env override, a sibling of the
/// current executable, or a bare name resolved via `$PATH`.
fn find_daemon_binary() -> Result<PathBuf, SupervisorError> {
    if let Ok(path) = std::env::var("HEIMDALL_MONITORD_PATH") {
        return Ok(PathBuf::from(path));
    }

    if let Ok(current_exe) = std::env::current_exe() {
        if let Some(dir) = current_exe.parent() {
            let sibling = dir.join("heimdall-monitord");
            if sibling.exists() {
                return Ok(sibling);
            }
        }
    }

    Ok(PathBuf::from("heimdall-monitord"))
}

/// Spawn the daemon as a detached child: stdio redirected to the project's
/// log path, stdin null, working directory moved off whatever directory the
/// operator happened to be standing in, and (on Unix) placed in its own
/// session so it survives the CLI's exit and isn't tied to the operator's
/// shell job control or controlling terminal.
fn spawn_detached(config: &MonitorConfig) -> Result<std::process::Child, SupervisorError> {
    let binary = find_daemon_binary()?;

    if let Some(parent) = config.log_path().parent() {
        std::fs::create_dir_all(parent)?;
    }
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(config.log_path())?;
    let log_file_err = log_file.try_clone()?;

    let mut cmd = Command::new(&binary);
    cmd.env("MONITOR_PROJECT_ROOT", &config.project_root)
        .current_dir(config.heimdall_dir())
        .stdin(Stdio::null())
        .stdout(Stdio::from(log_file))
        .stderr(Stdio::from(log_file_err));

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
        // SAFETY: setsid() is async-signal-safe and the only thing this
        // hook does between fork and exec.
        unsafe {
            cmd.pre_exec(|| {
                nix::unistd::setsid().map_err(|e| std::io::Error::from_raw_os_error(e as i32))?;
                Ok(())
            });
        }
    }

    cmd.spawn().map_err(SupervisorError::SpawnFailed)
}

/// `monitor start`: spawn the daemon, wait for it to report Running (or
/// exit), and write the supervisor PID file on success.
pub async fn start(config: &MonitorConfig, deadline: Duration) -> Result<(), SupervisorError> {
    let mut child = spawn_detached(config)?;
    let pid = child.id();

    let status_path = config.status_path();
    let started = Instant::now();

    loop {
        if let Ok(Some(exit_status)) = child.try_wait() {
            return Err(SupervisorError::StartupFailed(exit_status.code()));
        }

        if let Ok(snapshot) = StatusSnapshot::read(&status_path) {
            if snapshot.state == DaemonPhase::Running && snapshot.pid == pid {
                write_pid_file(config, pid)?;
                return Ok(());
            }
        }

        if started.elapsed() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Err(SupervisorError::StartTimeout(deadline));
        }

        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

/// `monitor stop`: graceful signal, bounded wait, hard-kill on expiry.
/// Returns `true` if a live daemon was stopped, `false` if nothing was
/// running.
pub async fn stop(config: &MonitorConfig, timeout: Duration) -> Result<StopOutcome, SupervisorError> {
    let pid = match read_pid_file(config) {
        Some(pid) if process_exists(pid) => pid,
        _ => {
            cleanup_pid_file(config);
            return Ok(StopOutcome::NotRunning);
        }
    };

    send_signal(pid, Signal::Term);

    let started = Instant::now();
    while started.elapsed() < timeout {
        if !process_exists(pid) {
            cleanup_pid_file(config);
            return Ok(StopOutcome::Stopped);
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    send_signal(pid, Signal::Kill);
    let started = Instant::now();
    while started.elapsed() < Duration::from_secs(5) {
        if !process_exists(pid) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    cleanup_pid_file(config);
    Ok(StopOutcome::TimedOutKilled)
}

/// `monitor status`: classify the supervisor's outside view, cleaning up
/// stale PID files as a side effect.
///
/// A PID that answers `kill(pid, 0)` is not by itself evidence the daemon is
/// alive: the process could be unrelated, reusing a PID the kernel recycled
/// after the daemon crashed. The lock is the authoritative signal, so
/// `status` cross-checks it directly rather than trusting the PID file or
/// the status record alone.
pub fn status(config: &MonitorConfig) -> (SupervisorStatus, Option<StatusSnapshot>) {
    if !config.project_root.exists() {
        return (SupervisorStatus::NotConfigured, None);
    }

    let pid = match read_pid_file(config) {
        Some(pid) => pid,
        None => return (SupervisorStatus::NotRunning, None),
    };

    if !process_exists(pid) || !lock_is_held(config) {
        cleanup_pid_file(config);
        return (SupervisorStatus::NotRunning, None);
    }

    match StatusSnapshot::read(&config.status_path()) {
        Ok(snapshot) if snapshot.pid == pid && snapshot.state == DaemonPhase::Running => {
            (SupervisorStatus::Running, Some(snapshot))
        }
        Ok(snapshot) => (SupervisorStatus::StaleStatus, Some(snapshot)),
        Err(_) => (SupervisorStatus::StaleStatus, None),
    }
}

/// `monitor health`: deeper check beyond liveness — reads the status
/// record's counters and computes a verdict.
///
/// Cross-checks the singleton lock first: a status record left behind by a
/// daemon that crashed without releasing the lock is not itself proof the
/// lock is free (and vice versa, a file that still says `Running` is not
/// proof anything is alive), so a lock that isn't held always reports
/// `Unhealthy` regardless of what the record claims.
pub fn health(config: &MonitorConfig) -> Option<HealthReport> {
    let snapshot = StatusSnapshot::read(&config.status_path()).ok()?;

    if !lock_is_held(config) {
        return Some(HealthReport {
            verdict: monitor_core::health::HealthVerdict::Unhealthy,
            reasons: vec!["singleton lock is not held; status record is stale".to_string()],
        });
    }

    Some(compute_health(
        &snapshot,
        config.health_stale_secs,
        config.health_failure_rate,
        std::time::SystemTime::now(),
    ))
}

/// Probe `config.lock_path()` with a non-blocking exclusive lock attempt,
/// releasing immediately on success. A successful acquisition means no live
/// process holds it; `WouldBlock` means one does. Any other I/O error (lock
/// file missing, unreadable) is treated as "not held" since there is nothing
/// for a daemon to be holding.
fn lock_is_held(config: &MonitorConfig) -> bool {
    let path = config.lock_path();
    let file = match std::fs::OpenOptions::new().read(true).write(true).open(&path) {
        Ok(file) => file,
        Err(_) => return false,
    };

    match file.try_lock_exclusive() {
        Ok(()) => {
            let _ = FileExt::unlock(&file);
            false
        }
        Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => true,
        Err(_) => false,
    }
}

fn write_pid_file(config: &MonitorConfig, pid: u32) -> std::io::Result<()> {
    if let Some(parent) = config.pid_path().parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(config.pid_path(), pid.to_string())
}

fn read_pid_file(config: &MonitorConfig) -> Option<u32> {
    std::fs::read_to_string(config.pid_path())
        .ok()
        .and_then(|s| s.trim().parse().ok())
}

fn cleanup_pid_file(config: &MonitorConfig) {
    let _ = std::fs::remove_file(config.pid_path());
}

enum Signal {
    Term,
    Kill,
}

#[cfg(unix)]
fn send_signal(pid: u32, signal: Signal) {
    let nix_signal = match signal {
        Signal::Term => nix::sys::signal::Signal::SIGTERM,
        Signal::Kill => nix::sys::signal::Signal::SIGKILL,
    };
    let _ = nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid as i32), nix_signal);
}

#[cfg(unix)]
fn process_exists(pid: u32) -> bool {
    nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid as i32), None).is_ok()
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
