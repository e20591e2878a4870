// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use monitor_core::config::ConfigOverrides;
use monitor_core::status::StatusSnapshot;
use std::fs::File;
use tempfile::tempdir;

/// Hold the singleton lock for the lifetime of the returned `File`, as a
/// real daemon would, so `status`/`health`'s lock cross-check sees it held.
fn hold_lock(config: &MonitorConfig) -> File {
    let path = config.lock_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let file = std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .open(&path)
        .unwrap();
    file.try_lock_exclusive().unwrap();
    file
}

fn test_config(root: &std::path::Path) -> MonitorConfig {
    MonitorConfig::load(root, &ConfigOverrides::default()).unwrap()
}

fn running_snapshot(pid: u32) -> StatusSnapshot {
    StatusSnapshot {
        state: DaemonPhase::Running,
        pid,
        version: "0.1.0".to_string(),
        started_at: Some(std::time::SystemTime::now()),
        last_event_at: None,
        files_tracked: 0,
        events_enqueued: 0,
        events_processed: 0,
        subprocess_calls: 0,
        subprocess_successes: 0,
        subprocess_failures: 0,
        subprocess_retries: 0,
        subprocess_timeouts: 0,
        queue_overflow: 0,
        queue_depth: 0,
        last_error: None,
    }
}

#[test]
fn pid_file_round_trips() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());

    write_pid_file(&config, 4242).unwrap();
    assert_eq!(read_pid_file(&config), Some(4242));

    cleanup_pid_file(&config);
    assert_eq!(read_pid_file(&config), None);
}

#[test]
fn status_not_running_with_no_pid_file() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());

    let (status, snapshot) = status(&config);
    assert_eq!(status, SupervisorStatus::NotRunning);
    assert!(snapshot.is_none());
}

#[test]
fn status_cleans_up_stale_pid_pointing_at_dead_process() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());

    // No process should plausibly be running at this pid.
    write_pid_file(&config, 999_999).unwrap();

    let (status, _) = status(&config);
    assert_eq!(status, SupervisorStatus::NotRunning);
    assert_eq!(read_pid_file(&config), None);
}

#[test]
fn status_is_stale_when_status_record_disagrees_with_pid_file() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());
    let _lock = hold_lock(&config);

    let own_pid = std::process::id();
    write_pid_file(&config, own_pid).unwrap();
    running_snapshot(own_pid + 1)
        .write_atomic(&config.status_path())
        .unwrap();

    let (status, snapshot) = status(&config);
    assert_eq!(status, SupervisorStatus::StaleStatus);
    assert!(snapshot.is_some());
}

#[test]
fn status_is_running_when_status_record_agrees_with_pid_file() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());
    let _lock = hold_lock(&config);

    let own_pid = std::process::id();
    write_pid_file(&config, own_pid).unwrap();
    running_snapshot(own_pid)
        .write_atomic(&config.status_path())
        .unwrap();

    let (status, snapshot) = status(&config);
    assert_eq!(status, SupervisorStatus::Running);
    assert_eq!(snapshot.unwrap().pid, own_pid);
}

#[test]
fn status_is_not_running_when_pid_alive_but_lock_not_held() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());

    // No one holds the lock (it was never created), yet the PID is alive
    // (it's our own) and the status record claims Running: the lock is
    // authoritative, so this must not be reported as Running.
    let own_pid = std::process::id();
    write_pid_file(&config, own_pid).unwrap();
    running_snapshot(own_pid)
        .write_atomic(&config.status_path())
        .unwrap();

    let (status, snapshot) = status(&config);
    assert_eq!(status, SupervisorStatus::NotRunning);
    assert!(snapshot.is_none());
    assert_eq!(read_pid_file(&config), None);
}

#[test]
fn health_is_unhealthy_when_pid_alive_but_lock_not_held() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());

    // A Running-looking record left behind without the lock: health must
    // not trust it.
    running_snapshot(std::process::id())
        .write_atomic(&config.status_path())
        .unwrap();

    let report = health(&config).unwrap();
    assert_eq!(report.verdict, monitor_core::health::HealthVerdict::Unhealthy);
}

#[tokio::test]
async fn stop_reports_not_running_with_no_pid_file() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());

    let outcome = stop(&config, std::time::Duration::from_millis(50)).await.unwrap();
    assert_eq!(outcome, StopOutcome::NotRunning);
}

#[test]
fn health_is_none_without_a_status_record() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());

    assert!(health(&config).is_none());
}

#[test]
fn health_reports_healthy_for_a_fresh_running_snapshot() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());
    let _lock = hold_lock(&config);

    running_snapshot(std::process::id())
        .write_atomic(&config.status_path())
        .unwrap();

    let report = health(&config).unwrap();
    assert_eq!(report.verdict, monitor_core::health::HealthVerdict::Healthy);
}
