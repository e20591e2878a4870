//! Transient dispatch failures retry with backoff until the ingestion
//! command succeeds, and a stop request lands promptly even mid-backoff.

use crate::prelude::*;
use serial_test::serial;
use std::time::{Duration, Instant};

#[test]
#[serial]
fn transient_failures_retry_until_success() {
    let project = Project::new();
    project.write_config("base_delay_seconds = 1\nmax_retry_delay_seconds = 2\n");
    let ingestor = project.install_flaky_ingestor(2);
    let _guard = project.start_monitor(&ingestor);

    let file = project.docs_path("a.md");
    std::fs::write(&file, "x").expect("write a.md");

    // Three attempts (two failures, then success) all target the same path.
    let three_calls = wait_until(|| project.call_log_lines().len() >= 3);
    assert!(three_calls, "expected 3 attempts, got {:?}", project.call_log_lines());

    let status = monitor_cmd()
        .args(["status", "--project-root"])
        .arg(project.root())
        .arg("--json")
        .output()
        .expect("status");
    let parsed: serde_json::Value = serde_json::from_slice(&status.stdout).expect("parse status json");
    let record = &parsed["record"];
    assert_eq!(record["subprocess_calls"], 3);
    assert_eq!(record["subprocess_retries"], 2);
    assert_eq!(record["subprocess_successes"], 1);
}

#[test]
#[serial]
fn stop_during_retry_backoff_exits_promptly_without_a_permanent_failure() {
    let project = Project::new();
    // A long backoff so the stop command lands while the dispatcher is
    // asleep between retries, not mid-attempt.
    project.write_config("base_delay_seconds = 20\nmax_retry_delay_seconds = 20\n");
    let ingestor = project.install_flaky_ingestor(1_000_000);
    let _guard = project.start_monitor(&ingestor);

    let file = project.docs_path("a.md");
    std::fs::write(&file, "x").expect("write a.md");

    let first_attempt = wait_until(|| !project.call_log_lines().is_empty());
    assert!(first_attempt, "expected at least one attempt before stopping");

    let start = Instant::now();
    let status = monitor_cmd()
        .args(["stop", "--project-root"])
        .arg(project.root())
        .arg("--timeout")
        .arg("5")
        .status()
        .expect("stop");
    assert_eq!(status.code(), Some(0), "expected a clean stop, not a hard-kill");
    assert!(
        start.elapsed() < Duration::from_secs(5),
        "stop took {:?}, expected the dispatcher to abandon its retry sleep promptly",
        start.elapsed()
    );
}
