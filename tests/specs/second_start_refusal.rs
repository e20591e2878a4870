//! A second `monitor start` against a project that already has a live
//! daemon is refused rather than spawning a competing daemon.

use crate::prelude::*;
use serial_test::serial;

#[test]
#[serial]
fn second_daemon_is_refused_while_first_keeps_running() {
    let project = Project::new();
    let ingestor = project.install_fake_ingestor(0);
    let _guard = project.start_monitor(&ingestor);

    // `monitor start` only returns once the first daemon has reported
    // Running, so daemon A is already up; starting a second monitor for
    // the same project root must be refused with the distinct "already
    // running" exit code rather than spawning a second daemon.
    let second = monitor_cmd()
        .args(["start", "--project-root"])
        .arg(project.root())
        .output()
        .expect("spawn second start");
    assert_eq!(second.status.code(), Some(2));

    // Daemon A is unaffected: status still reports Running.
    let status = monitor_cmd()
        .args(["status", "--project-root"])
        .arg(project.root())
        .output()
        .expect("status");
    assert_eq!(status.status.code(), Some(0));
}
