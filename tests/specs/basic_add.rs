//! A file dropped into the watched tree while the monitor is running gets
//! dispatched to the ingestion command as a `load`.

use crate::prelude::*;
use serial_test::serial;

#[test]
#[serial]
fn basic_add_dispatches_load_within_two_sweeps() {
    let project = Project::new();
    let ingestor = project.install_fake_ingestor(0);
    let _guard = project.start_monitor(&ingestor);

    let file = project.docs_path("a.md");
    std::fs::write(&file, "x").expect("write a.md");

    let expected = format!("load {}", file.display());
    let dispatched = wait_until(|| project.call_log_lines().iter().any(|l| l == &expected));
    assert!(dispatched, "expected {expected:?} in call log, got {:?}", project.call_log_lines());

    let status = monitor_cmd()
        .args(["status", "--project-root"])
        .arg(project.root())
        .arg("--json")
        .output()
        .expect("status");
    let parsed: serde_json::Value = serde_json::from_slice(&status.stdout).expect("parse status json");
    assert_eq!(parsed["status"], "running");
}
