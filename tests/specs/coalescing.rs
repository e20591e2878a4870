//! Several rapid rewrites of the same file between sweeps collapse into a
//! single dispatched `load`, not one per write.

use crate::prelude::*;
use serial_test::serial;
use std::thread::sleep;
use std::time::Duration;

#[test]
#[serial]
fn rapid_rewrites_within_one_sweep_dispatch_exactly_once() {
    let project = Project::new();
    let ingestor = project.install_fake_ingestor(0);

    // Seed the file before the daemon starts so the baseline sweep adopts it
    // silently; only the rewrites below should produce a dispatched event.
    let file = project.docs_path("a.md");
    std::fs::write(&file, "init").expect("write initial content");

    let _guard = project.start_monitor(&ingestor);
    sleep(Duration::from_millis(300)); // let the baseline sweep land

    std::fs::write(&file, "a").expect("write a");
    std::fs::write(&file, "b").expect("write b");
    std::fs::write(&file, "c").expect("write c");

    let expected = format!("load {}", file.display());
    let dispatched = wait_until(|| project.call_log_lines().iter().any(|l| l == &expected));
    assert!(dispatched, "expected one load dispatch, got {:?}", project.call_log_lines());

    // Give any would-be duplicate a chance to land, then confirm there is
    // exactly one invocation for this path: the three rewrites coalesced
    // into a single Modified event with the final content, not three.
    sleep(Duration::from_millis(500));
    let count = project
        .call_log_lines()
        .iter()
        .filter(|l| l.ends_with(&file.display().to_string()))
        .count();
    assert_eq!(count, 1, "expected exactly one dispatch, got {:?}", project.call_log_lines());
}
