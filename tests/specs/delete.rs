//! Deleting a tracked file dispatches a single `remove-file` call.

use crate::prelude::*;
use serial_test::serial;

#[test]
#[serial]
fn deleting_a_tracked_file_dispatches_remove_file_once() {
    let project = Project::new();
    let ingestor = project.install_fake_ingestor(0);

    // Create the file before the daemon starts so the baseline sweep picks
    // it up silently — only the deletion should produce a dispatched event.
    let file = project.docs_path("a.md");
    std::fs::write(&file, "x").expect("write a.md");

    let _guard = project.start_monitor(&ingestor);

    // Let the baseline sweep land before deleting.
    std::thread::sleep(std::time::Duration::from_millis(300));
    std::fs::remove_file(&file).expect("remove a.md");

    let expected = format!("remove-file {}", file.display());
    let dispatched = wait_until(|| project.call_log_lines().iter().any(|l| l == &expected));
    assert!(dispatched, "expected {expected:?} in call log, got {:?}", project.call_log_lines());

    let count = project.call_log_lines().iter().filter(|l| l == &&expected).count();
    assert_eq!(count, 1, "expected exactly one remove-file dispatch");
}
