// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The scanner's background task: periodic sweeps enqueuing events until
//! shutdown. Blocks on a sleep between sweeps, waking early on the
//! shutdown flag.

use std::sync::Arc;

use monitor_core::config::MonitorConfig;
use monitor_core::MonitorStatistics;

use crate::queue::EventQueue;
use crate::scanner::ScannerState;
use crate::shutdown::ShutdownHandle;

/// Run sweeps on `config.sweep_interval` until shutdown is requested. A
/// sweep already in progress finishes; no new sweep begins once the flag
/// is observed.
pub async fn run(
    config: Arc<MonitorConfig>,
    mut state: ScannerState,
    queue: Arc<EventQueue>,
    stats: Arc<MonitorStatistics>,
    shutdown: Arc<ShutdownHandle>,
) {
    loop {
        tokio::select! {
            _ = tokio::time::sleep(config.sweep_interval) => {}
            _ = shutdown.wait_for_stop() => {
                tracing::info!("scanner observed shutdown, exiting");
                break;
            }
        }

        if shutdown.is_stopping() {
            tracing::info!("scanner observed shutdown before sweep, exiting");
            break;
        }

        let events = state.sweep(&config);
        stats.set_files_tracked(state.tracked_count());
        for event in events {
            queue.enqueue(event);
        }
    }
}

#[cfg(test)]
#[path = "scanner_task_tests.rs"]
mod tests;
