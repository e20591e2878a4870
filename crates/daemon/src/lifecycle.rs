// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Monitor daemon lifecycle: composes the lock, scanner, queue, dispatcher,
//! and shutdown coordinator into the full acquire-lock → watch → queue →
//! dispatch → release sequence.

use std::sync::Arc;
use std::time::Duration;

use monitor_adapters::{CommandRunner, TokioCommandRunner};
use monitor_core::config::MonitorConfig;
use monitor_core::{DaemonPhase, MonitorError, MonitorStatistics, StatusSnapshot};

use crate::lock::LockHandle;
use crate::queue::EventQueue;
use crate::scanner::ScannerState;
use crate::shutdown::ShutdownHandle;
use crate::{dispatcher, scanner_task};

/// Interval between periodic status-record flushes while `Running`.
const STATUS_FLUSH_INTERVAL: Duration = Duration::from_secs(5);

/// Everything the running daemon needs to hand off to its background
/// tasks and to its own run loop.
pub struct Daemon {
    config: Arc<MonitorConfig>,
    stats: Arc<MonitorStatistics>,
    queue: Arc<EventQueue>,
    shutdown: Arc<ShutdownHandle>,
    scanner_handle: tokio::task::JoinHandle<()>,
    dispatcher_handle: tokio::task::JoinHandle<()>,
    _lock: LockHandle,
}

impl Daemon {
    /// Acquire the singleton lock, run a silent baseline sweep, then spawn
    /// the scanner and dispatcher background tasks. Returns
    /// `MonitorError::AlreadyHeld` if another instance already owns the
    /// project root's lock.
    pub async fn start(config: MonitorConfig) -> Result<Self, MonitorError> {
        if !config.watch_path().is_dir() {
            return Err(MonitorError::TargetMissing(config.watch_path()));
        }

        let lock = LockHandle::acquire(&config.lock_path())?;

        let config = Arc::new(config);
        let stats = Arc::new(MonitorStatistics::new());
        let queue = Arc::new(EventQueue::new(config.queue_capacity, Arc::clone(&stats)));
        let shutdown = Arc::new(ShutdownHandle::new());

        #[cfg(unix)]
        crate::shutdown::spawn_signal_listener(Arc::clone(&shutdown)).map_err(MonitorError::Io)?;

        // Baseline sweep with event emission suppressed: files already present
        // at startup populate `known` but never generate an Added event.
        let mut scanner_state = ScannerState::new();
        scanner_state.sweep(&config);
        stats.set_files_tracked(scanner_state.tracked_count());

        let starting = stats.snapshot(DaemonPhase::Starting, std::process::id(), queue.len() as u64);
        starting.write_atomic(&config.status_path())?;

        let scanner_handle = tokio::spawn(scanner_task::run(
            Arc::clone(&config),
            scanner_state,
            Arc::clone(&queue),
            Arc::clone(&stats),
            Arc::clone(&shutdown),
        ));

        let runner: Arc<dyn CommandRunner> = Arc::new(TokioCommandRunner::new());
        let dispatcher_handle = tokio::spawn(dispatcher::run(
            Arc::clone(&config),
            Arc::clone(&queue),
            runner,
            Arc::clone(&stats),
            Arc::clone(&shutdown),
        ));

        let daemon = Self {
            config: Arc::clone(&config),
            stats: Arc::clone(&stats),
            queue: Arc::clone(&queue),
            shutdown: Arc::clone(&shutdown),
            scanner_handle,
            dispatcher_handle,
            _lock: lock,
        };

        daemon.write_status(DaemonPhase::Running)?;
        tracing::info!(project_root = %daemon.config.project_root.display(), "monitor daemon started");

        Ok(daemon)
    }

    pub fn shutdown_handle(&self) -> Arc<ShutdownHandle> {
        Arc::clone(&self.shutdown)
    }

    /// Block until shutdown is requested, flushing the status record
    /// periodically, then perform the stop sequence.
    pub async fn run(&mut self) -> Result<(), MonitorError> {
        let mut interval = tokio::time::interval(STATUS_FLUSH_INTERVAL);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.write_status(DaemonPhase::Running)?;
                }
                _ = self.shutdown.wait_for_stop() => {
                    break;
                }
            }
        }

        self.stop_sequence().await
    }

    /// Stop sequence. Lock release happens on `Drop` of the held `LockHandle`.
    ///
    /// The scanner and dispatcher tasks observe the same shutdown handle and
    /// exit cooperatively — the scanner after its current sweep, the
    /// dispatcher after its current dispatch (including any in-flight
    /// subprocess). They are given up to `shutdown_grace` to do so; a task
    /// still running past that bound is force-aborted rather than awaited
    /// indefinitely, so `stop_sequence` itself never outlives the grace
    /// period.
    async fn stop_sequence(&mut self) -> Result<(), MonitorError> {
        tracing::info!("stop requested, entering shutdown grace period");
        self.write_status(DaemonPhase::Stopping)?;

        let joined = tokio::time::timeout(self.config.shutdown_grace, async {
            let _ = tokio::join!(&mut self.scanner_handle, &mut self.dispatcher_handle);
        })
        .await;

        if joined.is_err() {
            tracing::warn!(
                grace_ms = self.config.shutdown_grace.as_millis() as u64,
                "scanner/dispatcher did not exit within shutdown grace, aborting"
            );
            self.scanner_handle.abort();
            self.dispatcher_handle.abort();
            let _ = tokio::join!(&mut self.scanner_handle, &mut self.dispatcher_handle);
        }

        let remaining = self.queue.len();
        if remaining > 0 {
            tracing::warn!(remaining, "discarding queued events on shutdown");
        }

        self.write_status(DaemonPhase::Stopped)?;
        tracing::info!("monitor daemon stopped");
        Ok(())
    }

    fn write_status(&self, phase: DaemonPhase) -> Result<(), MonitorError> {
        let snapshot: StatusSnapshot = self.stats.snapshot(phase, std::process::id(), self.queue.len() as u64);
        snapshot.write_atomic(&self.config.status_path())
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
