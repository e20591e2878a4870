// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Atomic statistics counters tracked across the daemon's lifetime.
//!
//! Counters increment with `Ordering::Relaxed`; a snapshot for the status
//! record is taken under a `parking_lot::Mutex<()>` guard so readers never
//! observe a torn combination of fields.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use crate::status::{DaemonPhase, StatusSnapshot};

#[derive(Debug, Default)]
pub struct MonitorStatistics {
    files_tracked: AtomicU64,
    events_enqueued: AtomicU64,
    events_processed: AtomicU64,
    subprocess_calls: AtomicU64,
    subprocess_successes: AtomicU64,
    subprocess_failures: AtomicU64,
    subprocess_retries: AtomicU64,
    subprocess_timeouts: AtomicU64,
    queue_overflow: AtomicU64,
    started_at: Mutex<Option<SystemTime>>,
    last_event_at: Mutex<Option<SystemTime>>,
    last_error: Mutex<Option<String>>,
    /// Guards multi-field snapshot reads against tearing.
    snapshot_guard: Mutex<()>,
}

impl MonitorStatistics {
    pub fn new() -> Self {
        let stats = Self::default();
        *stats.started_at.lock() = Some(SystemTime::now());
        stats
    }

    pub fn set_files_tracked(&self, n: u64) {
        self.files_tracked.store(n, Ordering::Relaxed);
    }

    pub fn record_event_enqueued(&self) {
        self.events_enqueued.fetch_add(1, Ordering::Relaxed);
        *self.last_event_at.lock() = Some(SystemTime::now());
    }

    pub fn record_event_processed(&self) {
        self.events_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_subprocess_call(&self) {
        self.subprocess_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_subprocess_success(&self) {
        self.subprocess_successes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_subprocess_failure(&self) {
        self.subprocess_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_subprocess_retry(&self) {
        self.subprocess_retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_subprocess_timeout(&self) {
        self.subprocess_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_queue_overflow(&self) {
        self.queue_overflow.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_last_error(&self, message: Option<String>) {
        *self.last_error.lock() = message;
    }

    /// Take a consistent, non-tearing snapshot for the status record.
    pub fn snapshot(&self, phase: DaemonPhase, pid: u32, queue_depth: u64) -> StatusSnapshot {
        let _guard = self.snapshot_guard.lock();
        StatusSnapshot {
            state: phase,
            pid,
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: *self.started_at.lock(),
            last_event_at: *self.last_event_at.lock(),
            files_tracked: self.files_tracked.load(Ordering::Relaxed),
            events_enqueued: self.events_enqueued.load(Ordering::Relaxed),
            events_processed: self.events_processed.load(Ordering::Relaxed),
            subprocess_calls: self.subprocess_calls.load(Ordering::Relaxed),
            subprocess_successes: self.subprocess_successes.load(Ordering::Relaxed),
            subprocess_failures: self.subprocess_failures.load(Ordering::Relaxed),
            subprocess_retries: self.subprocess_retries.load(Ordering::Relaxed),
            subprocess_timeouts: self.subprocess_timeouts.load(Ordering::Relaxed),
            queue_overflow: self.queue_overflow.load(Ordering::Relaxed),
            queue_depth,
            last_error: self.last_error.lock().clone(),
        }
    }
}

#[cfg(test)]
#[path = "stats_tests.rs"]
mod tests;
