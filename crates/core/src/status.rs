// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The on-disk status record.
//!
//! Written atomically (temp file + `fsync` + rename). Readers outside the
//! daemon process must tolerate torn reads by re-reading on JSON-parse
//! failure — `StatusSnapshot::read` does not retry itself since the retry
//! policy belongs to the caller (the supervisor polls on an interval).

use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::time::SystemTime;

use crate::error::MonitorError;

/// The monitor daemon's lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DaemonPhase {
    Starting,
    Running,
    Stopping,
    Stopped,
    FailedToStart,
}

/// The full status record written to `.heimdall/monitor.status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub state: DaemonPhase,
    pub pid: u32,
    /// The crate's `CARGO_PKG_VERSION`, for cross-checking daemon/CLI builds.
    pub version: String,
    pub started_at: Option<SystemTime>,
    pub last_event_at: Option<SystemTime>,
    pub files_tracked: u64,
    pub events_enqueued: u64,
    pub events_processed: u64,
    pub subprocess_calls: u64,
    pub subprocess_successes: u64,
    pub subprocess_failures: u64,
    pub subprocess_retries: u64,
    pub subprocess_timeouts: u64,
    pub queue_overflow: u64,
    /// Current resident queue length.
    pub queue_depth: u64,
    pub last_error: Option<String>,
}

impl StatusSnapshot {
    /// Write the status record atomically: write to a temp file in the same
    /// directory, `fsync`, then rename over the final path.
    pub fn write_atomic(&self, path: &Path) -> Result<(), MonitorError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = path.with_extension("status.tmp");
        {
            let file = File::create(&tmp_path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, self)?;
            let file = writer
                .into_inner()
                .map_err(|e| MonitorError::Io(e.into_error()))?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, path)?;
        Ok(())
    }

    /// Read and parse the status record. Callers that need tolerance for a
    /// torn read concurrent with a writer should retry on `Err`.
    pub fn read(path: &Path) -> Result<Self, MonitorError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
