// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Crate-wide error taxonomy.

use std::path::PathBuf;
use thiserror::Error;

/// Errors threaded through every fallible boundary of the monitor subsystem.
///
/// `AlreadyHeld` is a refusal to start a second instance, not a crash — it
/// gets its own distinct exit code. The I/O and config variants are fatal
/// at startup and are never retried.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Another process already holds the singleton lock for this project root.
    #[error("monitor already running for this project (lock held)")]
    AlreadyHeld,

    /// The lock file's filesystem does not support advisory locking, or the
    /// lock could not be created/opened.
    #[error("lock unusable at {0}: {1}")]
    LockUnusable(PathBuf, #[source] std::io::Error),

    /// The configured watch target does not exist.
    #[error("watched target path does not exist: {0}")]
    TargetMissing(PathBuf),

    /// Configuration failed validation (e.g. sweep interval below minimum).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config file error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("status record error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("runtime error: {0}")]
    Runtime(String),
}

impl MonitorError {
    /// Maps a startup failure onto the `monitor start` process exit code.
    pub fn start_exit_code(&self) -> i32 {
        match self {
            MonitorError::AlreadyHeld => 2,
            MonitorError::InvalidConfig(_) => 4,
            _ => 3,
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
