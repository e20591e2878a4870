// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Singleton advisory lock: guarantees at most one live monitor daemon
//! per project root.
//!
//! At most one live process may hold the lock for a given project root. The
//! OS releases the lock automatically if the holder crashes, so a stale PID
//! on disk is never evidence of liveness by itself — only a failed
//! `try_lock_exclusive` is.

use fs2::FileExt;
use monitor_core::MonitorError;
use std::fs::{self, File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// An acquired singleton lock. Dropping it releases the lock and unlinks
/// the file.
pub struct LockHandle {
    file: File,
    path: PathBuf,
}

impl LockHandle {
    /// Attempt to acquire the lock at `path`, writing the current PID.
    ///
    /// Returns `Err(MonitorError::AlreadyHeld)` if another live process
    /// holds it, or `Err(MonitorError::LockUnusable)` if the lock file
    /// cannot be created/opened/locked for any other reason.
    pub fn acquire(path: &Path) -> Result<Self, MonitorError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| MonitorError::LockUnusable(path.to_path_buf(), e))?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| MonitorError::LockUnusable(path.to_path_buf(), e))?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                file.set_len(0)
                    .map_err(|e| MonitorError::LockUnusable(path.to_path_buf(), e))?;
                file.seek(SeekFrom::Start(0))
                    .map_err(|e| MonitorError::LockUnusable(path.to_path_buf(), e))?;
                write!(file, "{}", std::process::id())
                    .map_err(|e| MonitorError::LockUnusable(path.to_path_buf(), e))?;
                file.flush()
                    .map_err(|e| MonitorError::LockUnusable(path.to_path_buf(), e))?;
                tracing::info!(path = %path.display(), "acquired singleton lock");
                Ok(Self {
                    file,
                    path: path.to_path_buf(),
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                tracing::warn!(path = %path.display(), "singleton lock already held");
                Err(MonitorError::AlreadyHeld)
            }
            Err(e) => Err(MonitorError::LockUnusable(path.to_path_buf(), e)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockHandle {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
        match fs::remove_file(&self.path) {
            Ok(()) => tracing::info!(path = %self.path.display(), "released singleton lock"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %self.path.display(), error = %e, "failed to remove lock file"),
        }
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
