// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic directory scanner.
//!
//! Produces `FileChangeEvent`s by diffing successive sweeps of the watched
//! tree against an in-memory `known` map. The first sweep seeds the
//! baseline and emits nothing, so files already present when the daemon
//! starts are never re-ingested.

use monitor_core::config::MonitorConfig;
use monitor_core::event::{ChangeKind, FileChangeEvent};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime};
use walkdir::WalkDir;

/// Fingerprint of a tracked file: a fast content digest, or a fallback of
/// `(modified_time, size)` for files above the size threshold, to bound
/// I/O cost on large files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fingerprint {
    Hash(u64),
    SizeAndTime(u64, Option<SystemTime>),
}

#[derive(Debug, Clone)]
struct KnownEntry {
    modified_time: Option<SystemTime>,
    size: u64,
    fingerprint: Fingerprint,
}

/// Scanner-private mutable state: the post-sweep view of the tree plus the
/// timestamp of the last completed sweep.
#[derive(Debug, Default)]
pub struct ScannerState {
    known: HashMap<PathBuf, KnownEntry>,
    last_scan_at: Option<Instant>,
}

impl ScannerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_scan_at(&self) -> Option<Instant> {
        self.last_scan_at
    }

    pub fn tracked_count(&self) -> u64 {
        self.known.len() as u64
    }

    /// Run one sweep of `config.watch_path()`, returning the events implied
    /// by the diff against the prior `known` map (path order).
    ///
    /// On the very first call (`known` empty and no prior sweep), the
    /// baseline is established silently: `known` is populated but no events
    /// are produced, regardless of what files are found.
    pub fn sweep(&mut self, config: &MonitorConfig) -> Vec<FileChangeEvent> {
        let is_first_sweep = self.last_scan_at.is_none();
        let watch_path = config.watch_path();

        let mut current: HashMap<PathBuf, KnownEntry> = HashMap::new();
        let mut visited_canonical = HashSet::new();

        let walker = WalkDir::new(&watch_path)
            .follow_links(true)
            .same_file_system(false);

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(
                        path = ?e.path().map(Path::to_path_buf),
                        error = %e,
                        "failed to walk directory entry, treating as absent this sweep"
                    );
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let canonical = path.canonicalize().ok();

            if let Some(canonical) = &canonical {
                if !visited_canonical.insert(canonical.clone()) {
                    continue; // symlink cycle already seen this sweep
                }
            }

            let ignore_check_path = canonical.as_deref().unwrap_or(path);
            if is_ignored(ignore_check_path, &config.ignore_patterns) {
                tracing::debug!(path = %path.display(), "skipping ignored path");
                continue;
            }

            if !has_tracked_extension(path, &config.extensions) {
                tracing::debug!(path = %path.display(), "skipping untracked extension");
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to read metadata, treating as absent this sweep");
                    continue;
                }
            };
            let size = metadata.len();
            let modified_time = metadata.modified().ok();

            let prior = self.known.get(path);
            let needs_fingerprint = match prior {
                None => true,
                Some(p) => p.modified_time != modified_time || p.size != size,
            };

            let fingerprint = if !needs_fingerprint {
                prior.map(|p| p.fingerprint).unwrap_or(Fingerprint::SizeAndTime(size, modified_time))
            } else if size > config.fingerprint_size_threshold {
                Fingerprint::SizeAndTime(size, modified_time)
            } else {
                match hash_file(path) {
                    Ok(h) => Fingerprint::Hash(h),
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "failed to read file contents, treating as absent this sweep");
                        continue;
                    }
                }
            };

            current.insert(
                path.to_path_buf(),
                KnownEntry {
                    modified_time,
                    size,
                    fingerprint,
                },
            );
        }

        let mut events = Vec::new();
        if !is_first_sweep {
            let mut paths: Vec<&PathBuf> = current.keys().chain(self.known.keys()).collect();
            paths.sort();
            paths.dedup();

            for path in paths {
                match (self.known.get(path), current.get(path)) {
                    (None, Some(_)) => {
                        events.push(FileChangeEvent::new(path.clone(), ChangeKind::Added));
                    }
                    (Some(_), None) => {
                        events.push(FileChangeEvent::new(path.clone(), ChangeKind::Deleted));
                    }
                    (Some(prior), Some(now)) => {
                        if prior.fingerprint != now.fingerprint {
                            events.push(FileChangeEvent::new(path.clone(), ChangeKind::Modified));
                        }
                    }
                    (None, None) => unreachable!(),
                }
            }
        }

        self.known = current;
        self.last_scan_at = Some(Instant::now());
        events
    }
}

fn is_ignored(path: &Path, ignore_patterns: &[String]) -> bool {
    let path_str = path.to_string_lossy();
    ignore_patterns.iter().any(|pattern| path_str.contains(pattern.as_str()))
}

fn has_tracked_extension(path: &Path, extensions: &[String]) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)),
        None => false,
    }
}

fn hash_file(path: &Path) -> std::io::Result<u64> {
    let bytes = std::fs::read(path)?;
    let digest = Sha256::digest(&bytes);
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    Ok(u64::from_be_bytes(prefix))
}

#[cfg(test)]
#[path = "scanner_tests.rs"]
mod tests;
