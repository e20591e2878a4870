// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Merged monitor configuration.
//!
//! Precedence, high to low: command-line flag → environment variable →
//! per-project config file (`.heimdall/monitor.toml`) → built-in default.

use crate::error::MonitorError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Minimum permitted sweep interval.
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Default tracked-extension allowlist.
pub fn default_extensions() -> Vec<String> {
    vec![
        "md".to_string(),
        "markdown".to_string(),
        "mdown".to_string(),
        "mkd".to_string(),
    ]
}

fn default_ignore_patterns() -> Vec<String> {
    vec![".git".to_string()]
}

fn default_permanent_patterns() -> Vec<String> {
    vec![
        "unknown command".to_string(),
        "invalid argument".to_string(),
        "no such file or directory".to_string(),
    ]
}

/// Fully-resolved configuration for one monitor daemon instance.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub project_root: PathBuf,
    /// Subpath under `project_root` that is watched (default `.heimdall/docs`).
    pub target_subpath: PathBuf,
    pub sweep_interval: Duration,
    pub extensions: Vec<String>,
    pub ignore_patterns: Vec<String>,
    /// Files above this size fall back to (mtime, size) fingerprinting.
    pub fingerprint_size_threshold: u64,
    pub queue_capacity: usize,
    pub base_command: String,
    pub fixed_args: Vec<String>,
    pub subprocess_timeout: Duration,
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_retry_delay: Duration,
    /// Grace period the daemon waits for an in-flight subprocess during shutdown.
    pub shutdown_grace: Duration,
    /// Stderr substrings (case-insensitive) that classify a non-zero exit as permanent.
    pub permanent_patterns: Vec<String>,
    pub health_stale_secs: u64,
    pub health_failure_rate: f64,
}

/// Raw `.heimdall/monitor.toml` shape. Permissive: unknown keys are ignored
/// so future binaries tolerate config files written by newer versions.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields = false)]
struct FileConfig {
    target_subpath: Option<String>,
    sweep_interval_seconds: Option<u64>,
    extensions: Option<Vec<String>>,
    ignore_patterns: Option<Vec<String>>,
    fingerprint_size_threshold_bytes: Option<u64>,
    queue_capacity: Option<usize>,
    base_command: Option<String>,
    fixed_args: Option<Vec<String>>,
    subprocess_timeout_seconds: Option<u64>,
    max_retries: Option<u32>,
    base_delay_seconds: Option<u64>,
    max_retry_delay_seconds: Option<u64>,
    shutdown_grace_seconds: Option<u64>,
    dispatch: Option<DispatchFileConfig>,
    health_stale_secs: Option<u64>,
    health_failure_rate: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DispatchFileConfig {
    permanent_patterns: Option<Vec<String>>,
}

/// Overrides sourced from the command line, applied with the highest precedence.
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub sweep_interval_seconds: Option<u64>,
    pub target_subpath: Option<String>,
    pub subprocess_timeout_seconds: Option<u64>,
    pub max_retries: Option<u32>,
    pub base_command: Option<String>,
}

impl MonitorConfig {
    /// Merge defaults, the project config file, environment variables, and
    /// CLI overrides (in ascending precedence) into a validated configuration.
    pub fn load(
        project_root: &Path,
        overrides: &ConfigOverrides,
    ) -> Result<Self, MonitorError> {
        let file_config = Self::load_file_config(project_root)?;

        let target_subpath = overrides
            .target_subpath
            .clone()
            .or_else(|| std::env::var("MONITOR_TARGET_PATH").ok())
            .or(file_config.target_subpath)
            .unwrap_or_else(|| ".heimdall/docs".to_string());

        let sweep_interval_secs = overrides
            .sweep_interval_seconds
            .or_else(|| env_u64("MONITOR_INTERVAL_SECONDS"))
            .or(file_config.sweep_interval_seconds)
            .unwrap_or(5);

        let extensions = file_config.extensions.unwrap_or_else(default_extensions);

        let ignore_patterns = std::env::var("MONITOR_IGNORE_PATTERNS")
            .ok()
            .map(|s| s.split(',').map(|p| p.trim().to_string()).collect())
            .or(file_config.ignore_patterns)
            .unwrap_or_else(default_ignore_patterns);

        let subprocess_timeout_secs = overrides
            .subprocess_timeout_seconds
            .or_else(|| env_u64("MONITOR_SUBPROCESS_TIMEOUT"))
            .or(file_config.subprocess_timeout_seconds)
            .unwrap_or(300);

        let max_retries = overrides
            .max_retries
            .or_else(|| env_u64("MONITOR_MAX_RETRIES").map(|v| v as u32))
            .or(file_config.max_retries)
            .unwrap_or(3);

        let base_command = overrides
            .base_command
            .clone()
            .or_else(|| std::env::var("MONITOR_BASE_COMMAND").ok())
            .or(file_config.base_command)
            .unwrap_or_else(|| "heimdall".to_string());

        let permanent_patterns = file_config
            .dispatch
            .and_then(|d| d.permanent_patterns)
            .unwrap_or_else(default_permanent_patterns);

        let config = Self {
            project_root: project_root.to_path_buf(),
            target_subpath: PathBuf::from(target_subpath),
            sweep_interval: Duration::from_secs(sweep_interval_secs),
            extensions,
            ignore_patterns,
            fingerprint_size_threshold: file_config
                .fingerprint_size_threshold_bytes
                .unwrap_or(10 * 1024 * 1024),
            queue_capacity: file_config.queue_capacity.unwrap_or(1000),
            base_command,
            fixed_args: file_config.fixed_args.unwrap_or_default(),
            subprocess_timeout: Duration::from_secs(subprocess_timeout_secs),
            max_retries,
            base_delay: Duration::from_secs(file_config.base_delay_seconds.unwrap_or(2)),
            max_retry_delay: Duration::from_secs(
                file_config.max_retry_delay_seconds.unwrap_or(60),
            ),
            shutdown_grace: Duration::from_secs(
                file_config.shutdown_grace_seconds.unwrap_or(30),
            ),
            permanent_patterns,
            health_stale_secs: file_config.health_stale_secs.unwrap_or(120),
            health_failure_rate: file_config.health_failure_rate.unwrap_or(0.5),
        };

        config.validate()?;
        Ok(config)
    }

    fn load_file_config(project_root: &Path) -> Result<FileConfig, MonitorError> {
        let path = project_root.join(".heimdall").join("monitor.toml");
        if !path.exists() {
            return Ok(FileConfig::default());
        }
        let raw = std::fs::read_to_string(&path)?;
        Ok(toml::from_str(&raw)?)
    }

    fn validate(&self) -> Result<(), MonitorError> {
        if self.sweep_interval < MIN_SWEEP_INTERVAL {
            return Err(MonitorError::InvalidConfig(format!(
                "sweep interval {:?} is below the minimum of {:?}",
                self.sweep_interval, MIN_SWEEP_INTERVAL
            )));
        }
        Ok(())
    }

    /// Absolute path to the watched directory tree.
    pub fn watch_path(&self) -> PathBuf {
        self.project_root.join(&self.target_subpath)
    }

    pub fn heimdall_dir(&self) -> PathBuf {
        self.project_root.join(".heimdall")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.heimdall_dir().join("monitor.lock")
    }

    pub fn pid_path(&self) -> PathBuf {
        self.heimdall_dir().join("monitor.pid")
    }

    pub fn status_path(&self) -> PathBuf {
        self.heimdall_dir().join("monitor.status")
    }

    pub fn log_path(&self) -> PathBuf {
        self.heimdall_dir().join("logs").join("monitor.log")
    }
}

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
