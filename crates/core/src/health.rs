// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `monitor health` computation: a deeper liveness check than plain
//! process existence, based on the daemon's own status record.

use crate::status::{DaemonPhase, StatusSnapshot};
use std::time::SystemTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthVerdict {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthVerdict {
    /// Process exit code for `monitor health`.
    pub fn exit_code(self) -> i32 {
        match self {
            HealthVerdict::Healthy => 0,
            HealthVerdict::Degraded => 7,
            HealthVerdict::Unhealthy => 8,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct HealthReport {
    pub verdict: HealthVerdict,
    pub reasons: Vec<String>,
}

/// Compute a health verdict from a status record's counters against the
/// configured staleness/failure-rate thresholds.
pub fn compute_health(
    snapshot: &StatusSnapshot,
    stale_secs: u64,
    failure_rate_threshold: f64,
    now: SystemTime,
) -> HealthReport {
    let mut reasons = Vec::new();

    if snapshot.state != DaemonPhase::Running {
        return HealthReport {
            verdict: HealthVerdict::Unhealthy,
            reasons: vec![format!("daemon state is {:?}, not running", snapshot.state)],
        };
    }

    let reference = snapshot.last_event_at.or(snapshot.started_at);
    let age_secs = reference
        .and_then(|t| now.duration_since(t).ok())
        .map(|d| d.as_secs());

    let is_stale = age_secs.map(|age| age > stale_secs).unwrap_or(false);
    if is_stale {
        reasons.push(format!(
            "no activity for {}s (threshold {}s)",
            age_secs.unwrap_or(0),
            stale_secs
        ));
    }

    let total_attempts = snapshot.subprocess_calls;
    let failures = snapshot.subprocess_failures;
    let failure_rate = if total_attempts > 0 {
        failures as f64 / total_attempts as f64
    } else {
        0.0
    };
    // Every invocation failing suggests the ingestion command itself is broken.
    let command_appears_broken = total_attempts >= 3 && failure_rate >= 1.0;
    let failure_rate_exceeded = total_attempts > 0 && failure_rate > failure_rate_threshold;

    if command_appears_broken {
        reasons.push("every subprocess invocation has failed".to_string());
    } else if failure_rate_exceeded {
        reasons.push(format!(
            "subprocess failure rate {:.0}% exceeds threshold {:.0}%",
            failure_rate * 100.0,
            failure_rate_threshold * 100.0
        ));
    }

    let verdict = if command_appears_broken {
        HealthVerdict::Unhealthy
    } else if is_stale || failure_rate_exceeded {
        HealthVerdict::Degraded
    } else {
        HealthVerdict::Healthy
    };

    HealthReport { verdict, reasons }
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod tests;
