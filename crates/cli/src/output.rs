// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::ValueEnum;
use monitor_core::health::HealthReport;
use monitor_core::status::StatusSnapshot;
use std::time::SystemTime;

use crate::supervisor::SupervisorStatus;

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Format a `SystemTime` as relative time (e.g., "5s", "2m", "1h", "3d").
pub fn format_time_ago(t: SystemTime) -> String {
    match SystemTime::now().duration_since(t) {
        Ok(elapsed) => {
            let secs = elapsed.as_secs();
            if secs < 60 {
                format!("{secs}s")
            } else if secs < 3600 {
                format!("{}m", secs / 60)
            } else if secs < 86400 {
                format!("{}h", secs / 3600)
            } else {
                format!("{}d", secs / 86400)
            }
        }
        Err(_) => "-".to_string(),
    }
}

pub fn print_status(status: SupervisorStatus, snapshot: Option<&StatusSnapshot>, format: OutputFormat) {
    match format {
        OutputFormat::Text => print_status_text(status, snapshot),
        OutputFormat::Json => print_status_json(status, snapshot),
    }
}

fn print_status_text(status: SupervisorStatus, snapshot: Option<&StatusSnapshot>) {
    match status {
        SupervisorStatus::NotConfigured => println!("not configured"),
        SupervisorStatus::NotRunning => println!("not running"),
        SupervisorStatus::StaleStatus => {
            println!("running (stale status record)");
            if let Some(s) = snapshot {
                print_counters(s);
            }
        }
        SupervisorStatus::Running => {
            if let Some(s) = snapshot {
                println!("running (pid {})", s.pid);
                if let Some(started) = s.started_at {
                    println!("  started:         {} ago", format_time_ago(started));
                }
                print_counters(s);
            } else {
                println!("running");
            }
        }
    }
}

fn print_counters(s: &StatusSnapshot) {
    println!("  files tracked:   {}", s.files_tracked);
    println!("  events enqueued: {}", s.events_enqueued);
    println!("  events processed:{}", s.events_processed);
    println!(
        "  subprocess:      {} calls, {} ok, {} failed, {} retried, {} timed out",
        s.subprocess_calls,
        s.subprocess_successes,
        s.subprocess_failures,
        s.subprocess_retries,
        s.subprocess_timeouts
    );
    println!("  queue depth:     {}", s.queue_depth);
    if s.queue_overflow > 0 {
        println!("  queue overflow:  {}", s.queue_overflow);
    }
    if let Some(err) = &s.last_error {
        println!("  last error:      {err}");
    }
}

fn print_status_json(status: SupervisorStatus, snapshot: Option<&StatusSnapshot>) {
    let state = match status {
        SupervisorStatus::NotConfigured => "not_configured",
        SupervisorStatus::NotRunning => "not_running",
        SupervisorStatus::Running => "running",
        SupervisorStatus::StaleStatus => "stale",
    };
    let obj = serde_json::json!({
        "status": state,
        "record": snapshot,
    });
    if let Ok(rendered) = serde_json::to_string_pretty(&obj) {
        println!("{rendered}");
    }
}

pub fn print_health(report: Option<&HealthReport>, format: OutputFormat) {
    match format {
        OutputFormat::Text => match report {
            Some(r) => {
                println!("{:?}", r.verdict);
                for reason in &r.reasons {
                    println!("  - {reason}");
                }
            }
            None => println!("unhealthy: no status record available"),
        },
        OutputFormat::Json => {
            let obj = serde_json::json!({ "report": report });
            if let Ok(rendered) = serde_json::to_string_pretty(&obj) {
                println!("{rendered}");
            }
        }
    }
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
