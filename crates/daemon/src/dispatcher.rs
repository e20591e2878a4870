// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess dispatcher.
//!
//! Drains the event queue and invokes the configured ingestion command for
//! each event, retrying transient failures with exponential backoff and
//! classifying outcomes into success/transient/permanent. Execution itself
//! is delegated to a `monitor_adapters::CommandRunner` so this module stays
//! free of process-spawning details.

use std::sync::Arc;
use std::time::Duration;

use monitor_adapters::{CommandOutcome, CommandRunner};
use monitor_core::config::MonitorConfig;
use monitor_core::event::{ChangeKind, FileChangeEvent};
use monitor_core::outcome::DispatchOutcome;
use monitor_core::MonitorStatistics;

use crate::queue::EventQueue;
use crate::shutdown::ShutdownHandle;

/// Classify a raw `CommandOutcome` into success, a retryable transient
/// failure, or a non-retryable permanent failure.
fn classify(outcome: &CommandOutcome, permanent_patterns: &[String]) -> DispatchOutcome {
    match outcome {
        CommandOutcome::Completed { exit_code: Some(0), .. } => DispatchOutcome::Success,
        CommandOutcome::TimedOut => DispatchOutcome::TransientFailure {
            reason: "subprocess timed out".to_string(),
            is_timeout: true,
        },
        CommandOutcome::SpawnFailed { message } => {
            let lower = message.to_lowercase();
            if lower.contains("not found") || lower.contains("permission denied") || lower.contains("no such file") {
                DispatchOutcome::PermanentFailure {
                    reason: message.clone(),
                }
            } else {
                DispatchOutcome::TransientFailure {
                    reason: message.clone(),
                    is_timeout: false,
                }
            }
        }
        CommandOutcome::Completed { exit_code, stderr, .. } => {
            let lower_stderr = stderr.to_lowercase();
            let matches_permanent = permanent_patterns
                .iter()
                .any(|p| lower_stderr.contains(&p.to_lowercase()));

            if matches_permanent {
                DispatchOutcome::PermanentFailure {
                    reason: format!("exit {:?}: {}", exit_code, stderr.trim()),
                }
            } else {
                DispatchOutcome::TransientFailure {
                    reason: format!("exit {:?}: {}", exit_code, stderr.trim()),
                    is_timeout: false,
                }
            }
        }
    }
}

fn build_args(config: &MonitorConfig, event: &FileChangeEvent) -> Vec<String> {
    let mut args = config.fixed_args.clone();
    args.push(event.change_kind.verb().to_string());
    args.push(event.path.display().to_string());
    args
}

/// Dispatch one event to completion, including the full retry loop.
/// Returns the final outcome for statistics/logging purposes at the call
/// site.
async fn dispatch_one(
    config: &MonitorConfig,
    event: &FileChangeEvent,
    runner: &dyn CommandRunner,
    stats: &MonitorStatistics,
    shutdown: &ShutdownHandle,
) -> DispatchOutcome {
    let args = build_args(config, event);
    let span = tracing::info_span!(
        "dispatch",
        path = %event.path.display(),
        kind = %event.change_kind,
        attempt = tracing::field::Empty,
    );
    let _enter = span.enter();

    let mut attempt: u32 = 0;
    loop {
        span.record("attempt", attempt);
        if shutdown.is_stopping() {
            tracing::warn!("shutdown requested, abandoning dispatch before attempt");
            return DispatchOutcome::TransientFailure {
                reason: "abandoned on shutdown".to_string(),
                is_timeout: false,
            };
        }

        stats.record_subprocess_call();
        let raw = runner
            .run(&config.base_command, &args, config.subprocess_timeout, config.shutdown_grace)
            .await;
        let outcome = classify(&raw, &config.permanent_patterns);

        match &outcome {
            DispatchOutcome::Success => {
                stats.record_subprocess_success();
                tracing::info!("dispatch succeeded");
                return outcome;
            }
            DispatchOutcome::PermanentFailure { reason } => {
                stats.record_subprocess_failure();
                tracing::warn!(reason = %reason, "dispatch failed permanently, not retrying");
                return outcome;
            }
            DispatchOutcome::TransientFailure { reason, is_timeout } => {
                stats.record_subprocess_failure();
                if *is_timeout {
                    stats.record_subprocess_timeout();
                }

                if attempt >= config.max_retries {
                    tracing::warn!(reason = %reason, attempts = attempt + 1, "dispatch exhausted retries");
                    return outcome;
                }

                if shutdown.is_stopping() {
                    tracing::warn!("shutdown requested, abandoning retry loop");
                    return outcome;
                }

                stats.record_subprocess_retry();
                let delay = backoff_delay(config.base_delay, config.max_retry_delay, attempt);
                tracing::info!(reason = %reason, delay_ms = delay.as_millis() as u64, "retrying after transient failure");

                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = shutdown.wait_for_stop() => {
                        tracing::warn!("shutdown requested during retry backoff");
                        return outcome;
                    }
                }

                attempt += 1;
            }
        }
    }
}

fn backoff_delay(base: Duration, cap: Duration, attempt: u32) -> Duration {
    let factor = 2u64.saturating_pow(attempt);
    base.saturating_mul(factor as u32).min(cap)
}

/// Run the dispatcher loop until shutdown is requested, finishing whatever
/// event is currently in flight before exiting.
pub async fn run(
    config: Arc<MonitorConfig>,
    queue: Arc<EventQueue>,
    runner: Arc<dyn CommandRunner>,
    stats: Arc<MonitorStatistics>,
    shutdown: Arc<ShutdownHandle>,
) {
    loop {
        let event = match queue.dequeue_blocking(&shutdown).await {
            Some(event) => event,
            None => {
                tracing::info!("dispatcher observed shutdown, exiting");
                break;
            }
        };

        let _outcome = dispatch_one(&config, &event, runner.as_ref(), &stats, &shutdown).await;
        stats.record_event_processed();

        if shutdown.is_stopping() {
            tracing::info!("dispatcher finished in-flight event, exiting on shutdown");
            break;
        }
    }
}

/// Exposed for `monitor-cli`/tests that need to map a change kind directly
/// without going through the full event pipeline.
pub fn verb_for(change_kind: ChangeKind) -> &'static str {
    change_kind.verb()
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
