// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess execution for the ingestion command.
//!
//! `CommandRunner` is the async-trait seam between the dispatcher's
//! orchestration (retry loop, outcome classification) and the actual
//! `tokio::process::Command` plumbing.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Command;

/// Default cap on captured stdout/stderr per attempt.
pub const DEFAULT_CAPTURE_CAP: usize = 64 * 1024;

/// Marker appended when captured output exceeds [`BoundedBuffer`]'s cap.
const TRUNCATION_MARKER: &str = "\n... [truncated]";

/// A byte sink that stops accumulating past a fixed capacity.
#[derive(Debug, Default)]
pub struct BoundedBuffer {
    cap: usize,
    buf: Vec<u8>,
    truncated: bool,
}

impl BoundedBuffer {
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            buf: Vec::new(),
            truncated: false,
        }
    }

    pub fn push(&mut self, chunk: &[u8]) {
        if self.truncated {
            return;
        }
        let remaining = self.cap.saturating_sub(self.buf.len());
        if chunk.len() <= remaining {
            self.buf.extend_from_slice(chunk);
        } else {
            self.buf.extend_from_slice(&chunk[..remaining]);
            self.truncated = true;
        }
    }

    pub fn truncated(&self) -> bool {
        self.truncated
    }

    /// Render the captured bytes as a lossy UTF-8 string, with the
    /// truncation marker appended when the cap was exceeded.
    pub fn into_string(self) -> String {
        let mut s = String::from_utf8_lossy(&self.buf).into_owned();
        if self.truncated {
            s.push_str(TRUNCATION_MARKER);
        }
        s
    }
}

async fn drain_bounded<R: tokio::io::AsyncRead + Unpin>(
    mut reader: R,
    cap: usize,
) -> BoundedBuffer {
    let mut buffer = BoundedBuffer::new(cap);
    let mut chunk = [0u8; 8192];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => buffer.push(&chunk[..n]),
            Err(_) => break,
        }
    }
    buffer
}

/// The raw outcome of one subprocess attempt, before the dispatcher
/// classifies it into success/transient/permanent.
#[derive(Debug, Clone)]
pub enum CommandOutcome {
    Completed {
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },
    TimedOut,
    /// Spawn itself failed (e.g. "command not found", "permission denied").
    SpawnFailed { message: String },
}

/// Executes the ingestion command. Implementations must never invoke a
/// shell — the path argument is always a single argv element.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        timeout: Duration,
        kill_grace: Duration,
    ) -> CommandOutcome;
}

/// The real implementation, built on `tokio::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioCommandRunner {
    pub capture_cap: usize,
}

impl TokioCommandRunner {
    pub fn new() -> Self {
        Self {
            capture_cap: DEFAULT_CAPTURE_CAP,
        }
    }
}

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        timeout: Duration,
        kill_grace: Duration,
    ) -> CommandOutcome {
        let cap = if self.capture_cap == 0 {
            DEFAULT_CAPTURE_CAP
        } else {
            self.capture_cap
        };

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            // New process group so the dispatcher can terminate the whole
            // group, not just the immediate child, on timeout.
            cmd.process_group(0);
        }

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => return CommandOutcome::SpawnFailed { message: e.to_string() },
        };

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let stdout_task = tokio::spawn(async move {
            match stdout {
                Some(r) => drain_bounded(r, cap).await,
                None => BoundedBuffer::new(cap),
            }
        });
        let stderr_task = tokio::spawn(async move {
            match stderr {
                Some(r) => drain_bounded(r, cap).await,
                None => BoundedBuffer::new(cap),
            }
        });

        tokio::select! {
            status = child.wait() => {
                let stdout = stdout_task.await.unwrap_or_else(|_| BoundedBuffer::new(cap));
                let stderr = stderr_task.await.unwrap_or_else(|_| BoundedBuffer::new(cap));
                match status {
                    Ok(status) => CommandOutcome::Completed {
                        exit_code: status.code(),
                        stdout: stdout.into_string(),
                        stderr: stderr.into_string(),
                    },
                    Err(e) => CommandOutcome::SpawnFailed { message: e.to_string() },
                }
            }
            _ = tokio::time::sleep(timeout) => {
                terminate(&mut child, kill_grace).await;
                stdout_task.abort();
                stderr_task.abort();
                CommandOutcome::TimedOut
            }
        }
    }
}

/// Graceful-then-hard kill: SIGTERM, wait up to `grace`, then SIGKILL.
async fn terminate(child: &mut tokio::process::Child, grace: Duration) {
    #[cfg(unix)]
    {
        if let Some(pid) = child.id() {
            let pid = nix::unistd::Pid::from_raw(pid as i32);
            let _ = nix::sys::signal::kill(pid, nix::sys::signal::Signal::SIGTERM);
        }
    }

    if tokio::time::timeout(grace, child.wait()).await.is_err() {
        let _ = child.start_kill();
        let _ = child.wait().await;
    }
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
