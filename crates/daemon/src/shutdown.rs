// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Signal & shutdown coordinator.
//!
//! A single observable "stop requested" flag plus a `tokio::sync::Notify`
//! wake-up, shared between the async signal-handling task and every
//! cooperative poller (scanner sweep loop, dispatcher retry loop, queue
//! consumer). Signal handlers themselves do no allocation or logging —
//! they only flip the flag and notify.

use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

/// Shared shutdown state observable from both async (`tokio::select!`) and
/// polling callers.
#[derive(Debug, Default)]
pub struct ShutdownHandle {
    stopping: AtomicBool,
    notify: Notify,
}

impl ShutdownHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::SeqCst)
    }

    /// Set the stop flag and wake every waiter. Idempotent.
    pub fn request_stop(&self) {
        self.stopping.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Resolves once `request_stop` has been called. If the flag is
    /// already set, resolves immediately on the next poll.
    ///
    /// Follows `tokio::sync::Notify`'s documented race-free pattern: the
    /// `notified()` future is created *before* re-checking the flag, so a
    /// `request_stop()` racing with this call is never missed.
    pub async fn wait_for_stop(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_stopping() {
                return;
            }
            notified.await;
        }
    }
}

/// Install SIGTERM/SIGINT handlers that translate into `shutdown.request_stop()`.
#[cfg(unix)]
pub fn spawn_signal_listener(shutdown: std::sync::Arc<ShutdownHandle>) -> Result<(), std::io::Error> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => {
                tracing::info!("received SIGTERM, shutting down");
            }
            _ = sigint.recv() => {
                tracing::info!("received SIGINT, shutting down");
            }
        }
        shutdown.request_stop();
    });

    Ok(())
}

#[cfg(test)]
#[path = "shutdown_tests.rs"]
mod tests;
