// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded, coalescing event queue.
//!
//! A `VecDeque` plus a `HashMap<EventKey, usize>` index gives O(1)
//! coalescing lookups, guarded by a `parking_lot::Mutex`. A
//! `tokio::sync::Notify` wakes the blocking consumer on enqueue or
//! shutdown.

use monitor_core::event::{EventKey, FileChangeEvent};
use monitor_core::MonitorStatistics;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Notify;

use crate::shutdown::ShutdownHandle;

struct Inner {
    events: VecDeque<FileChangeEvent>,
    index: HashMap<EventKey, usize>,
    capacity: usize,
}

impl Inner {
    /// Rebuild `index` after removing an item at `removed_idx` (all later
    /// indices shift down by one).
    fn reindex_after_removal(&mut self, removed_idx: usize) {
        for v in self.index.values_mut() {
            if *v > removed_idx {
                *v -= 1;
            }
        }
    }
}

/// A bounded multi-producer, single-consumer queue of `FileChangeEvent`s
/// with key-based coalescing.
pub struct EventQueue {
    inner: Mutex<Inner>,
    notify: Notify,
    stats: Arc<MonitorStatistics>,
}

impl EventQueue {
    pub fn new(capacity: usize, stats: Arc<MonitorStatistics>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                events: VecDeque::new(),
                index: HashMap::new(),
                capacity,
            }),
            notify: Notify::new(),
            stats,
        }
    }

    /// Insert `event`, coalescing with any resident event sharing its key.
    /// If at capacity, drops the oldest non-coalescible event and records
    /// `queue_overflow`.
    pub fn enqueue(&self, event: FileChangeEvent) {
        let key = event.key();
        let mut inner = self.inner.lock();

        if let Some(&idx) = inner.index.get(&key) {
            inner.events[idx].detected_at = event.detected_at;
            return;
        }

        if inner.events.len() >= inner.capacity {
            if let Some(dropped) = inner.events.pop_front() {
                let dropped_key = dropped.key();
                inner.index.remove(&dropped_key);
                inner.reindex_after_removal(0);
                tracing::warn!(
                    path = %dropped.path.display(),
                    kind = %dropped.change_kind,
                    "event queue overflow, dropping oldest event"
                );
                self.stats.record_queue_overflow();
            }
        }

        let idx = inner.events.len();
        inner.index.insert(key, idx);
        inner.events.push_back(event);
        self.stats.record_event_enqueued();
        drop(inner);
        self.notify.notify_one();
    }

    /// Pop the oldest resident event, or `None` if the queue is empty.
    fn try_dequeue(&self) -> Option<FileChangeEvent> {
        let mut inner = self.inner.lock();
        let event = inner.events.pop_front()?;
        let key = event.key();
        inner.index.remove(&key);
        inner.reindex_after_removal(0);
        Some(event)
    }

    /// Block until an event is available or shutdown is requested.
    pub async fn dequeue_blocking(&self, shutdown: &ShutdownHandle) -> Option<FileChangeEvent> {
        loop {
            if let Some(event) = self.try_dequeue() {
                return Some(event);
            }
            if shutdown.is_stopping() {
                return None;
            }

            let notified = self.notify.notified();
            tokio::select! {
                _ = notified => {}
                _ = shutdown.wait_for_stop() => {}
            }

            if let Some(event) = self.try_dequeue() {
                return Some(event);
            }
            if shutdown.is_stopping() {
                return None;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
