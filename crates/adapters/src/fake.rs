// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A scriptable [`CommandRunner`] for dispatcher tests: calls are recorded,
//! responses are queued up front and handed out in order.

use crate::command::{CommandOutcome, CommandRunner};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// One recorded invocation of [`CommandRunner::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub program: String,
    pub args: Vec<String>,
}

#[derive(Debug, Default)]
struct FakeState {
    calls: Vec<RecordedCall>,
    queued: VecDeque<CommandOutcome>,
}

/// A [`CommandRunner`] whose responses are pre-programmed by the test.
///
/// If the queue runs dry, every further call returns
/// `CommandOutcome::Completed` with exit code 0 and empty output.
#[derive(Debug, Clone, Default)]
pub struct FakeCommandRunner {
    state: Arc<Mutex<FakeState>>,
}

impl FakeCommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an outcome to be returned by the next call, in FIFO order.
    pub fn push_outcome(&self, outcome: CommandOutcome) {
        self.state.lock().queued.push_back(outcome);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().calls.len()
    }
}

#[async_trait]
impl CommandRunner for FakeCommandRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        _timeout: Duration,
        _kill_grace: Duration,
    ) -> CommandOutcome {
        let mut state = self.state.lock();
        state.calls.push(RecordedCall {
            program: program.to_string(),
            args: args.to_vec(),
        });
        state.queued.pop_front().unwrap_or(CommandOutcome::Completed {
            exit_code: Some(0),
            stdout: String::new(),
            stderr: String::new(),
        })
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
