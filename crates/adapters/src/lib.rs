// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! monitor-adapters: the one genuinely swappable seam of the monitor
//! subsystem — "how do we run an external command" — behind a trait.

pub mod command;

pub use command::{BoundedBuffer, CommandOutcome, CommandRunner, TokioCommandRunner};

#[cfg(any(test, feature = "test-support"))]
pub mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeCommandRunner, RecordedCall};
