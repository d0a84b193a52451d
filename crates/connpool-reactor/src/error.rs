// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the event loop and its backends.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReactorError {
    #[error("event loop is in state {state:?}, which does not allow this operation")]
    InvalidState { state: crate::loop_::LoopState },

    #[error("no backend is available for this platform")]
    UnsupportedPlatform,

    #[error("backend initialization failed: {0}")]
    BackendInit(#[source] std::io::Error),

    #[error("fork failed: {0}")]
    Fork(#[source] std::io::Error),

    #[error("registering a watcher failed: {0}")]
    WatcherRegister(#[source] std::io::Error),

    #[error("deregistering a watcher failed: {0}")]
    WatcherDeregister(#[source] std::io::Error),

    #[error("waiting for events failed: {0}")]
    Wait(#[source] std::io::Error),

    #[error("the watcher table is full ({0} entries)")]
    WatcherTableFull(usize),

    #[error("message buffer allocation failed")]
    MessageAllocation,

    #[error("signal handling setup failed: {0}")]
    Signal(#[source] std::io::Error),

    #[error("completion queue overflowed, {0} event(s) lost")]
    RingOverflow(u32),
}
