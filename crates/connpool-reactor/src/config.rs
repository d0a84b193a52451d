// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration consumed by [`crate::loop_::EventLoop::init`].
//!
//! Parsing a config file is an external collaborator; this crate only needs
//! the already-resolved backend selection and the sizing knobs that affect
//! which backend implementation gets built.

use std::sync::Arc;
use std::time::Duration;

use crate::message::MessagePool;

/// Which backend family to use. `Auto` picks the best fit for the running
/// platform: `Completion` on Linux kernels new enough for io_uring,
/// `ReadinessLinux` otherwise, `ReadinessBsd` on BSD-family targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    #[default]
    Auto = 0,
    Completion = 1,
    ReadinessLinux = 2,
    ReadinessBsd = 3,
}

/// Upper bound on events drained from the kernel in a single wait call.
pub const MAX_EVENTS: usize = 1024;

/// Default io_uring submission queue depth.
pub const DEFAULT_SQ_DEPTH: u32 = 64;
/// Default io_uring completion queue depth (larger than the SQ depth since
/// multishot accept/timeout operations can pile up several completions per
/// submission).
pub const DEFAULT_CQ_DEPTH: u32 = 128;
/// Default idle timeout for a completion-backend wait call.
pub const DEFAULT_COMPLETION_IDLE: Duration = Duration::from_micros(100);
/// Default idle timeout for a readiness-backend wait call (`epoll_wait`/`kevent`).
pub const DEFAULT_READINESS_IDLE: Duration = Duration::from_millis(10);

pub struct LoopConfig {
    pub backend: Backend,
    pub max_events: usize,
    pub message_pool: Arc<dyn MessagePool>,
    pub sq_depth: u32,
    pub cq_depth: u32,
    pub completion_idle: Duration,
    pub readiness_idle: Duration,
}

impl LoopConfig {
    pub fn new(message_pool: Arc<dyn MessagePool>) -> Self {
        Self {
            backend: Backend::Auto,
            max_events: MAX_EVENTS,
            message_pool,
            sq_depth: DEFAULT_SQ_DEPTH,
            cq_depth: DEFAULT_CQ_DEPTH,
            completion_idle: DEFAULT_COMPLETION_IDLE,
            readiness_idle: DEFAULT_READINESS_IDLE,
        }
    }

    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_max_events(mut self, max_events: usize) -> Self {
        self.max_events = max_events;
        self
    }

    pub fn with_sq_depth(mut self, sq_depth: u32) -> Self {
        self.sq_depth = sq_depth;
        self
    }

    pub fn with_cq_depth(mut self, cq_depth: u32) -> Self {
        self.cq_depth = cq_depth;
        self
    }

    pub fn with_completion_idle(mut self, completion_idle: Duration) -> Self {
        self.completion_idle = completion_idle;
        self
    }

    pub fn with_readiness_idle(mut self, readiness_idle: Duration) -> Self {
        self.readiness_idle = readiness_idle;
        self
    }
}
