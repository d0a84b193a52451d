// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The seam between the portable loop and a platform's I/O notification
//! mechanism. Three implementations exist: a completion-based backend over
//! io_uring, and two readiness-based backends over epoll and kqueue.

use std::os::fd::RawFd;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use crate::config::LoopConfig;
use crate::error::ReactorError;
use crate::table::WatcherTable;
use crate::watcher::{Watcher, WatcherId};

#[cfg(all(target_os = "linux", feature = "io_uring"))]
pub mod completion;
pub mod dispatch;
#[cfg(target_os = "linux")]
pub mod epoll;
#[cfg(any(
    target_os = "macos",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "dragonfly"
))]
pub mod kqueue;

/// A platform I/O back-end. Implementors own whatever kernel handle backs
/// notification (an epoll fd, a kqueue fd, an io_uring instance) and
/// translate between it and the loop's [`WatcherTable`].
pub trait Backend {
    fn init(cfg: &LoopConfig) -> Result<Self, ReactorError>
    where
        Self: Sized;

    /// Release the backend's kernel resources. Called once, from
    /// `EventLoop::destroy`.
    fn destroy(&mut self);

    /// Re-initialize after a `fork()`, since kernel notification handles are
    /// not inherited in a way that's safe to keep using across the fork.
    fn fork(&mut self) -> Result<(), ReactorError>;

    /// Block until at least one event is ready (or `running` is cleared),
    /// dispatching each ready watcher's callback before returning.
    fn run(&mut self, running: &AtomicBool, watchers: &mut WatcherTable) -> Result<(), ReactorError>;

    fn io_start(&mut self, id: WatcherId, watcher: &Watcher) -> Result<(), ReactorError>;
    fn io_stop(&mut self, id: WatcherId, watcher: &Watcher) -> Result<(), ReactorError>;

    /// Arms the platform timer facility (`timerfd`, `EVFILT_TIMER`, or an
    /// io_uring multishot timeout) for a periodic watcher firing every
    /// `interval`.
    fn periodic_start(&mut self, id: WatcherId, interval: Duration) -> Result<(), ReactorError>;
    fn periodic_stop(&mut self, id: WatcherId) -> Result<(), ReactorError>;

    /// Submits `msg` to `fd` and blocks until the kernel has accepted it,
    /// returning the number of bytes submitted. A deliberately synchronous
    /// operation layered inside an otherwise event-driven loop, ported
    /// as-is from the source's `prep_submit_send`/`wait_recv` pair.
    fn prep_submit_send(&mut self, fd: RawFd, msg: &[u8]) -> Result<usize, ReactorError>;

    /// Blocks until the notification for the most recent
    /// [`Backend::prep_submit_send`] call has been observed.
    fn wait_recv(&mut self) -> Result<(), ReactorError>;
}

/// Picks the best backend kind for the running platform when
/// [`crate::config::Backend::Auto`] is configured.
pub fn default_backend_kind() -> crate::config::Backend {
    #[cfg(all(target_os = "linux", feature = "io_uring"))]
    {
        crate::config::Backend::Completion
    }
    #[cfg(all(target_os = "linux", not(feature = "io_uring")))]
    {
        crate::config::Backend::ReadinessLinux
    }
    #[cfg(any(
        target_os = "macos",
        target_os = "freebsd",
        target_os = "netbsd",
        target_os = "openbsd",
        target_os = "dragonfly"
    ))]
    {
        crate::config::Backend::ReadinessBsd
    }
}
