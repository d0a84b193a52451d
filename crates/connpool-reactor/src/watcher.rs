// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Watchers: the loop's unit of registration.
//!
//! The source keeps one `struct ev_io`/`struct ev_periodic` shape per kind
//! and dispatches on a type tag. Rust lets the tag and the payload it
//! guards live in the same place, so a watcher is a single enum instead of
//! a tagged struct plus a switch at every call site.

use std::os::fd::RawFd;
use std::sync::Arc;
use std::time::Duration;

use crate::status::Status;

/// Opaque identity for a registered watcher, stable across backend
/// reallocations (the index into the loop's watcher table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatcherId(pub usize);

/// Callback invoked with the bytes read for a connection, or an empty slice
/// on a pure readiness notification (readiness backends hand the callback
/// the fd instead of pre-read bytes; completion backends hand pre-read
/// bytes directly).
pub type IoCallback = Arc<dyn Fn(WatcherId, RawFd, &[u8]) -> Status + Send + Sync>;

/// Callback invoked on a periodic timer tick.
pub type PeriodicCallback = Arc<dyn Fn(WatcherId) -> Status + Send + Sync>;

/// Callback invoked when a watched signal arrives. Runs on the loop
/// thread after the signal-safe flag it set is observed, never inside the
/// signal handler itself.
pub type SignalCallback = Arc<dyn Fn(WatcherId, i32) + Send + Sync>;

pub struct MainWatcher {
    pub listen_fd: RawFd,
    pub on_accept: IoCallback,
}

/// A worker connection has distinct receive and send descriptors (a split
/// pipe pair, or a socket duped for independent read/write shutdown) rather
/// than one bidirectional fd; `loop_destroy` closes `snd_fd` for every
/// worker watcher still registered when the loop tears down.
pub struct WorkerWatcher {
    pub rcv_fd: RawFd,
    pub snd_fd: RawFd,
    pub on_io: IoCallback,
}

pub struct PeriodicWatcher {
    pub interval: Duration,
    pub on_tick: PeriodicCallback,
}

pub struct SignalWatcher {
    pub signum: i32,
    pub on_signal: SignalCallback,
}

/// A single registered unit of interest, tagged by role.
pub enum Watcher {
    Main(MainWatcher),
    Worker(WorkerWatcher),
    Periodic(PeriodicWatcher),
    Signal(SignalWatcher),
}

impl Watcher {
    /// The descriptor a backend registers for readiness/completion
    /// notification: the listen fd for MAIN, the receive fd for WORKER,
    /// nothing for PERIODIC/SIGNAL.
    pub fn fd(&self) -> Option<RawFd> {
        match self {
            Watcher::Main(w) => Some(w.listen_fd),
            Watcher::Worker(w) => Some(w.rcv_fd),
            Watcher::Periodic(_) | Watcher::Signal(_) => None,
        }
    }

    /// The descriptor `loop_destroy` closes on teardown, distinct from
    /// [`Watcher::fd`] only for WORKER watchers.
    pub fn snd_fd(&self) -> Option<RawFd> {
        match self {
            Watcher::Worker(w) => Some(w.snd_fd),
            Watcher::Main(_) | Watcher::Periodic(_) | Watcher::Signal(_) => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Watcher::Main(_) => "main",
            Watcher::Worker(_) => "worker",
            Watcher::Periodic(_) => "periodic",
            Watcher::Signal(_) => "signal",
        }
    }
}
