// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The portable event loop: a state machine wrapping one platform
//! [`Backend`] plus the watcher table shared by all of them.

use std::os::fd::RawFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, instrument};

use crate::backend::Backend;
use crate::config::{Backend as BackendKind, LoopConfig};
use crate::error::ReactorError;
use crate::table::WatcherTable;
use crate::watcher::{Watcher, WatcherId};

#[cfg(all(target_os = "linux", feature = "io_uring"))]
use crate::backend::completion::CompletionBackend;
#[cfg(target_os = "linux")]
use crate::backend::epoll::EpollBackend;
#[cfg(any(
    target_os = "macos",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "dragonfly"
))]
use crate::backend::kqueue::KqueueBackend;

/// `UNINIT -> READY -> RUNNING -> STOPPING -> DESTROYED`. Most operations
/// are only legal in a subset of these states; the wrong call is rejected
/// with [`ReactorError::InvalidState`] rather than silently ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Uninit,
    Ready,
    Running,
    Stopping,
    Destroyed,
}

enum AnyBackend {
    #[cfg(all(target_os = "linux", feature = "io_uring"))]
    Completion(CompletionBackend),
    #[cfg(target_os = "linux")]
    Epoll(EpollBackend),
    #[cfg(any(
        target_os = "macos",
        target_os = "freebsd",
        target_os = "netbsd",
        target_os = "openbsd",
        target_os = "dragonfly"
    ))]
    Kqueue(KqueueBackend),
}

macro_rules! for_backend {
    ($self:expr, $b:ident => $body:expr) => {
        match $self {
            #[cfg(all(target_os = "linux", feature = "io_uring"))]
            AnyBackend::Completion($b) => $body,
            #[cfg(target_os = "linux")]
            AnyBackend::Epoll($b) => $body,
            #[cfg(any(
                target_os = "macos",
                target_os = "freebsd",
                target_os = "netbsd",
                target_os = "openbsd",
                target_os = "dragonfly"
            ))]
            AnyBackend::Kqueue($b) => $body,
        }
    };
}

impl AnyBackend {
    fn init(kind: BackendKind, cfg: &LoopConfig) -> Result<Self, ReactorError> {
        let resolved = if kind == BackendKind::Auto {
            crate::backend::default_backend_kind()
        } else {
            kind
        };
        match resolved {
            #[cfg(all(target_os = "linux", feature = "io_uring"))]
            BackendKind::Completion => Ok(AnyBackend::Completion(CompletionBackend::init(cfg)?)),
            #[cfg(target_os = "linux")]
            BackendKind::ReadinessLinux => Ok(AnyBackend::Epoll(EpollBackend::init(cfg)?)),
            #[cfg(any(
                target_os = "macos",
                target_os = "freebsd",
                target_os = "netbsd",
                target_os = "openbsd",
                target_os = "dragonfly"
            ))]
            BackendKind::ReadinessBsd => Ok(AnyBackend::Kqueue(KqueueBackend::init(cfg)?)),
            _ => Err(ReactorError::UnsupportedPlatform),
        }
    }

    fn destroy(&mut self) {
        for_backend!(self, b => b.destroy())
    }

    fn fork(&mut self) -> Result<(), ReactorError> {
        for_backend!(self, b => b.fork())
    }

    fn run(&mut self, running: &AtomicBool, watchers: &mut WatcherTable) -> Result<(), ReactorError> {
        for_backend!(self, b => b.run(running, watchers))
    }

    fn io_start(&mut self, id: WatcherId, watcher: &Watcher) -> Result<(), ReactorError> {
        for_backend!(self, b => b.io_start(id, watcher))
    }

    fn io_stop(&mut self, id: WatcherId, watcher: &Watcher) -> Result<(), ReactorError> {
        for_backend!(self, b => b.io_stop(id, watcher))
    }

    fn periodic_start(&mut self, id: WatcherId, interval: std::time::Duration) -> Result<(), ReactorError> {
        for_backend!(self, b => b.periodic_start(id, interval))
    }

    fn periodic_stop(&mut self, id: WatcherId) -> Result<(), ReactorError> {
        for_backend!(self, b => b.periodic_stop(id))
    }

    fn prep_submit_send(&mut self, fd: RawFd, msg: &[u8]) -> Result<usize, ReactorError> {
        for_backend!(self, b => b.prep_submit_send(fd, msg))
    }

    fn wait_recv(&mut self) -> Result<(), ReactorError> {
        for_backend!(self, b => b.wait_recv())
    }
}

pub struct EventLoop {
    state: LoopState,
    backend: Option<AnyBackend>,
    backend_kind: BackendKind,
    watchers: WatcherTable,
    running: Arc<AtomicBool>,
}

impl EventLoop {
    /// `UNINIT -> READY`.
    #[instrument(skip(cfg))]
    pub fn init(cfg: &LoopConfig) -> Result<Self, ReactorError> {
        let backend = AnyBackend::init(cfg.backend, cfg)?;
        info!(backend = ?cfg.backend, max_events = cfg.max_events, "event loop ready");
        Ok(Self {
            state: LoopState::Ready,
            backend: Some(backend),
            backend_kind: cfg.backend,
            watchers: WatcherTable::new(),
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    fn require(&self, expected: LoopState) -> Result<(), ReactorError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(ReactorError::InvalidState { state: self.state })
        }
    }

    /// Register a watcher and arm it with the backend. Legal in `Ready` or
    /// `Running` (a callback may register a new watcher from inside the
    /// loop, e.g. a freshly accepted connection).
    pub fn register(&mut self, watcher: Watcher) -> Result<WatcherId, ReactorError> {
        if self.state != LoopState::Ready && self.state != LoopState::Running {
            return Err(ReactorError::InvalidState { state: self.state });
        }

        // `sigaction` is the only thing that actually arms a signal; a
        // SIGNAL watcher has no fd for `io_start` to register with a
        // backend, so it is wired here instead.
        if let Watcher::Signal(s) = &watcher {
            crate::signal::watch(s.signum)?;
        }

        let periodic_interval = match &watcher {
            Watcher::Periodic(p) => Some(p.interval),
            _ => None,
        };

        let id = self.watchers.insert(watcher);
        let backend = self.backend.as_mut().expect("backend present while Ready/Running");
        match periodic_interval {
            Some(interval) => backend.periodic_start(id, interval)?,
            None => {
                let watcher_ref = self.watchers.get(id).expect("just inserted");
                if !matches!(watcher_ref, Watcher::Signal(_)) {
                    backend.io_start(id, watcher_ref)?;
                }
            }
        }
        Ok(id)
    }

    pub fn deregister(&mut self, id: WatcherId) -> Result<(), ReactorError> {
        let Some(watcher) = self.watchers.get(id) else {
            return Ok(());
        };
        let backend = self.backend.as_mut().expect("backend present while registered");
        match watcher {
            Watcher::Periodic(_) => backend.periodic_stop(id)?,
            Watcher::Signal(_) => {}
            _ => backend.io_stop(id, watcher)?,
        }
        self.watchers.remove(id);
        Ok(())
    }

    /// A signal-handler-safe stop request: an atomic store only, callable
    /// from [`crate::signal`]'s handler path or from any thread.
    pub fn break_loop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// A clone of the running flag, for callers that need to request a stop
    /// from another thread while [`Self::run`] holds `&mut self` on the loop
    /// thread.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn is_running(&self) -> bool {
        self.state == LoopState::Running
    }

    /// `READY -> RUNNING -> STOPPING -> READY`. Blocks until [`Self::break_loop`]
    /// is called or the backend reports an error.
    #[instrument(skip(self))]
    pub fn run(&mut self) -> Result<(), ReactorError> {
        self.require(LoopState::Ready)?;
        self.state = LoopState::Running;
        self.running.store(true, Ordering::SeqCst);

        let backend = self.backend.as_mut().expect("backend present while Running");
        let result = backend.run(&self.running, &mut self.watchers);

        self.state = LoopState::Stopping;
        self.running.store(false, Ordering::SeqCst);
        self.state = LoopState::Ready;
        result
    }

    /// Re-initializes backend state after `fork()`. Legal only in `Ready`.
    pub fn fork(&mut self) -> Result<(), ReactorError> {
        self.require(LoopState::Ready)?;
        self.backend
            .as_mut()
            .expect("backend present while Ready")
            .fork()
    }

    /// Submits `msg` to `fd` through the active backend, blocking until the
    /// kernel has accepted it.
    pub fn prep_submit_send(&mut self, fd: RawFd, msg: &[u8]) -> Result<usize, ReactorError> {
        self.backend
            .as_mut()
            .expect("backend present while registered")
            .prep_submit_send(fd, msg)
    }

    /// Blocks until the notification for the most recent
    /// [`Self::prep_submit_send`] call has been observed.
    pub fn wait_recv(&mut self) -> Result<(), ReactorError> {
        self.backend
            .as_mut()
            .expect("backend present while registered")
            .wait_recv()
    }

    /// `READY -> DESTROYED`, releasing the backend's kernel resources. Any
    /// WORKER watcher still registered has its send descriptor closed here.
    pub fn destroy(mut self) {
        for (_, watcher) in self.watchers.iter() {
            if let Some(snd_fd) = watcher.snd_fd() {
                // SAFETY: `snd_fd` is owned by this watcher for the loop's
                // lifetime; `loop_destroy` closes it exactly once, here.
                unsafe {
                    libc::close(snd_fd);
                }
            }
        }
        if let Some(mut backend) = self.backend.take() {
            backend.destroy();
        }
        self.state = LoopState::Destroyed;
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend_kind
    }
}

#[cfg(test)]
#[path = "loop_tests.rs"]
mod tests;
