// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! BSD readiness backend over kqueue.

use std::collections::{HashMap, HashSet};
use std::os::fd::RawFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::config::LoopConfig;
use crate::error::ReactorError;
use crate::table::WatcherTable;
use crate::watcher::{Watcher, WatcherId};

use super::dispatch::{dispatch_io, dispatch_periodic, dispatch_raised_signals};
use super::Backend;

/// Builds a kevent registering readability interest for `fd`, tagged with
/// `udata` so the corresponding watcher id can be recovered from the
/// returned event without a second table (mirrors how `epoll_event.u64`
/// is used in the epoll backend).
fn read_event(fd: RawFd, flags: u16, udata: isize) -> libc::kevent {
    libc::kevent {
        ident: fd as usize,
        filter: libc::EVFILT_READ,
        flags,
        fflags: 0,
        data: 0,
        udata: udata as *mut libc::c_void,
    }
}

/// Builds a kevent registering a recurring `EVFILT_TIMER` firing every
/// `interval_ms` milliseconds. `ident` is the watcher id's own index: kqueue
/// keys events by `(ident, filter)`, so reusing the id as the ident can't
/// collide with an `EVFILT_READ` registration over a real fd.
fn timer_event(ident: usize, flags: u16, interval_ms: i64) -> libc::kevent {
    libc::kevent {
        ident,
        filter: libc::EVFILT_TIMER,
        flags,
        fflags: 0,
        data: interval_ms as isize,
        udata: std::ptr::null_mut(),
    }
}

pub struct KqueueBackend {
    kq_fd: RawFd,
    max_events: usize,
    readiness_idle: Duration,
    by_fd: HashMap<RawFd, WatcherId>,
    periodic_ids: HashSet<usize>,
}

impl Backend for KqueueBackend {
    fn init(cfg: &LoopConfig) -> Result<Self, ReactorError> {
        // SAFETY: `kqueue()` takes no arguments; a negative return is the
        // documented error signal.
        let kq_fd = unsafe { libc::kqueue() };
        if kq_fd < 0 {
            return Err(ReactorError::BackendInit(std::io::Error::last_os_error()));
        }
        Ok(Self {
            kq_fd,
            max_events: cfg.max_events,
            readiness_idle: cfg.readiness_idle,
            by_fd: HashMap::new(),
            periodic_ids: HashSet::new(),
        })
    }

    fn destroy(&mut self) {
        if self.kq_fd >= 0 {
            // SAFETY: `kq_fd` is owned by this backend and closed exactly once.
            unsafe {
                libc::close(self.kq_fd);
            }
            self.kq_fd = -1;
        }
        self.periodic_ids.clear();
    }

    fn fork(&mut self) -> Result<(), ReactorError> {
        self.destroy();
        // SAFETY: same preconditions as `init`.
        let kq_fd = unsafe { libc::kqueue() };
        if kq_fd < 0 {
            return Err(ReactorError::Fork(std::io::Error::last_os_error()));
        }
        self.kq_fd = kq_fd;
        self.by_fd.clear();
        Ok(())
    }

    fn run(&mut self, running: &AtomicBool, watchers: &mut WatcherTable) -> Result<(), ReactorError> {
        let mut events: Vec<libc::kevent> = vec![read_event(0, 0, 0); self.max_events];
        let timeout = libc::timespec {
            tv_sec: 0,
            tv_nsec: self.readiness_idle.as_nanos() as i64,
        };

        while running.load(Ordering::SeqCst) {
            dispatch_raised_signals(watchers);

            // SAFETY: `events.as_mut_ptr()` points at a live buffer sized
            // for `events.len()` entries; `&timeout` lives for the call.
            let n = unsafe {
                libc::kevent(
                    self.kq_fd,
                    std::ptr::null(),
                    0,
                    events.as_mut_ptr(),
                    events.len() as i32,
                    &timeout,
                )
            };
            if n < 0 {
                let err = std::io::Error::last_os_error();
                if err.kind() == std::io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(ReactorError::Wait(err));
            }
            for event in &events[..n as usize] {
                if event.filter == libc::EVFILT_TIMER {
                    dispatch_periodic(WatcherId(event.ident), watchers);
                    continue;
                }
                let fd = event.ident as RawFd;
                let Some(&id) = self.by_fd.get(&fd) else {
                    continue;
                };
                dispatch_io(id, fd, watchers);
            }
        }
        Ok(())
    }

    fn io_start(&mut self, id: WatcherId, watcher: &Watcher) -> Result<(), ReactorError> {
        let Some(fd) = watcher.fd() else {
            return Ok(());
        };
        let change = read_event(fd, libc::EV_ADD | libc::EV_CLEAR, id.0 as isize);
        // SAFETY: a single-element changelist pointer with matching length,
        // no output buffer requested.
        let rc = unsafe {
            libc::kevent(
                self.kq_fd,
                &change,
                1,
                std::ptr::null_mut(),
                0,
                std::ptr::null(),
            )
        };
        if rc < 0 {
            return Err(ReactorError::WatcherRegister(std::io::Error::last_os_error()));
        }
        self.by_fd.insert(fd, id);
        Ok(())
    }

    fn io_stop(&mut self, _id: WatcherId, watcher: &Watcher) -> Result<(), ReactorError> {
        let Some(fd) = watcher.fd() else {
            return Ok(());
        };
        let change = read_event(fd, libc::EV_DELETE, 0);
        // SAFETY: same preconditions as `io_start`.
        let rc = unsafe {
            libc::kevent(
                self.kq_fd,
                &change,
                1,
                std::ptr::null_mut(),
                0,
                std::ptr::null(),
            )
        };
        self.by_fd.remove(&fd);
        if rc < 0 {
            let err = std::io::Error::last_os_error();
            if err.raw_os_error() != Some(libc::ENOENT) {
                return Err(ReactorError::WatcherDeregister(err));
            }
        }
        Ok(())
    }

    fn periodic_start(&mut self, id: WatcherId, interval: Duration) -> Result<(), ReactorError> {
        let change = timer_event(id.0, libc::EV_ADD | libc::EV_ENABLE, interval.as_millis() as i64);
        // SAFETY: same preconditions as `io_start`; `EVFILT_TIMER` and
        // `EVFILT_READ` occupy independent ident spaces, so reusing `id.0`
        // here can't collide with an fd-keyed registration.
        let rc = unsafe {
            libc::kevent(
                self.kq_fd,
                &change,
                1,
                std::ptr::null_mut(),
                0,
                std::ptr::null(),
            )
        };
        if rc < 0 {
            return Err(ReactorError::WatcherRegister(std::io::Error::last_os_error()));
        }
        self.periodic_ids.insert(id.0);
        Ok(())
    }

    fn periodic_stop(&mut self, id: WatcherId) -> Result<(), ReactorError> {
        if !self.periodic_ids.remove(&id.0) {
            return Ok(());
        }
        let change = timer_event(id.0, libc::EV_DELETE, 0);
        // SAFETY: same preconditions as `io_stop`.
        let rc = unsafe {
            libc::kevent(
                self.kq_fd,
                &change,
                1,
                std::ptr::null_mut(),
                0,
                std::ptr::null(),
            )
        };
        if rc < 0 {
            let err = std::io::Error::last_os_error();
            if err.raw_os_error() != Some(libc::ENOENT) {
                return Err(ReactorError::WatcherDeregister(err));
            }
        }
        Ok(())
    }

    fn prep_submit_send(&mut self, fd: RawFd, msg: &[u8]) -> Result<usize, ReactorError> {
        let mut written = 0usize;
        while written < msg.len() {
            // SAFETY: `msg[written..]` is a valid slice for its length for
            // the duration of this call.
            let n = unsafe {
                libc::write(
                    fd,
                    msg[written..].as_ptr() as *const libc::c_void,
                    (msg.len() - written) as libc::size_t,
                )
            };
            if n < 0 {
                let err = std::io::Error::last_os_error();
                if err.kind() == std::io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(ReactorError::Wait(err));
            }
            written += n as usize;
        }
        Ok(written)
    }

    fn wait_recv(&mut self) -> Result<(), ReactorError> {
        Ok(())
    }
}
