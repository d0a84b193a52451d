// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Linux readiness backend over epoll.

use std::collections::HashMap;
use std::os::fd::RawFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::config::LoopConfig;
use crate::error::ReactorError;
use crate::table::WatcherTable;
use crate::watcher::{Watcher, WatcherId};

use super::dispatch::{dispatch_io, dispatch_periodic, dispatch_raised_signals};
use super::Backend;

fn duration_to_timespec(d: Duration) -> libc::timespec {
    libc::timespec {
        tv_sec: d.as_secs() as libc::time_t,
        tv_nsec: d.subsec_nanos() as libc::c_long,
    }
}

pub struct EpollBackend {
    epoll_fd: RawFd,
    max_events: usize,
    readiness_idle: Duration,
    /// fd -> watcher id, since epoll events carry only the fd (via
    /// `epoll_event.u64`, which we set to the fd directly).
    by_fd: HashMap<RawFd, WatcherId>,
    /// Separate table for `timerfd`s backing periodic watchers: a timerfd
    /// is never the watcher's own registered fd (`Watcher::fd()` returns
    /// `None` for `Periodic`), so it can't collide with `by_fd`.
    periodic_fds: HashMap<WatcherId, RawFd>,
    by_periodic_fd: HashMap<RawFd, WatcherId>,
}

impl EpollBackend {
    fn close_periodic(&mut self, id: WatcherId) {
        if let Some(fd) = self.periodic_fds.remove(&id) {
            self.by_periodic_fd.remove(&fd);
            // SAFETY: `fd` is the timerfd this backend created in
            // `periodic_start` for `id` and is owned exclusively by it.
            let rc = unsafe { libc::epoll_ctl(self.epoll_fd, libc::EPOLL_CTL_DEL, fd, std::ptr::null_mut()) };
            let _ = rc;
            unsafe {
                libc::close(fd);
            }
        }
    }
}

impl Backend for EpollBackend {
    fn init(cfg: &LoopConfig) -> Result<Self, ReactorError> {
        // SAFETY: `epoll_create1` takes no pointers; a negative return is
        // the documented error signal.
        let epoll_fd = unsafe { libc::epoll_create1(libc::EPOLL_CLOEXEC) };
        if epoll_fd < 0 {
            return Err(ReactorError::BackendInit(std::io::Error::last_os_error()));
        }
        Ok(Self {
            epoll_fd,
            max_events: cfg.max_events,
            readiness_idle: cfg.readiness_idle,
            by_fd: HashMap::new(),
            periodic_fds: HashMap::new(),
            by_periodic_fd: HashMap::new(),
        })
    }

    fn destroy(&mut self) {
        let periodic_ids: Vec<WatcherId> = self.periodic_fds.keys().copied().collect();
        for id in periodic_ids {
            self.close_periodic(id);
        }
        if self.epoll_fd >= 0 {
            // SAFETY: `epoll_fd` is owned by this backend and closed exactly once.
            unsafe {
                libc::close(self.epoll_fd);
            }
            self.epoll_fd = -1;
        }
    }

    fn fork(&mut self) -> Result<(), ReactorError> {
        self.destroy();
        // SAFETY: same preconditions as `init`.
        let epoll_fd = unsafe { libc::epoll_create1(libc::EPOLL_CLOEXEC) };
        if epoll_fd < 0 {
            return Err(ReactorError::Fork(std::io::Error::last_os_error()));
        }
        self.epoll_fd = epoll_fd;
        self.by_fd.clear();
        self.periodic_fds.clear();
        self.by_periodic_fd.clear();
        Ok(())
    }

    fn run(&mut self, running: &AtomicBool, watchers: &mut WatcherTable) -> Result<(), ReactorError> {
        let mut events: Vec<libc::epoll_event> = vec![
            libc::epoll_event { events: 0, u64: 0 };
            self.max_events
        ];

        while running.load(Ordering::SeqCst) {
            dispatch_raised_signals(watchers);

            // SAFETY: `events.as_mut_ptr()` points at a live, correctly
            // sized buffer for the duration of the call; `epoll_wait`
            // writes at most `events.len()` entries into it.
            let n = unsafe {
                libc::epoll_wait(
                    self.epoll_fd,
                    events.as_mut_ptr(),
                    events.len() as i32,
                    self.readiness_idle.as_millis() as i32,
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
                let fd = event.u64 as RawFd;
                if let Some(&id) = self.by_fd.get(&fd) {
                    dispatch_io(id, fd, watchers);
                    continue;
                }
                if let Some(&id) = self.by_periodic_fd.get(&fd) {
                    let mut count = 0u64;
                    // SAFETY: `fd` is a live timerfd and `count` is a valid
                    // 8-byte buffer for the expiration counter it writes.
                    unsafe {
                        libc::read(fd, &mut count as *mut u64 as *mut libc::c_void, 8);
                    }
                    dispatch_periodic(id, watchers);
                }
            }
        }
        Ok(())
    }

    fn io_start(&mut self, id: WatcherId, watcher: &Watcher) -> Result<(), ReactorError> {
        let Some(fd) = watcher.fd() else {
            return Ok(());
        };
        let mut event = libc::epoll_event {
            events: (libc::EPOLLIN | libc::EPOLLRDHUP) as u32,
            u64: fd as u64,
        };
        // SAFETY: `epoll_fd` is valid for the backend's lifetime and
        // `&mut event` is a live, correctly-typed pointer for the duration
        // of the call.
        let rc = unsafe { libc::epoll_ctl(self.epoll_fd, libc::EPOLL_CTL_ADD, fd, &mut event) };
        if rc != 0 {
            return Err(ReactorError::WatcherRegister(std::io::Error::last_os_error()));
        }
        self.by_fd.insert(fd, id);
        Ok(())
    }

    fn io_stop(&mut self, _id: WatcherId, watcher: &Watcher) -> Result<(), ReactorError> {
        let Some(fd) = watcher.fd() else {
            return Ok(());
        };
        // SAFETY: a null event pointer is valid for `EPOLL_CTL_DEL`, which
        // ignores the event argument.
        let rc = unsafe { libc::epoll_ctl(self.epoll_fd, libc::EPOLL_CTL_DEL, fd, std::ptr::null_mut()) };
        self.by_fd.remove(&fd);
        if rc != 0 {
            let err = std::io::Error::last_os_error();
            if err.raw_os_error() != Some(libc::ENOENT) {
                return Err(ReactorError::WatcherDeregister(err));
            }
        }
        Ok(())
    }

    fn periodic_start(&mut self, id: WatcherId, interval: Duration) -> Result<(), ReactorError> {
        // SAFETY: no pointers involved; a negative return is the
        // documented error signal.
        let timer_fd = unsafe { libc::timerfd_create(libc::CLOCK_MONOTONIC, libc::TFD_NONBLOCK) };
        if timer_fd < 0 {
            return Err(ReactorError::WatcherRegister(std::io::Error::last_os_error()));
        }
        let ts = duration_to_timespec(interval);
        let spec = libc::itimerspec {
            it_interval: ts,
            it_value: ts,
        };
        // SAFETY: `timer_fd` was just created above; `&spec` is a live,
        // correctly-typed pointer for the duration of the call.
        let rc = unsafe { libc::timerfd_settime(timer_fd, 0, &spec, std::ptr::null_mut()) };
        if rc != 0 {
            let err = std::io::Error::last_os_error();
            unsafe {
                libc::close(timer_fd);
            }
            return Err(ReactorError::WatcherRegister(err));
        }
        let mut event = libc::epoll_event {
            events: libc::EPOLLIN as u32,
            u64: timer_fd as u64,
        };
        // SAFETY: same preconditions as `io_start`.
        let rc = unsafe { libc::epoll_ctl(self.epoll_fd, libc::EPOLL_CTL_ADD, timer_fd, &mut event) };
        if rc != 0 {
            let err = std::io::Error::last_os_error();
            unsafe {
                libc::close(timer_fd);
            }
            return Err(ReactorError::WatcherRegister(err));
        }
        self.periodic_fds.insert(id, timer_fd);
        self.by_periodic_fd.insert(timer_fd, id);
        Ok(())
    }

    fn periodic_stop(&mut self, id: WatcherId) -> Result<(), ReactorError> {
        self.close_periodic(id);
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
        // `prep_submit_send` above already blocks until the write syscall
        // returns; a readiness backend has no separate completion to wait
        // for.
        Ok(())
    }
}
