// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dispatch helpers shared by every backend: accepting on a MAIN watcher,
//! invoking a worker's I/O callback, firing a periodic tick, and draining
//! signal flags. None of this touches kernel notification state, so it
//! lives outside any one backend module.

use std::os::fd::RawFd;

use tracing::{debug, warn};

use crate::table::WatcherTable;
use crate::watcher::{Watcher, WatcherId};

/// Accepts one connection off `listen_fd` and sets it non-blocking. Used by
/// the readiness backends, which get a single "fd is ready" notification
/// and must drain it themselves (unlike the completion backend's
/// multishot-accept submission, which the kernel resubmits on its own).
fn accept_one(listen_fd: RawFd) -> std::io::Result<RawFd> {
    // SAFETY: `listen_fd` is a live listening socket for the duration of
    // this call; a null addr/addrlen pair is the documented way to accept
    // without retrieving the peer address.
    let fd = unsafe { libc::accept(listen_fd, std::ptr::null_mut(), std::ptr::null_mut()) };
    if fd < 0 {
        return Err(std::io::Error::last_os_error());
    }
    // SAFETY: `fd` was just returned by `accept` above and is owned by
    // this call until it is handed back to the caller.
    let rc = unsafe { libc::fcntl(fd, libc::F_SETFL, libc::O_NONBLOCK) };
    if rc != 0 {
        let err = std::io::Error::last_os_error();
        // SAFETY: `fd` is still owned by this call; closing it here avoids
        // leaking a descriptor we can't hand back in a usable state.
        unsafe { libc::close(fd) };
        return Err(err);
    }
    Ok(fd)
}

/// Dispatches a readiness notification on `fd` to whichever watcher owns
/// it: MAIN watchers drain every pending connection off the listen socket,
/// WORKER watchers get their I/O callback invoked once.
pub fn dispatch_io(id: WatcherId, fd: RawFd, watchers: &mut WatcherTable) {
    match watchers.get(id) {
        Some(Watcher::Worker(w)) => {
            let callback = w.on_io.clone();
            let status = callback(id, fd, &[]);
            if status.is_terminal() {
                debug!(?status, ?id, "worker watcher reached a terminal status");
            }
        }
        Some(Watcher::Main(w)) => {
            let callback = w.on_accept.clone();
            loop {
                match accept_one(fd) {
                    Ok(accepted) => {
                        let status = callback(id, accepted, &[]);
                        if status.is_terminal() {
                            debug!(?id, "main watcher reached a terminal status");
                        }
                    }
                    Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => break,
                    Err(err) => {
                        warn!(?id, %err, "accept failed");
                        break;
                    }
                }
            }
        }
        _ => {}
    }
}

/// Fires one periodic watcher's tick callback. The caller (a platform timer
/// facility — a `timerfd`, an `EVFILT_TIMER` kevent, or an io_uring
/// multishot timeout) is responsible for deciding *when* this is due; this
/// function only invokes the callback for the watcher named by `id`.
pub fn dispatch_periodic(id: WatcherId, watchers: &mut WatcherTable) {
    if let Some(Watcher::Periodic(p)) = watchers.get(id) {
        let callback = p.on_tick.clone();
        let status = callback(id);
        if status.is_terminal() {
            warn!(?id, "periodic watcher reported a terminal status");
        }
    }
}

pub fn dispatch_raised_signals(watchers: &mut WatcherTable) {
    for signum in crate::signal::drain_raised() {
        let matching: Vec<WatcherId> = watchers
            .iter()
            .filter_map(|(id, w)| match w {
                Watcher::Signal(s) if s.signum == signum => Some(id),
                _ => None,
            })
            .collect();
        for id in matching {
            if let Some(Watcher::Signal(s)) = watchers.get(id) {
                (s.on_signal)(id, signum);
            }
        }
    }
}
