// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Completion-based backend over io_uring.
//!
//! Unlike the readiness backends, a completion queue entry carries the
//! result of an I/O operation that has already run, not a notification that
//! one *could* run. Each registered worker watcher keeps one outstanding
//! read request; its completion both delivers bytes to the callback and
//! resubmits the next read. MAIN watchers use multishot accept and
//! PERIODIC watchers a multishot timeout, both of which the kernel keeps
//! delivering completions for without a fresh submission each time.

use std::collections::HashMap;
use std::os::fd::RawFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use io_uring::{cqueue, opcode, types, IoUring};
use tracing::{debug, error, warn};

use crate::backend::dispatch::dispatch_periodic;
use crate::config::LoopConfig;
use crate::error::ReactorError;
use crate::message::MessagePool;
use crate::table::WatcherTable;
use crate::watcher::{Watcher, WatcherId};

use super::dispatch::dispatch_raised_signals;
use super::Backend;

const READ_BUF_SIZE: usize = 16 * 1024;

enum PendingOp {
    Read { fd: RawFd, buf: Box<[u8]> },
    Accept { listen_fd: RawFd },
    Periodic { interval: Duration },
    /// `prep_submit_send`'s own bookkeeping lives in `send_buf`/`send_token`;
    /// this variant only reserves the token's slot in `pending` so a stray
    /// re-drain by `run()` doesn't treat it as an unknown completion.
    Send,
}

struct Pending {
    id: WatcherId,
    op: PendingOp,
}

fn duration_to_timespec(d: Duration) -> types::Timespec {
    types::Timespec::new().sec(d.as_secs()).nsec(d.subsec_nanos())
}

pub struct CompletionBackend {
    ring: IoUring,
    message_pool: Arc<dyn MessagePool>,
    sq_depth: u32,
    cq_depth: u32,
    completion_idle: Duration,
    pending: HashMap<u64, Pending>,
    /// One outstanding op per watcher at a time (worker read, main accept,
    /// periodic timeout); used to cancel on stop.
    by_watcher: HashMap<WatcherId, u64>,
    next_token: u64,
    /// Keeps a periodic watcher's `Timespec` alive for the io_uring entry
    /// that still points at it, keyed by the watcher id rather than the
    /// token since a resubmission after a non-multishot completion gets a
    /// fresh token but reuses the same interval.
    periodic_timespecs: HashMap<WatcherId, Box<types::Timespec>>,
    send_buf: Option<Box<[u8]>>,
    send_token: Option<u64>,
}

impl CompletionBackend {
    fn build_ring(sq_depth: u32, cq_depth: u32) -> std::io::Result<IoUring> {
        IoUring::builder()
            .setup_cqsize(cq_depth)
            .setup_coop_taskrun()
            .setup_single_issuer()
            .dontfork()
            .build(sq_depth)
    }

    fn submit_read(&mut self, id: WatcherId, fd: RawFd) -> Result<(), ReactorError> {
        let mut buf = vec![0u8; READ_BUF_SIZE].into_boxed_slice();
        let token = self.next_token;
        self.next_token += 1;

        let entry = opcode::Read::new(types::Fd(fd), buf.as_mut_ptr(), buf.len() as u32)
            .build()
            .user_data(token);
        self.pending.insert(token, Pending { id, op: PendingOp::Read { fd, buf } });
        self.by_watcher.insert(id, token);

        // SAFETY: `entry`'s buffer pointer stays valid because `Pending`
        // (holding the same `Box<[u8]>`) is kept alive in `self.pending`
        // until this token's completion is reaped, and the submission
        // queue is only ever pushed to from this single-threaded backend.
        unsafe {
            self.ring
                .submission()
                .push(&entry)
                .map_err(|_| ReactorError::WatcherRegister(std::io::Error::other("submission queue full")))?;
        }
        Ok(())
    }

    fn submit_accept(&mut self, id: WatcherId, listen_fd: RawFd) -> Result<(), ReactorError> {
        let token = self.next_token;
        self.next_token += 1;

        let entry = opcode::AcceptMulti::new(types::Fd(listen_fd)).build().user_data(token);
        self.pending.insert(token, Pending { id, op: PendingOp::Accept { listen_fd } });
        self.by_watcher.insert(id, token);

        // SAFETY: multishot accept carries no user buffer; the listen fd
        // stays open for the watcher's lifetime and submission is
        // single-threaded.
        unsafe {
            self.ring
                .submission()
                .push(&entry)
                .map_err(|_| ReactorError::WatcherRegister(std::io::Error::other("submission queue full")))?;
        }
        Ok(())
    }

    fn submit_periodic(&mut self, id: WatcherId, interval: Duration) -> Result<(), ReactorError> {
        let ts = Box::new(duration_to_timespec(interval));
        let token = self.next_token;
        self.next_token += 1;

        let entry = opcode::Timeout::new(ts.as_ref() as *const types::Timespec)
            .count(0)
            .flags(io_uring::types::TimeoutFlags::MULTISHOT)
            .build()
            .user_data(token);
        self.periodic_timespecs.insert(id, ts);
        self.pending.insert(token, Pending { id, op: PendingOp::Periodic { interval } });
        self.by_watcher.insert(id, token);

        // SAFETY: the `Timespec` pointer stays valid because it is kept
        // alive in `self.periodic_timespecs` for as long as this token (or
        // its resubmission, which replaces the same map entry) is pending.
        unsafe {
            self.ring
                .submission()
                .push(&entry)
                .map_err(|_| ReactorError::WatcherRegister(std::io::Error::other("submission queue full")))?;
        }
        Ok(())
    }

    fn cancel_watcher(&mut self, id: WatcherId) -> Result<(), ReactorError> {
        let Some(token) = self.by_watcher.remove(&id) else {
            return Ok(());
        };
        self.pending.remove(&token);
        self.periodic_timespecs.remove(&id);
        let entry = opcode::AsyncCancel::new(token).build().user_data(u64::MAX);
        // SAFETY: a cancel entry carries no user buffer; harmless if the
        // target token has already completed.
        unsafe {
            let _ = self.ring.submission().push(&entry);
        }
        Ok(())
    }

    fn handle_completion(
        &mut self,
        token: u64,
        result: i32,
        flags: u32,
        watchers: &mut WatcherTable,
    ) -> Result<(), ReactorError> {
        if Some(token) == self.send_token {
            self.send_token = None;
            self.send_buf = None;
            self.pending.remove(&token);
            return Ok(());
        }
        let more = cqueue::more(flags);
        let Some(pending) = self.pending.remove(&token) else {
            return Ok(());
        };
        match pending.op {
            PendingOp::Read { fd, buf } => {
                let Some(Watcher::Worker(w)) = watchers.get(pending.id) else {
                    return Ok(());
                };
                if result <= 0 {
                    let status = (w.on_io.clone())(pending.id, fd, &[]);
                    self.message_pool.release(crate::message::Message { buf, len: 0 });
                    self.by_watcher.remove(&pending.id);
                    if !status.is_terminal() {
                        warn!(id = ?pending.id, "read completion with no bytes on a non-terminal watcher");
                    }
                    return Ok(());
                }
                let n = result as usize;
                let callback = w.on_io.clone();
                let status = callback(pending.id, fd, &buf[..n]);
                self.message_pool.release(crate::message::Message { buf, len: n });
                if status.is_terminal() {
                    self.by_watcher.remove(&pending.id);
                } else {
                    self.submit_read(pending.id, fd)?;
                }
            }
            PendingOp::Accept { listen_fd } => {
                if result >= 0 {
                    let accepted = result as RawFd;
                    if let Some(Watcher::Main(w)) = watchers.get(pending.id) {
                        let callback = w.on_accept.clone();
                        let status = callback(pending.id, accepted, &[]);
                        if status.is_terminal() {
                            debug!(id = ?pending.id, "main watcher reached a terminal status");
                        }
                    }
                } else {
                    warn!(id = ?pending.id, result, "accept completion failed");
                }
                if more {
                    self.pending.insert(token, Pending { id: pending.id, op: PendingOp::Accept { listen_fd } });
                } else {
                    self.submit_accept(pending.id, listen_fd)?;
                }
            }
            PendingOp::Periodic { interval } => {
                dispatch_periodic(pending.id, watchers);
                if more {
                    self.pending.insert(token, Pending { id: pending.id, op: PendingOp::Periodic { interval } });
                } else {
                    self.by_watcher.remove(&pending.id);
                    self.periodic_timespecs.remove(&pending.id);
                    self.submit_periodic(pending.id, interval)?;
                }
            }
            PendingOp::Send => {}
        }
        Ok(())
    }
}

impl Backend for CompletionBackend {
    fn init(cfg: &LoopConfig) -> Result<Self, ReactorError> {
        let ring = Self::build_ring(cfg.sq_depth, cfg.cq_depth).map_err(ReactorError::BackendInit)?;
        Ok(Self {
            ring,
            message_pool: Arc::clone(&cfg.message_pool),
            sq_depth: cfg.sq_depth,
            cq_depth: cfg.cq_depth,
            completion_idle: cfg.completion_idle,
            pending: HashMap::new(),
            by_watcher: HashMap::new(),
            next_token: 0,
            periodic_timespecs: HashMap::new(),
            send_buf: None,
            send_token: None,
        })
    }

    fn destroy(&mut self) {
        self.pending.clear();
        self.by_watcher.clear();
        self.periodic_timespecs.clear();
    }

    fn fork(&mut self) -> Result<(), ReactorError> {
        self.pending.clear();
        self.by_watcher.clear();
        self.periodic_timespecs.clear();
        self.ring = Self::build_ring(self.sq_depth, self.cq_depth).map_err(ReactorError::Fork)?;
        Ok(())
    }

    fn run(&mut self, running: &AtomicBool, watchers: &mut WatcherTable) -> Result<(), ReactorError> {
        while running.load(Ordering::SeqCst) {
            dispatch_raised_signals(watchers);

            let overflow = self.ring.completion().overflow();
            if overflow > 0 {
                error!(overflow, "completion queue overflowed, treating as fatal");
                return Err(ReactorError::RingOverflow(overflow));
            }

            self.ring
                .submit_and_wait_timeout(1, self.completion_idle)
                .or_else(|err| {
                    if err.kind() == std::io::ErrorKind::TimedOut {
                        Ok(0)
                    } else {
                        Err(ReactorError::Wait(err))
                    }
                })?;

            let completed: Vec<(u64, i32, u32)> = self
                .ring
                .completion()
                .map(|cqe| (cqe.user_data(), cqe.result(), cqe.flags()))
                .collect();

            for (token, result, flags) in completed {
                self.handle_completion(token, result, flags, watchers)?;
            }
        }
        Ok(())
    }

    fn io_start(&mut self, id: WatcherId, watcher: &Watcher) -> Result<(), ReactorError> {
        match watcher {
            Watcher::Main(w) => self.submit_accept(id, w.listen_fd),
            Watcher::Worker(w) => self.submit_read(id, w.rcv_fd),
            Watcher::Periodic(_) | Watcher::Signal(_) => Ok(()),
        }
    }

    fn io_stop(&mut self, id: WatcherId, _watcher: &Watcher) -> Result<(), ReactorError> {
        self.cancel_watcher(id)
    }

    fn periodic_start(&mut self, id: WatcherId, interval: Duration) -> Result<(), ReactorError> {
        self.submit_periodic(id, interval)
    }

    fn periodic_stop(&mut self, id: WatcherId) -> Result<(), ReactorError> {
        self.cancel_watcher(id)
    }

    fn prep_submit_send(&mut self, fd: RawFd, msg: &[u8]) -> Result<usize, ReactorError> {
        let buf = msg.to_vec().into_boxed_slice();
        let token = self.next_token;
        self.next_token += 1;

        let entry = opcode::Send::new(types::Fd(fd), buf.as_ptr(), buf.len() as u32)
            .build()
            .user_data(token);
        self.pending.insert(token, Pending { id: WatcherId(usize::MAX), op: PendingOp::Send });
        self.send_token = Some(token);

        // SAFETY: `buf` is kept alive in `self.send_buf` until `wait_recv`
        // reaps this token's completion.
        unsafe {
            self.ring
                .submission()
                .push(&entry)
                .map_err(|_| ReactorError::WatcherRegister(std::io::Error::other("submission queue full")))?;
        }
        self.send_buf = Some(buf);
        self.ring.submit().map_err(ReactorError::Wait)?;
        Ok(msg.len())
    }

    fn wait_recv(&mut self) -> Result<(), ReactorError> {
        let Some(token) = self.send_token else {
            return Ok(());
        };
        loop {
            let found = self
                .ring
                .completion()
                .map(|cqe| (cqe.user_data(), cqe.result()))
                .find(|&(t, _)| t == token);
            if let Some((_, result)) = found {
                self.send_token = None;
                self.send_buf = None;
                self.pending.remove(&token);
                if result < 0 {
                    return Err(ReactorError::Wait(std::io::Error::from_raw_os_error(-result)));
                }
                return Ok(());
            }
            self.ring.submit_and_wait(1).map_err(ReactorError::Wait)?;
        }
    }
}
