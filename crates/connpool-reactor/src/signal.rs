// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide signal watcher table.
//!
//! A signal handler may only call async-signal-safe functions. The single
//! primitive this module exposes from inside a real handler is an atomic
//! store into a flag table indexed directly by signal number — no lock, no
//! lookup, no allocation. Everything else (looking up which watcher owns a
//! signal number, invoking its callback) happens later on the loop thread,
//! once [`EventLoop::run`](crate::loop_::EventLoop::run) observes the flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use parking_lot::Mutex;

use crate::error::ReactorError;

/// One past the highest real-time signal number on Linux/BSD (`NSIG`).
const NSIG: usize = 65;

struct SignalFlags {
    raised: [AtomicBool; NSIG],
    installed: Mutex<[bool; NSIG]>,
}

static FLAGS: OnceLock<SignalFlags> = OnceLock::new();

fn flags() -> &'static SignalFlags {
    FLAGS.get_or_init(|| SignalFlags {
        raised: std::array::from_fn(|_| AtomicBool::new(false)),
        installed: Mutex::new([false; NSIG]),
    })
}

fn slot(signum: i32) -> Option<usize> {
    usize::try_from(signum).ok().filter(|&s| s < NSIG)
}

/// The async-signal-safe handler itself: one atomic store into a slot
/// addressed directly by `signum`, nothing else. Must never take a lock —
/// a lock held by the interrupted thread at the moment the signal lands
/// would deadlock the process.
extern "C" fn raise_flag(signum: libc::c_int) {
    if let Some(slot) = slot(signum) {
        flags().raised[slot].store(true, Ordering::SeqCst);
    }
}

/// Installs a handler for `signum` that only sets an atomic flag. Returns an
/// error if `signum` falls outside the supported range ([`NSIG`]).
pub fn watch(signum: i32) -> Result<(), ReactorError> {
    let slot = slot(signum)
        .ok_or_else(|| ReactorError::Signal(std::io::Error::other("signal number out of range")))?;

    {
        let mut installed = flags().installed.lock();
        if installed[slot] {
            return Ok(());
        }
        installed[slot] = true;
    }

    // SAFETY: `sigaction` with a plain extern "C" fn pointer and a
    // zero-initialized `sigaction` struct is the documented libc usage;
    // `raise_flag` only performs an atomic store, which is signal-safe.
    let rc = unsafe {
        let mut action: libc::sigaction = std::mem::zeroed();
        action.sa_sigaction = raise_flag as usize;
        libc::sigemptyset(&mut action.sa_mask);
        libc::sigaction(signum, &action, std::ptr::null_mut())
    };
    if rc != 0 {
        flags().installed.lock()[slot] = false;
        return Err(ReactorError::Signal(std::io::Error::last_os_error()));
    }
    Ok(())
}

/// Clears and returns whether `signum` was raised since the last check.
pub fn take_raised(signum: i32) -> bool {
    match slot(signum) {
        Some(slot) => flags().raised[slot].swap(false, Ordering::SeqCst),
        None => false,
    }
}

/// Every signal number that has fired since it was last drained.
pub fn drain_raised() -> Vec<i32> {
    flags()
        .raised
        .iter()
        .enumerate()
        .filter_map(|(slot, raised)| {
            raised
                .swap(false, Ordering::SeqCst)
                .then_some(slot as i32)
        })
        .collect()
}

#[cfg(test)]
#[path = "signal_tests.rs"]
mod tests;
