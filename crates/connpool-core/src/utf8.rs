// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Strict UTF-8 validation for the authentication path.
//!
//! This rejects anything Rust's own `str::from_utf8` would also reject, but
//! exists as its own pass so that callers validating untrusted credential
//! bytes get a validator that never logs or echoes the bytes it rejects —
//! only a byte offset, and only under the caller-supplied `context` label,
//! never the bytes themselves. Ill-formed input is rejected outright;
//! nothing here attempts to repair or substitute it.

use std::fmt;

use tracing::{debug, warn};

/// The offset of the first byte that made the input invalid. The byte value
/// itself is deliberately not carried on this type — this is most often run
/// over password bytes, and a `Debug`/`Display` impl that is safe to log
/// anywhere must never include them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Utf8Error {
    pub offset: usize,
}

impl fmt::Display for Utf8Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid UTF-8 at byte offset {}", self.offset)
    }
}

impl std::error::Error for Utf8Error {}

/// The length in bytes of the encoded code point starting with `lead`, or
/// `None` if `lead` cannot start a well-formed sequence.
pub fn char_length(lead: u8) -> Option<usize> {
    match lead {
        0x00..=0x7f => Some(1),
        0xc2..=0xdf => Some(2),
        0xe0..=0xef => Some(3),
        0xf0..=0xf4 => Some(4),
        _ => None,
    }
}

fn is_continuation(b: u8) -> bool {
    (b & 0xc0) == 0x80
}

/// Strictly validate `bytes` as UTF-8: ASCII runs take a byte-at-a-time fast
/// path; multi-byte sequences are checked against the canonical ranges that
/// exclude overlong encodings, surrogate halves, and code points above
/// `U+10FFFF`.
fn validate_bytes(bytes: &[u8]) -> Result<(), Utf8Error> {
    let mut i = 0;
    while i < bytes.len() {
        let b0 = bytes[i];
        if b0 < 0x80 {
            i += 1;
            continue;
        }
        let len = char_length(b0).ok_or(Utf8Error { offset: i })?;
        if i + len > bytes.len() {
            return Err(Utf8Error { offset: i });
        }
        match len {
            2 => {
                let b1 = bytes[i + 1];
                if !is_continuation(b1) {
                    return Err(Utf8Error { offset: i });
                }
            }
            3 => {
                let (b1, b2) = (bytes[i + 1], bytes[i + 2]);
                if !is_continuation(b2) {
                    return Err(Utf8Error { offset: i });
                }
                let valid_b1 = match b0 {
                    0xe0 => (0xa0..=0xbf).contains(&b1),
                    0xed => (0x80..=0x9f).contains(&b1), // excludes the surrogate range
                    _ => is_continuation(b1),
                };
                if !valid_b1 {
                    return Err(Utf8Error { offset: i });
                }
            }
            4 => {
                let (b1, b2, b3) = (bytes[i + 1], bytes[i + 2], bytes[i + 3]);
                if !is_continuation(b2) || !is_continuation(b3) {
                    return Err(Utf8Error { offset: i });
                }
                let valid_b1 = match b0 {
                    0xf0 => (0x90..=0xbf).contains(&b1),
                    0xf4 => (0x80..=0x8f).contains(&b1), // caps at U+10FFFF
                    _ => is_continuation(b1),
                };
                if !valid_b1 {
                    return Err(Utf8Error { offset: i });
                }
            }
            _ => unreachable!("char_length only returns 1..=4"),
        }
        i += len;
    }
    Ok(())
}

/// Validates `bytes` as strict UTF-8, logging the outcome under `context`
/// (never the bytes themselves) and returning a heap copy of the accepted
/// string on success, `None` on rejection.
pub fn validate(bytes: &[u8], context: &str) -> Option<String> {
    match validate_bytes(bytes) {
        Ok(()) => {
            debug!(context, len = bytes.len(), "utf-8 validation accepted");
            // `validate_bytes` above already confirmed `bytes` is
            // well-formed UTF-8.
            Some(String::from_utf8(bytes.to_vec()).expect("validate_bytes confirmed well-formed UTF-8"))
        }
        Err(err) => {
            warn!(context, offset = err.offset, "utf-8 validation rejected input");
            None
        }
    }
}

/// Convenience wrapper for the auth path: `true` iff `bytes` is well-formed
/// UTF-8. Does not log; prefer [`validate`] when a log trail under a
/// `context` label is wanted.
pub fn is_valid(bytes: &[u8]) -> bool {
    validate_bytes(bytes).is_ok()
}

#[cfg(test)]
#[path = "utf8_tests.rs"]
mod tests;
