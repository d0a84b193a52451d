// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the core data structures.

use thiserror::Error;

/// Errors produced by the ART, deque, and value layers.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("tree pointer was null")]
    NullTree,
    #[error("key was null or empty")]
    NullKey,
    #[error("value tag must not be None")]
    NoneTag,
    #[error("allocation failed")]
    AllocationFailed,
}
