// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! A minimal, self-contained unit test harness.
//!
//! Test functions register themselves at static-initialization time via
//! [`inventory`] — the Rust analogue of the constructor-hook registration a
//! C test suite gets for free from `__attribute__((constructor))` — so a
//! runner binary only has to call [`run_tests`] and never has to maintain
//! its own list of test modules.

use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

pub use inventory;

pub mod report;

/// What a registered test function returned.
#[derive(Debug, Clone)]
pub enum Outcome {
    Passed,
    Failed(String),
    /// Mirrors the source harness's dedicated skip code rather than folding
    /// skips into failures, so a skipped test doesn't sour a clean run.
    Skipped(String),
}

pub type TestFn = fn() -> Outcome;

/// A single registered test, collected via [`inventory::submit!`] through
/// the [`register_test!`] macro.
pub struct TestCase {
    pub name: &'static str,
    pub module: &'static str,
    pub file: &'static str,
    pub line: u32,
    pub func: TestFn,
}

inventory::collect!(TestCase);

/// Registers a test function under `name`/`module`. `func` must be a
/// top-level `fn() -> connpool_testkit::Outcome` (not a closure — it has to
/// be nameable as a `TestFn` value).
#[macro_export]
macro_rules! register_test {
    ($name:expr, $module:expr, $func:path) => {
        $crate::inventory::submit! {
            $crate::TestCase {
                name: $name,
                module: $module,
                file: file!(),
                line: line!(),
                func: $func,
            }
        }
    };
}

/// Which registered tests a run should include.
#[derive(Debug, Clone, Default)]
pub enum TestFilter {
    #[default]
    All,
    ByTest(String),
    ByModule(String),
}

impl TestFilter {
    fn matches(&self, tc: &TestCase) -> bool {
        match self {
            TestFilter::All => true,
            TestFilter::ByTest(name) => tc.name == name,
            TestFilter::ByModule(module) => tc.module == module,
        }
    }
}

/// The result of running one [`TestCase`].
#[derive(Debug, Clone)]
pub struct TestResult {
    pub name: &'static str,
    pub module: &'static str,
    pub file: &'static str,
    pub line: u32,
    pub outcome: Outcome,
    pub elapsed: Duration,
}

impl TestResult {
    pub fn passed(&self) -> bool {
        matches!(self.outcome, Outcome::Passed)
    }

    pub fn skipped(&self) -> bool {
        matches!(self.outcome, Outcome::Skipped(_))
    }
}

/// Runs every registered test matching `filter`, in registration order.
/// Each test runs inside [`std::panic::catch_unwind`] so that one test
/// panicking does not abort the run; a caught panic is reported as a
/// failure carrying the panic message.
pub fn run_tests(filter: &TestFilter) -> Vec<TestResult> {
    inventory::iter::<TestCase>()
        .filter(|tc| filter.matches(tc))
        .map(run_one)
        .collect()
}

fn run_one(tc: &TestCase) -> TestResult {
    let start = Instant::now();
    let outcome = match panic::catch_unwind(AssertUnwindSafe(tc.func)) {
        Ok(outcome) => outcome,
        Err(payload) => Outcome::Failed(panic_message(&payload)),
    };
    TestResult {
        name: tc.name,
        module: tc.module,
        file: tc.file,
        line: tc.line,
        outcome,
        elapsed: start.elapsed(),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "test panicked with a non-string payload".to_string()
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
