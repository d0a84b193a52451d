// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Structured reporting: a console summary plus a panic hook that appends
//! an OS/kernel banner and a backtrace to a fixed log file, so a crash
//! during a CI run leaves a trail even when the terminal output is lost.

use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use tracing::error;

use crate::{Outcome, TestResult};

/// Fixed so CI log collection doesn't need to discover a per-run path.
pub fn default_log_path() -> PathBuf {
    PathBuf::from("/tmp/connpool-test/log/connpool-test.log")
}

/// A one-line count summary: `N passed, N failed, N skipped`.
pub struct Summary {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl Summary {
    pub fn from_results(results: &[TestResult]) -> Self {
        let mut s = Summary {
            passed: 0,
            failed: 0,
            skipped: 0,
        };
        for r in results {
            match &r.outcome {
                Outcome::Passed => s.passed += 1,
                Outcome::Failed(_) => s.failed += 1,
                Outcome::Skipped(_) => s.skipped += 1,
            }
        }
        s
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

/// Renders one result line: `PASS  module::name  (12ms)` or similar for the
/// other outcomes, plus the failure/skip message on the following line.
pub fn render_result(r: &TestResult) -> String {
    let mut out = String::new();
    let tag = match &r.outcome {
        Outcome::Passed => "PASS",
        Outcome::Failed(_) => "FAIL",
        Outcome::Skipped(_) => "SKIP",
    };
    let _ = write!(
        out,
        "{tag:<4} {}::{} ({} us) [{}:{}]",
        r.module,
        r.name,
        r.elapsed.as_micros(),
        r.file,
        r.line
    );
    match &r.outcome {
        Outcome::Failed(msg) | Outcome::Skipped(msg) => {
            let _ = write!(out, "\n      {msg}");
        }
        Outcome::Passed => {}
    }
    out
}

/// Installs a panic hook that appends a one-time OS/kernel banner plus a
/// backtrace to `log_path` on the first panic observed, in addition to
/// running the previously installed hook (so `catch_unwind`-based test
/// failures still print normally).
pub fn install_panic_hook(log_path: impl AsRef<Path>) {
    let log_path = log_path.as_ref().to_path_buf();
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        if let Err(err) = log_panic(&log_path, info) {
            error!(%err, "failed to write panic banner to the test log");
        }
        previous(info);
    }));
}

fn log_panic(log_path: &Path, info: &std::panic::PanicInfo<'_>) -> std::io::Result<()> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(log_path)?;
    writeln!(file, "---- panic ----")?;
    writeln!(file, "{}", os_banner())?;
    writeln!(file, "{info}")?;
    writeln!(file, "{:?}", backtrace::Backtrace::new())?;
    Ok(())
}

/// A single-line `sysname release machine` banner, read via `uname(2)`.
fn os_banner() -> String {
    // SAFETY: `utsname` is a plain C struct of fixed-size char arrays;
    // `uname` only ever writes into it, never reads uninitialized fields
    // before writing them.
    let uts: libc::utsname = unsafe {
        let mut uts = std::mem::zeroed();
        if libc::uname(&mut uts) != 0 {
            return "unknown OS".to_string();
        }
        uts
    };
    format!(
        "{} {} {}",
        cstr_field(&uts.sysname),
        cstr_field(&uts.release),
        cstr_field(&uts.machine)
    )
}

fn cstr_field(field: &[libc::c_char]) -> String {
    let bytes: Vec<u8> = field
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;
