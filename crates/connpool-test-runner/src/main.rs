// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI driver for the self-registering test harness in `connpool-testkit`.
//!
//! The positional `project_dir`/`user`/`database` arguments mirror the
//! original test runner's invocation shape; this crate's tests run entirely
//! in-process against library APIs, so the arguments are accepted for
//! compatibility with existing invocations but otherwise unused.

mod cases;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use connpool_testkit::report::{default_log_path, install_panic_hook, render_result, Summary};
use connpool_testkit::{run_tests, TestFilter};

#[derive(Parser)]
#[command(name = "connpool-test-runner", about = "Run the connpool test suite")]
struct Cli {
    /// Root directory of the project under test (accepted for invocation
    /// compatibility; this runner exercises in-process APIs only).
    project_dir: PathBuf,
    /// Database user (unused; see `project_dir`).
    user: String,
    /// Database name (unused; see `project_dir`).
    database: String,

    /// Run only the named test.
    #[arg(short = 't', long, conflicts_with = "module")]
    test: Option<String>,

    /// Run only tests registered under the named module.
    #[arg(short = 'm', long, conflicts_with = "test")]
    module: Option<String>,
}

impl Cli {
    fn filter(&self) -> TestFilter {
        match (&self.test, &self.module) {
            (Some(name), None) => TestFilter::ByTest(name.clone()),
            (None, Some(module)) => TestFilter::ByModule(module.clone()),
            _ => TestFilter::All,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();
    install_panic_hook(default_log_path());

    let cli = Cli::parse();
    let results = run_tests(&cli.filter());

    for result in &results {
        println!("{}", render_result(result));
    }
    let summary = Summary::from_results(&results);
    println!(
        "{} passed, {} failed, {} skipped",
        summary.passed, summary.failed, summary.skipped
    );

    if summary.all_passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
