// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Black-box tests against the `connpool-test-runner` binary.

use assert_cmd::Command;
use serial_test::serial;

fn runner() -> Command {
    Command::cargo_bin("connpool-test-runner").expect("binary should build")
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.output().expect("runner should spawn");
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr_of(cmd: &mut Command) -> String {
    let output = cmd.output().expect("runner should spawn");
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
#[serial]
fn full_run_exits_zero_and_reports_a_summary_line() {
    let mut cmd = runner();
    cmd.args(["/tmp", "postgres", "connpool"]);
    let stdout = stdout_of(&mut cmd);
    assert!(stdout.contains("passed,"), "stdout was:\n{stdout}");
    runner().args(["/tmp", "postgres", "connpool"]).assert().success();
}

#[test]
#[serial]
fn unknown_test_name_runs_nothing_but_still_exits_zero() {
    let mut cmd = runner();
    cmd.args(["/tmp", "postgres", "connpool", "-t", "no_such_test"]);
    let stdout = stdout_of(&mut cmd);
    assert!(
        stdout.contains("0 passed, 0 failed, 0 skipped"),
        "stdout was:\n{stdout}"
    );
    runner()
        .args(["/tmp", "postgres", "connpool", "-t", "no_such_test"])
        .assert()
        .success();
}

#[test]
#[serial]
fn module_filter_selects_only_matching_cases() {
    let mut cmd = runner();
    cmd.args(["/tmp", "postgres", "connpool", "-m", "art"]);
    let stdout = stdout_of(&mut cmd);
    assert!(stdout.contains("art::"), "stdout was:\n{stdout}");
    assert!(!stdout.contains("deque::"), "stdout was:\n{stdout}");
}

#[test]
#[serial]
fn test_and_module_flags_are_mutually_exclusive() {
    let mut cmd = runner();
    cmd.args([
        "/tmp",
        "postgres",
        "connpool",
        "-t",
        "art_seven_typed_entries",
        "-m",
        "art",
    ]);
    let stderr = stderr_of(&mut cmd);
    assert!(stderr.contains("cannot be used with"), "stderr was:\n{stderr}");
    runner()
        .args([
            "/tmp",
            "postgres",
            "connpool",
            "-t",
            "art_seven_typed_entries",
            "-m",
            "art",
        ])
        .assert()
        .failure();
}

#[test]
#[serial]
fn missing_positional_arguments_print_usage_and_fail() {
    runner().assert().failure();
}

#[test]
#[serial]
fn help_flag_documents_the_filter_options() {
    let mut cmd = runner();
    cmd.arg("-h");
    let stdout = stdout_of(&mut cmd);
    assert!(stdout.contains("-t"), "stdout was:\n{stdout}");
    assert!(stdout.contains("-m"), "stdout was:\n{stdout}");
    runner().arg("-h").assert().success();
}
