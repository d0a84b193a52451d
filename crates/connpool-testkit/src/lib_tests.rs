use super::*;

fn case_passes() -> Outcome {
    Outcome::Passed
}
fn case_fails() -> Outcome {
    Outcome::Failed("boom".into())
}
fn case_skips() -> Outcome {
    Outcome::Skipped("not applicable on this platform".into())
}
fn case_panics() -> Outcome {
    panic!("kaboom");
}

register_test!("lib_tests::case_passes", "harness_self_test", case_passes);
register_test!("lib_tests::case_fails", "harness_self_test", case_fails);
register_test!("lib_tests::case_skips", "harness_self_test", case_skips);
register_test!("lib_tests::case_panics", "harness_self_test", case_panics);

fn results() -> Vec<TestResult> {
    run_tests(&TestFilter::ByModule("harness_self_test".into()))
}

#[test]
fn collects_all_four_registered_outcomes() {
    let results = results();
    assert_eq!(results.len(), 4);
    assert_eq!(results.iter().filter(|r| r.passed()).count(), 1);
    assert_eq!(results.iter().filter(|r| r.skipped()).count(), 1);
    let failed = results
        .iter()
        .filter(|r| matches!(r.outcome, Outcome::Failed(_)))
        .count();
    // both the explicit failure and the panic report as Failed
    assert_eq!(failed, 2);
}

#[test]
fn a_panicking_test_does_not_abort_the_run() {
    let results = results();
    let panicked = results
        .iter()
        .find(|r| r.name == "lib_tests::case_panics")
        .expect("panicking case should still produce a result");
    match &panicked.outcome {
        Outcome::Failed(msg) => assert!(msg.contains("kaboom")),
        other => panic!("expected Failed, got {other:?}"),
    }
}

#[test]
fn by_test_filter_selects_exactly_one_case() {
    let results = run_tests(&TestFilter::ByTest("lib_tests::case_passes".into()));
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].name, "lib_tests::case_passes");
}

#[test]
fn unmatched_filter_selects_nothing() {
    let results = run_tests(&TestFilter::ByTest("no_such_test".into()));
    assert!(results.is_empty());
}
