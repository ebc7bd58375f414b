//! Suite-level behavior: failure isolation, lifecycle event ordering,
//! dependency handling and the stop flag.

mod common;

use serde_json::json;

use rehearse::{Scenario, Suite, SuiteRunner, TestCase};

use self::common::{collector, registry, suite_config};

fn passing(name: &str) -> TestCase {
    let mut scenario = Scenario::new();
    scenario.then("see_dashboard", vec![]);
    TestCase::new(name, scenario)
}

fn failing(name: &str) -> TestCase {
    let mut scenario = Scenario::new();
    scenario.then("check_foo", vec![]);
    TestCase::new(name, scenario)
}

#[test]
fn failure_in_one_test_does_not_stop_the_next() {
    common::init_tracing();
    // P3: t1 fails, t2 still runs to completion.
    let config = suite_config(
        &["acting"],
        json!({"acting": {"fail_on": "check_foo"}}),
    );
    let mut suite = Suite::new(config)
        .with_test(failing("t1"))
        .with_test(passing("t2"));

    let (handler, log) = collector();
    let mut runner = SuiteRunner::new(registry());
    runner.subscribe(Box::new(handler));
    let stats = runner.run(&mut suite).unwrap();

    assert_eq!(stats.failed, 1);
    assert_eq!(stats.passed, 1);
    assert!(!stats.was_successful());

    let log = log.borrow();
    assert!(log.iter().any(|l| l == "test.fail t1"));
    assert!(log.iter().any(|l| l == "test.success t2"));
}

#[test]
fn lifecycle_events_fire_in_order() {
    let config = suite_config(&["acting"], json!({}));
    let mut suite = Suite::new(config).with_test(passing("only"));

    let (handler, log) = collector();
    let mut runner = SuiteRunner::new(registry());
    runner.subscribe(Box::new(handler));
    let _ = runner.run(&mut suite).unwrap();

    assert_eq!(
        *log.borrow(),
        [
            "suite.init",
            "suite.before",
            "test.before only",
            "test.start only",
            "step.before see_dashboard",
            "step.after see_dashboard",
            "test.end only",
            "test.success only",
            "test.after only",
            "suite.after",
        ],
    );
}

#[test]
fn unresolved_action_fails_without_step_events() {
    let config = suite_config(&["acting"], json!({}));
    let mut scenario = Scenario::new();
    scenario.when("teleport", vec![]);
    let mut suite =
        Suite::new(config).with_test(TestCase::new("warp", scenario));

    let (handler, log) = collector();
    let mut runner = SuiteRunner::new(registry());
    runner.subscribe(Box::new(handler));
    let stats = runner.run(&mut suite).unwrap();

    // Recorded as a failure (not an error), with a distinct message.
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.errored, 0);
    let log = log.borrow();
    assert!(log.iter().all(|l| !l.starts_with("step.")));
    assert!(log.iter().any(|l| l == "test.fail warp"));
}

#[test]
fn unexpected_errors_land_in_the_error_bucket() {
    let config = suite_config(
        &["acting"],
        json!({"acting": {"error_on": "check_foo"}}),
    );
    let mut suite = Suite::new(config).with_test(failing("boom"));

    let stats = SuiteRunner::new(registry()).run(&mut suite).unwrap();

    assert_eq!(stats.errored, 1);
    assert_eq!(stats.failed, 0);
}

#[test]
fn panics_in_module_code_land_in_the_error_bucket() {
    let config = suite_config(
        &["acting"],
        json!({"acting": {"panic_on": "check_foo"}}),
    );
    let mut suite = Suite::new(config)
        .with_test(failing("panicking"))
        .with_test(passing("survivor"));

    let stats = SuiteRunner::new(registry()).run(&mut suite).unwrap();

    assert_eq!(stats.errored, 1);
    assert_eq!(stats.passed, 1, "the suite survives a panicking module");
}

#[test]
fn fail_fast_skips_the_remaining_tests() {
    let config = suite_config(
        &["acting"],
        json!({"acting": {"fail_on": "check_foo"}}),
    );
    let mut suite = Suite::new(config)
        .with_test(failing("t1"))
        .with_test(passing("t2"))
        .with_test(passing("t3"));

    let (handler, log) = collector();
    let mut runner = SuiteRunner::new(registry()).fail_fast(true);
    runner.subscribe(Box::new(handler));
    let stats = runner.run(&mut suite).unwrap();

    assert_eq!(stats.failed, 1);
    assert_eq!(stats.skipped, 2);
    assert_eq!(stats.passed, 0);
    assert!(stats.should_stop());
    assert!(log.borrow().iter().any(|l| l == "test.skipped t2"));
}

#[test]
fn dependencies_reorder_execution() {
    let config = suite_config(&["acting"], json!({}));
    let mut suite = Suite::new(config)
        .with_test(passing("second").depends_on("first"))
        .with_test(passing("first"));

    let (handler, log) = collector();
    let mut runner = SuiteRunner::new(registry());
    runner.subscribe(Box::new(handler));
    let stats = runner.run(&mut suite).unwrap();

    assert_eq!(stats.passed, 2);
    let starts: Vec<_> = log
        .borrow()
        .iter()
        .filter(|l| l.starts_with("test.start"))
        .cloned()
        .collect();
    assert_eq!(starts, ["test.start first", "test.start second"]);
}

#[test]
fn missing_dependency_skips_instead_of_failing() {
    let config = suite_config(&["acting"], json!({}));
    let mut suite = Suite::new(config)
        .with_test(passing("orphan").depends_on("ghost"))
        .with_test(passing("solid"));

    let stats = SuiteRunner::new(registry()).run(&mut suite).unwrap();

    assert_eq!(stats.passed, 1);
    assert_eq!(stats.skipped, 1);
    assert!(stats.was_successful(), "skips don't fail the run");
}

#[test]
fn dependents_of_skipped_tests_are_skipped() {
    let config = suite_config(&["acting"], json!({}));
    let mut suite = Suite::new(config)
        .with_test(passing("base").skipped("not today"))
        .with_test(passing("child").depends_on("base"));

    let (handler, log) = collector();
    let mut runner = SuiteRunner::new(registry());
    runner.subscribe(Box::new(handler));
    let stats = runner.run(&mut suite).unwrap();

    assert_eq!(stats.skipped, 2);
    assert_eq!(stats.passed, 0);
    assert!(log.borrow().iter().any(|l| l == "test.skipped child"));
}

#[test]
fn markers_feed_their_own_buckets() {
    let config = suite_config(&["acting"], json!({}));
    let mut suite = Suite::new(config)
        .with_test(passing("skipped").skipped("flaky on CI"))
        .with_test(passing("pending").incomplete("awaiting fixture"))
        .with_test(passing("solid"));

    let stats = SuiteRunner::new(registry()).run(&mut suite).unwrap();

    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.incomplete, 1);
    assert_eq!(stats.passed, 1);
}

#[test]
fn before_hook_error_records_the_test_as_errored() {
    let config = suite_config(
        &["acting"],
        json!({"acting": {"fail_before": true}}),
    );
    let mut suite = Suite::new(config).with_test(passing("hooked"));

    let (handler, log) = collector();
    let mut runner = SuiteRunner::new(registry());
    runner.subscribe(Box::new(handler));
    let stats = runner.run(&mut suite).unwrap();

    assert_eq!(stats.errored, 1);
    let log = log.borrow();
    assert!(log.iter().any(|l| l == "test.error hooked"));
    assert!(
        log.iter().all(|l| l != "test.start hooked"),
        "steps must not run after a before-hook error",
    );
}

#[test]
fn failed_hook_errors_become_warnings_not_failures_of_their_own() {
    let config = suite_config(
        &["acting"],
        json!({"acting": {"fail_on": "check_foo", "fail_failed_hook": true}}),
    );
    let mut suite = Suite::new(config).with_test(failing("t"));

    let stats = SuiteRunner::new(registry()).run(&mut suite).unwrap();

    assert_eq!(stats.failed, 1);
    assert_eq!(stats.warnings, 1);
}

#[test]
fn after_hook_error_escalates_a_passing_test() {
    let config = suite_config(
        &["acting"],
        json!({"acting": {"fail_after": true}}),
    );
    let mut suite = Suite::new(config).with_test(passing("t"));

    let stats = SuiteRunner::new(registry()).run(&mut suite).unwrap();

    assert_eq!(stats.passed, 0);
    assert_eq!(stats.errored, 1);
}

#[test]
fn before_suite_error_aborts_the_run() {
    let config = suite_config(
        &["acting"],
        json!({"acting": {"fail_before_suite": true}}),
    );
    let mut suite = Suite::new(config).with_test(passing("never"));

    let err = SuiteRunner::new(registry()).run(&mut suite).unwrap_err();

    assert!(err.to_string().contains("before_suite"));
}

#[test]
fn filter_restricts_the_run_by_substring() {
    let config = suite_config(&["acting"], json!({}));
    let mut suite = Suite::new(config)
        .with_test(passing("login_works"))
        .with_test(passing("signup_works"));

    let stats = SuiteRunner::new(registry())
        .filter("login")
        .run(&mut suite)
        .unwrap();

    assert_eq!(stats.passed, 1);
    assert_eq!(stats.total(), 1);
}
