//! Scenario-level behavior: step ordering, fail-fast and trace retention.

mod common;

use serde_json::json;

use rehearse::{Registry, Scenario, Suite, SuiteRunner, TestCase};

use self::common::{collector, registry, suite_config};

fn login_scenario(feature: &str) -> Scenario {
    let mut scenario = Scenario::new();
    scenario
        .set_feature(feature)
        .given("have_user", vec![json!("alice")])
        .when("login", vec![json!("alice"), json!("pw")])
        .then("see_dashboard", vec![]);
    scenario
}

#[test]
fn steps_run_in_insertion_order() {
    let config = suite_config(&["acting"], json!({}));
    let mut suite = Suite::new(config)
        .with_test(TestCase::new("login", login_scenario("user logs in")));

    let (handler, log) = collector();
    let mut runner = SuiteRunner::new(registry());
    runner.subscribe(Box::new(handler));
    let stats = runner.run(&mut suite).unwrap();

    assert!(stats.was_successful());
    assert_eq!(stats.passed, 1);
    assert_eq!(stats.assertions, 1);

    let dispatched: Vec<_> = log
        .borrow()
        .iter()
        .filter(|line| line.starts_with("step.before"))
        .cloned()
        .collect();
    assert_eq!(
        dispatched,
        [
            "step.before have_user",
            "step.before login",
            "step.before see_dashboard",
        ],
    );
}

#[test]
fn failing_assertion_stops_the_scenario() {
    // Scenario A: `see_dashboard` fails; the trace shows all three steps
    // attempted and nothing after the failing one.
    let config = suite_config(
        &["acting"],
        json!({"acting": {"fail_on": "see_dashboard"}}),
    );
    let mut scenario = login_scenario("user logs in");
    scenario.then("check_foo", vec![]);
    let mut suite =
        Suite::new(config).with_test(TestCase::new("login", scenario));

    let (handler, log) = collector();
    let mut runner = SuiteRunner::new(registry());
    runner.subscribe(Box::new(handler));
    let stats = runner.run(&mut suite).unwrap();

    assert_eq!(stats.failed, 1);
    assert_eq!(stats.passed, 0);

    let dispatched = log
        .borrow()
        .iter()
        .filter(|line| line.starts_with("step.before"))
        .count();
    assert_eq!(dispatched, 3, "check_foo must never be dispatched");

    let scenario = &suite.tests[0].scenario;
    assert_eq!(scenario.executed_steps().len(), 3);
    assert_eq!(scenario.current_step_index(), Some(2));
    assert_eq!(scenario.feature(), Some("user logs in"));
}

#[test]
fn comments_never_reach_the_action_index() {
    // No modules enabled: a comment-only scenario still passes.
    let config = suite_config(&[], json!({}));
    let mut scenario = Scenario::new();
    scenario
        .comment("only narration here")
        .comment("still nothing callable");
    let mut suite =
        Suite::new(config).with_test(TestCase::new("narration", scenario));

    let (handler, log) = collector();
    let mut runner = SuiteRunner::new(Registry::empty());
    runner.subscribe(Box::new(handler));
    let stats = runner.run(&mut suite).unwrap();

    assert_eq!(stats.passed, 1);
    // A test without assertions is flagged useless but still passes.
    assert_eq!(stats.useless, 1);
    assert_eq!(
        log.borrow()
            .iter()
            .filter(|line| line.starts_with("step."))
            .count(),
        4,
        "comments still emit before/after step events for the trace",
    );
}

#[test]
fn executor_steps_run_against_the_container() {
    let config = suite_config(&["acting"], json!({}));
    let mut scenario = Scenario::new();
    scenario.execute(|container| {
        container
            .call("check_foo", &[])
            .expect("check_foo is indexed")
    });
    scenario.then("see_dashboard", vec![]);
    let mut suite =
        Suite::new(config).with_test(TestCase::new("executor", scenario));

    let stats = SuiteRunner::new(registry()).run(&mut suite).unwrap();

    assert_eq!(stats.passed, 1);
}

#[test]
fn executor_failures_fail_the_test() {
    let config = suite_config(&["acting"], json!({}));
    let mut scenario = Scenario::new();
    scenario.execute(|_| {
        Err(rehearse::ActionError::failure("scripted executor failure"))
    });
    let mut suite =
        Suite::new(config).with_test(TestCase::new("executor", scenario));

    let stats = SuiteRunner::new(registry()).run(&mut suite).unwrap();

    assert_eq!(stats.failed, 1);
}
