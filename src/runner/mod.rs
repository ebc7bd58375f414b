// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! [`SuiteRunner`]: orchestrates one suite run through the
//! `Init → BeforeSuite → {BeforeTest → RunSteps → AfterTest}* → AfterSuite`
//! state machine.

pub mod dispatcher;

use std::collections::{HashMap, HashSet};

use crate::{
    cli,
    error::{ConfigError, Error},
    event::{self, EventBus, EventHandler, SkipReason, Source},
    module::{Failure, ModuleContainer, Registry},
    result::RunStats,
    suite::{Suite, TestCase},
};

pub use self::dispatcher::{DispatchError, Dispatcher};

/// One planned slot of a suite run.
enum Planned {
    /// Run the test at this index.
    Run(usize),

    /// Skip the test at this index for the given reason.
    Skip(usize, SkipReason),
}

/// Orchestrator of one suite run.
///
/// Holds no outcome counters itself: all counting is delegated to the
/// [`RunStats`] aggregator created per run. The [`Registry`], the
/// [`ModuleContainer`] and the [`EventBus`] are all run-scoped and passed
/// explicitly, so multiple suites can run in one process.
#[derive(Debug)]
pub struct SuiteRunner {
    /// Module registry to build the container from.
    registry: Registry,

    /// Event bus the run reports into.
    bus: EventBus,

    /// Whether to stop the run on the first failed or errored test.
    fail_fast: bool,

    /// Substring filter on test names; non-matching tests are not run.
    filter: Option<String>,
}

impl SuiteRunner {
    /// Creates a new [`SuiteRunner`] over the given module [`Registry`].
    #[must_use]
    pub fn new(registry: Registry) -> Self {
        Self { registry, bus: EventBus::new(), fail_fast: false, filter: None }
    }

    /// Subscribes an [`EventHandler`] (a reporter, a log writer) to this
    /// runner's [`EventBus`].
    pub fn subscribe(&mut self, handler: Box<dyn EventHandler>) -> &mut Self {
        self.bus.subscribe(handler);
        self
    }

    /// Enables or disables stop-on-first-failure.
    #[must_use]
    pub fn fail_fast(mut self, enabled: bool) -> Self {
        self.fail_fast = enabled;
        self
    }

    /// Restricts the run to tests whose name contains `substring`.
    #[must_use]
    pub fn filter(mut self, substring: impl Into<String>) -> Self {
        self.filter = Some(substring.into());
        self
    }

    /// Applies parsed [`cli::RunnerOpts`].
    #[must_use]
    pub fn with_cli(mut self, opts: &cli::RunnerOpts) -> Self {
        self.fail_fast = opts.fail_fast;
        self.filter = opts.filter.clone();
        self
    }

    /// Runs the given [`Suite`] to completion.
    ///
    /// Scenarios are left in place after the run, retaining their executed
    /// step traces for reporting.
    ///
    /// # Errors
    ///
    /// Configuration and suite-setup errors only; test failures and errors
    /// are aggregated into the returned [`RunStats`] instead.
    pub fn run(&mut self, suite: &mut Suite) -> Result<RunStats, Error> {
        let mut stats = RunStats::new();

        self.bus.emit(event::Suite::Init);
        let mut container =
            ModuleContainer::build(&self.registry, &suite.config)?;
        let plan = plan_order(&suite.tests)?;

        container.before_suite(&suite.config).map_err(Error::Module)?;
        self.bus.emit(event::Suite::Started);

        let mut ran: HashSet<String> = HashSet::new();
        for planned in plan {
            match planned {
                Planned::Skip(idx, reason) => {
                    let meta = Source::new(suite.tests[idx].meta());
                    stats.skipped += 1;
                    self.bus
                        .emit_test(&meta, event::Test::Skipped(reason));
                }
                Planned::Run(idx) => {
                    let test = &mut suite.tests[idx];
                    if let Some(filter) = &self.filter {
                        if !test.name.contains(filter.as_str()) {
                            continue;
                        }
                    }
                    self.run_test(test, &mut container, &mut stats, &ran);
                    ran.insert(test.name.clone());
                }
            }
        }

        container.after_suite().map_err(Error::Module)?;
        self.bus.emit(event::Suite::Finished);

        tracing::debug!(
            passed = stats.passed,
            failed = stats.failed,
            errored = stats.errored,
            skipped = stats.skipped,
            "suite finished",
        );
        Ok(stats)
    }

    /// Runs one test through its lifecycle, recording the outcome.
    ///
    /// A failure or error here never prevents the next test from starting:
    /// everything is caught and aggregated at this boundary.
    fn run_test(
        &mut self,
        test: &mut TestCase,
        container: &mut ModuleContainer,
        stats: &mut RunStats,
        ran: &HashSet<String>,
    ) {
        let meta = Source::new(test.meta());

        if stats.should_stop() {
            stats.skipped += 1;
            self.bus.emit_test(
                &meta,
                event::Test::Skipped(SkipReason::StoppedOnFailure),
            );
            return;
        }
        if let Some(reason) = &test.skip {
            stats.skipped += 1;
            self.bus.emit_test(
                &meta,
                event::Test::Skipped(SkipReason::Marked(reason.clone())),
            );
            return;
        }
        if let Some(reason) = &test.incomplete {
            stats.incomplete += 1;
            self.bus
                .emit_test(&meta, event::Test::Incomplete(reason.clone()));
            return;
        }
        if let Some(missing) =
            test.depends_on.iter().find(|dep| !ran.contains(*dep))
        {
            stats.skipped += 1;
            self.bus.emit_test(
                &meta,
                event::Test::Skipped(SkipReason::DependencyNotRun {
                    dependency: missing.clone(),
                }),
            );
            return;
        }

        self.bus.emit_test(&meta, event::Test::Started);

        if let Err(e) = container.start_test(&meta) {
            stats.errored += 1;
            self.bus.emit_test(&meta, event::Test::Errored(e.to_string()));
            if let Err(after) = container.end_test(&meta) {
                tracing::warn!(error = %after, "after-hook error ignored");
                stats.warnings += 1;
            }
            self.bus.emit_test(&meta, event::Test::Finished);
            if self.fail_fast {
                stats.request_stop();
            }
            return;
        }

        self.bus.emit_test(&meta, event::Test::Running);
        let mut dispatcher =
            Dispatcher::new(container, &mut self.bus, meta.clone());
        let result = test.scenario.run(|step| dispatcher.run_step(step));
        let assertions = dispatcher.assertions();
        drop(dispatcher);
        stats.assertions += assertions;
        self.bus.emit_test(&meta, event::Test::Ended);

        match result {
            Ok(()) => match container.end_test(&meta) {
                Ok(()) => {
                    stats.passed += 1;
                    if assertions == 0 {
                        stats.useless += 1;
                    }
                    self.bus.emit_test(&meta, event::Test::Passed);
                }
                Err(e) => {
                    stats.errored += 1;
                    self.bus
                        .emit_test(&meta, event::Test::Errored(e.to_string()));
                    if self.fail_fast {
                        stats.request_stop();
                    }
                }
            },
            Err(e) => {
                let action_error = e.to_action_error();
                stats.warnings +=
                    container.notify_failed(&meta, &action_error);
                if let Err(after) = container.end_test(&meta) {
                    // Logged, not escalated: the original failure wins.
                    tracing::warn!(error = %after, "after-hook error ignored");
                    stats.warnings += 1;
                }
                match e {
                    DispatchError::ActionNotDefined { action } => {
                        stats.failed += 1;
                        self.bus.emit_test(
                            &meta,
                            event::Test::Failed(Failure::new(format!(
                                "action \"{action}\" is not defined",
                            ))),
                        );
                    }
                    DispatchError::Failed(failure) => {
                        stats.failed += 1;
                        self.bus
                            .emit_test(&meta, event::Test::Failed(failure));
                    }
                    DispatchError::Errored(err) => {
                        stats.errored += 1;
                        self.bus.emit_test(
                            &meta,
                            event::Test::Errored(err.to_string()),
                        );
                    }
                }
                if self.fail_fast {
                    stats.request_stop();
                }
            }
        }

        self.bus.emit_test(&meta, event::Test::Finished);
    }
}

/// Plans the execution order of the suite's tests.
///
/// Tests run in loader enumeration order unless dependencies reorder them: a
/// topological pass moves every test after its declared dependencies.
/// Missing dependencies and dependency cycles mark the affected tests
/// skipped rather than raising a hard error; those slots are appended after
/// the runnable plan, in their original relative order.
fn plan_order(tests: &[TestCase]) -> Result<Vec<Planned>, Error> {
    let mut index_of: HashMap<&str, usize> = HashMap::new();
    for (idx, test) in tests.iter().enumerate() {
        if index_of.insert(test.name.as_str(), idx).is_some() {
            return Err(ConfigError::DuplicateTest {
                test: test.name.clone(),
            }
            .into());
        }
    }

    let mut skipped: Vec<Planned> = Vec::new();
    let mut missing: HashSet<usize> = HashSet::new();
    for (idx, test) in tests.iter().enumerate() {
        if let Some(dep) =
            test.depends_on.iter().find(|d| !index_of.contains_key(d.as_str()))
        {
            missing.insert(idx);
            skipped.push(Planned::Skip(
                idx,
                SkipReason::MissingDependency { dependency: dep.clone() },
            ));
        }
    }

    // Kahn's algorithm, scanning in original order so that independent
    // tests keep their loader enumeration order.
    let mut emitted: HashSet<usize> = missing.clone();
    let mut plan: Vec<Planned> = Vec::new();
    loop {
        let next = tests.iter().enumerate().position(|(idx, test)| {
            !emitted.contains(&idx)
                && !missing.contains(&idx)
                && test
                    .depends_on
                    .iter()
                    .all(|dep| emitted.contains(&index_of[dep.as_str()]))
        });
        match next {
            Some(idx) => {
                emitted.insert(idx);
                plan.push(Planned::Run(idx));
            }
            None => break,
        }
    }

    // Whatever is left sits on a dependency cycle (or depends on one).
    for (idx, test) in tests.iter().enumerate() {
        if !emitted.contains(&idx) {
            skipped.push(Planned::Skip(
                idx,
                SkipReason::CyclicDependency { test: test.name.clone() },
            ));
        }
    }

    plan.extend(skipped);
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use crate::{
        event::SkipReason, scenario::Scenario, suite::TestCase,
    };

    use super::{plan_order, Planned};

    fn test(name: &str, deps: &[&str]) -> TestCase {
        let mut t = TestCase::new(name, Scenario::new());
        for dep in deps {
            t = t.depends_on(*dep);
        }
        t
    }

    fn names(plan: &[Planned], tests: &[TestCase]) -> Vec<String> {
        plan.iter()
            .map(|p| match p {
                Planned::Run(i) => tests[*i].name.clone(),
                Planned::Skip(i, _) => format!("skip:{}", tests[*i].name),
            })
            .collect()
    }

    #[test]
    fn dependencies_run_before_dependents() {
        let tests =
            vec![test("b", &["a"]), test("a", &[]), test("c", &["b"])];

        let plan = plan_order(&tests).unwrap();

        assert_eq!(names(&plan, &tests), ["a", "b", "c"]);
    }

    #[test]
    fn independent_tests_keep_loader_order() {
        let tests = vec![test("t1", &[]), test("t2", &[]), test("t3", &[])];

        let plan = plan_order(&tests).unwrap();

        assert_eq!(names(&plan, &tests), ["t1", "t2", "t3"]);
    }

    #[test]
    fn missing_dependency_skips_the_dependent() {
        let tests = vec![test("a", &["ghost"]), test("b", &[])];

        let plan = plan_order(&tests).unwrap();

        assert_eq!(names(&plan, &tests), ["b", "skip:a"]);
        assert!(matches!(
            &plan[1],
            Planned::Skip(_, SkipReason::MissingDependency { dependency })
                if dependency == "ghost"
        ));
    }

    #[test]
    fn cycle_members_are_skipped_not_fatal() {
        let tests =
            vec![test("a", &["b"]), test("b", &["a"]), test("c", &[])];

        let plan = plan_order(&tests).unwrap();

        assert_eq!(names(&plan, &tests), ["c", "skip:a", "skip:b"]);
    }

    #[test]
    fn duplicate_test_names_are_rejected() {
        let tests = vec![test("a", &[]), test("a", &[])];

        assert!(plan_order(&tests).is_err());
    }
}
