// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! [`Scenario`]: an append-only, ordered collection of [`Step`]s belonging to
//! one test, plus a human-readable feature description.

use std::rc::Rc;

use serde_json::Value;

use crate::{
    event::Source,
    module::{ActionError, ModuleContainer},
    step::{Step, StepKind},
};

/// Ordered, append-only collection of [`Step`]s plus a human-readable
/// `feature` description.
///
/// Steps are appended during the load phase via the builder methods
/// ([`given()`], [`when()`], [`then()`], [`comment()`], [`execute()`]) and
/// consumed once during the run phase. After a run the [`Scenario`] is
/// retained read-only: [`executed_steps()`] exposes the trace of dispatched
/// steps for reporting.
///
/// [`comment()`]: Scenario::comment()
/// [`execute()`]: Scenario::execute()
/// [`executed_steps()`]: Scenario::executed_steps()
/// [`given()`]: Scenario::given()
/// [`then()`]: Scenario::then()
/// [`when()`]: Scenario::when()
#[derive(Clone, Debug, Default)]
pub struct Scenario {
    /// Human-readable feature description, lazily set.
    feature: Option<String>,

    /// Appended [`Step`]s, in execution order.
    steps: Vec<Source<Step>>,

    /// Index of the currently (or last) executed [`Step`], for error
    /// reporting.
    cursor: Option<usize>,
}

impl Scenario {
    /// Creates a new empty [`Scenario`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the human-readable feature description.
    ///
    /// Should not be changed once the [`Scenario`] started running (not
    /// enforced).
    pub fn set_feature(&mut self, feature: impl Into<String>) -> &mut Self {
        self.feature = Some(feature.into());
        self
    }

    /// Human-readable feature description, if set.
    #[must_use]
    pub fn feature(&self) -> Option<&str> {
        self.feature.as_deref()
    }

    /// Appends a [`StepKind::Condition`] step (a precondition).
    pub fn given(
        &mut self,
        action: impl Into<String>,
        args: Vec<Value>,
    ) -> &mut Self {
        self.push(Step::new(StepKind::Condition, action, args))
    }

    /// Appends a [`StepKind::Action`] step.
    pub fn when(
        &mut self,
        action: impl Into<String>,
        args: Vec<Value>,
    ) -> &mut Self {
        self.push(Step::new(StepKind::Action, action, args))
    }

    /// Appends a [`StepKind::Assertion`] step.
    pub fn then(
        &mut self,
        action: impl Into<String>,
        args: Vec<Value>,
    ) -> &mut Self {
        self.push(Step::new(StepKind::Assertion, action, args))
    }

    /// Appends a [`StepKind::Comment`] step.
    ///
    /// Comment steps are dispatched to a log-only handler and never reach the
    /// action index.
    pub fn comment(&mut self, text: impl Into<String>) -> &mut Self {
        self.push(Step::comment(text))
    }

    /// Appends a [`StepKind::Executor`] step running the given callback
    /// directly against the suite's [`ModuleContainer`].
    pub fn execute<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&mut ModuleContainer) -> Result<Value, ActionError> + 'static,
    {
        self.push(Step::executor(Rc::new(f)))
    }

    /// Appends the given [`Step`] as-is.
    pub fn push(&mut self, step: Step) -> &mut Self {
        self.steps.push(Source::new(step));
        self
    }

    /// All appended [`Step`]s, in execution order.
    #[must_use]
    pub fn steps(&self) -> &[Source<Step>] {
        &self.steps
    }

    /// Index of the currently (or last) executed [`Step`], if the
    /// [`Scenario`] has started running.
    #[must_use]
    pub const fn current_step_index(&self) -> Option<usize> {
        self.cursor
    }

    /// Trace of [`Step`]s dispatched so far: everything up to and including
    /// the current cursor position.
    #[must_use]
    pub fn executed_steps(&self) -> &[Source<Step>] {
        self.cursor.map_or(&[], |i| &self.steps[..=i])
    }

    /// Runs this [`Scenario`] by feeding every [`Step`] to the given
    /// `run_step` callback, in insertion order.
    ///
    /// Execution is fail-fast within the scenario: the first `Err` returned
    /// by `run_step` is propagated immediately and the remaining steps are
    /// never dispatched. Failure isolation across tests is the suite
    /// runner's concern, not this method's.
    ///
    /// # Errors
    ///
    /// Propagates the first error returned by `run_step`.
    pub fn run<F, E>(&mut self, mut run_step: F) -> Result<(), E>
    where
        F: FnMut(&Source<Step>) -> Result<(), E>,
    {
        for i in 0..self.steps.len() {
            self.cursor = Some(i);
            let step = self.steps[i].clone();
            run_step(&step)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{Scenario, StepKind};

    fn sample() -> Scenario {
        let mut scenario = Scenario::new();
        scenario
            .set_feature("log in as alice")
            .given("have_user", vec![json!("alice")])
            .when("login", vec![json!("alice"), json!("secret")])
            .then("see_dashboard", vec![]);
        scenario
    }

    #[test]
    fn builder_methods_classify_steps() {
        let scenario = sample();
        let kinds: Vec<_> =
            scenario.steps().iter().map(|s| s.kind()).collect();

        assert_eq!(
            kinds,
            [StepKind::Condition, StepKind::Action, StepKind::Assertion],
        );
    }

    #[test]
    fn run_preserves_insertion_order() {
        let mut scenario = sample();
        let mut seen = Vec::new();

        scenario
            .run(|step| {
                seen.push(step.action().to_owned());
                Ok::<_, ()>(())
            })
            .unwrap();

        assert_eq!(seen, ["have_user", "login", "see_dashboard"]);
    }

    #[test]
    fn run_stops_at_first_error() {
        let mut scenario = sample();
        let mut dispatched = 0;

        let res = scenario.run(|step| {
            dispatched += 1;
            if step.action() == "login" {
                Err("login blew up")
            } else {
                Ok(())
            }
        });

        assert_eq!(res, Err("login blew up"));
        assert_eq!(dispatched, 2);
        assert_eq!(scenario.current_step_index(), Some(1));
        assert_eq!(scenario.executed_steps().len(), 2);
    }

    #[test]
    fn feature_survives_a_run() {
        let mut scenario = sample();
        let _ = scenario.run(|_| Err(()));

        assert_eq!(scenario.feature(), Some("log in as alice"));
    }
}
