// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Key occurrences in a lifecycle of a suite run.
//!
//! The top-level enum here is [`Suite`]. Each event enum contains variants
//! indicating what stage of execution the [`SuiteRunner`] is at, and variants
//! with detailed content about the precise sub-event.
//!
//! External consumers (console reporters, log writers) subscribe to an
//! [`EventBus`]; delivery order for one event is subscriber registration
//! order, and a subscriber must not assume any other subscriber has or hasn't
//! run first.
//!
//! [`SuiteRunner`]: crate::SuiteRunner

pub mod source;

use std::time::SystemTime;

use derive_more::{AsRef, Deref, DerefMut, Display};

use crate::{module::Failure, step::Step as ScenarioStep, suite::TestMeta};

pub use self::source::Source;

/// Arbitrary event, paired with the time it has happened at.
#[derive(AsRef, Clone, Copy, Debug, Deref, DerefMut)]
#[non_exhaustive]
pub struct Event<T: ?Sized> {
    /// [`SystemTime`] when this [`Event`] has happened.
    pub at: SystemTime,

    /// Actual value of this [`Event`].
    #[as_ref]
    #[deref]
    #[deref_mut]
    pub value: T,
}

impl<T> Event<T> {
    /// Creates a new [`Event`] out of the given `value`.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self { at: SystemTime::now(), value }
    }

    /// Unwraps the inner [`Event::value`] loosing all the attached metadata.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.value
    }
}

/// Why a test was skipped instead of being run.
#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub enum SkipReason {
    /// Test was marked as skipped by its author.
    #[display("marked skipped: {_0}")]
    Marked(String),

    /// Test depends on a test that is not part of the suite.
    #[display("depends on unknown test \"{dependency}\"")]
    MissingDependency {
        /// Name of the missing dependency.
        dependency: String,
    },

    /// Test participates in a dependency cycle.
    #[display("cyclic dependency involving \"{test}\"")]
    CyclicDependency {
        /// Name of a test on the cycle.
        test: String,
    },

    /// Test depends on a test that was skipped or otherwise never ran.
    #[display("dependency \"{dependency}\" did not run")]
    DependencyNotRun {
        /// Name of the dependency that never ran.
        dependency: String,
    },

    /// A previous failure requested the run to stop.
    #[display("stopped on previous failure")]
    StoppedOnFailure,
}

/// Event specific to the whole suite run.
#[derive(Clone, Debug)]
pub enum Suite {
    /// Suite context (module container and action index) being built.
    Init,

    /// Suite execution being started.
    Started,

    /// [`Test`] event.
    Test(Source<TestMeta>, Test),

    /// Suite execution being finished.
    Finished,
}

impl Suite {
    /// Dotted lifecycle name of this event (`suite.before`, `step.after`,
    /// ...), matching the names external reporters subscribe by.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Init => "suite.init",
            Self::Started => "suite.before",
            Self::Test(_, ev) => ev.name(),
            Self::Finished => "suite.after",
        }
    }
}

/// Event specific to a particular test.
#[derive(Clone, Debug)]
pub enum Test {
    /// Test being started: module before-hooks are about to run.
    Started,

    /// Test steps execution being started.
    Running,

    /// [`Step`] event.
    ///
    /// [`Step`]: crate::Step
    Step(Source<ScenarioStep>, Step),

    /// Test passed.
    Passed,

    /// Test failed on an assertion.
    Failed(Failure),

    /// Test errored in an unexpected way.
    Errored(String),

    /// Test was skipped without running its steps.
    Skipped(SkipReason),

    /// Test was marked incomplete by its author.
    Incomplete(String),

    /// Test steps execution being finished.
    Ended,

    /// Test being finished: module after-hooks have run.
    Finished,
}

impl Test {
    /// Dotted lifecycle name of this event.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Started => "test.before",
            Self::Running => "test.start",
            Self::Step(_, ev) => ev.name(),
            Self::Passed => "test.success",
            Self::Failed(_) => "test.fail",
            Self::Errored(_) => "test.error",
            Self::Skipped(_) => "test.skipped",
            Self::Incomplete(_) => "test.incomplete",
            Self::Ended => "test.end",
            Self::Finished => "test.after",
        }
    }
}

/// Event specific to a particular [`Step`].
///
/// [`Step`]: crate::Step
#[derive(Clone, Debug)]
pub enum Step {
    /// [`Step`] execution being started.
    ///
    /// [`Step`]: crate::Step
    Started,

    /// [`Step`] execution being finished.
    ///
    /// Emitted on every exit path, even when the step failed, for trace
    /// completeness.
    ///
    /// [`Step`]: crate::Step
    Finished(StepOutcome),
}

impl Step {
    /// Dotted lifecycle name of this event.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Started => "step.before",
            Self::Finished(_) => "step.after",
        }
    }
}

/// Classified outcome of a single dispatched [`Step`].
///
/// [`Step`]: crate::Step
#[derive(Clone, Debug, Display)]
pub enum StepOutcome {
    /// [`Step`] passed.
    ///
    /// [`Step`]: crate::Step
    #[display("passed")]
    Passed,

    /// [`Step`] raised an assertion failure.
    ///
    /// [`Step`]: crate::Step
    #[display("failed: {_0}")]
    Failed(Failure),

    /// [`Step`] raised an unexpected error.
    ///
    /// [`Step`]: crate::Step
    #[display("errored: {_0}")]
    Errored(String),

    /// [`Step`] references an action absent from the action index.
    ///
    /// [`Step`]: crate::Step
    #[display("action not defined")]
    NotDefined,
}

/// Subscriber of suite run [`Event`]s.
pub trait EventHandler {
    /// Handles the given [`Event`].
    fn handle_event(&mut self, ev: &Event<Suite>);
}

/// Suite-run-scoped publish/subscribe channel for lifecycle [`Event`]s.
///
/// One [`EventBus`] exists per suite run and is passed explicitly to the
/// components emitting events, never stored globally.
#[derive(Default)]
pub struct EventBus {
    /// Subscribed handlers, in registration order.
    handlers: Vec<Box<dyn EventHandler>>,
}

impl EventBus {
    /// Creates a new [`EventBus`] without any subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes the given `handler` to all events of this [`EventBus`].
    pub fn subscribe(&mut self, handler: Box<dyn EventHandler>) {
        self.handlers.push(handler);
    }

    /// Emits the given event to all subscribers, in registration order.
    pub fn emit(&mut self, ev: Suite) {
        let ev = Event::new(ev);
        for handler in &mut self.handlers {
            handler.handle_event(&ev);
        }
    }

    /// Emits a [`Test`] event for the given test.
    pub fn emit_test(&mut self, test: &Source<TestMeta>, ev: Test) {
        self.emit(Suite::Test(test.clone(), ev));
    }

    /// Emits a [`Step`] event for the given test and step.
    pub fn emit_step(
        &mut self,
        test: &Source<TestMeta>,
        step: &Source<ScenarioStep>,
        ev: Step,
    ) {
        self.emit_test(test, Test::Step(step.clone(), ev));
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
