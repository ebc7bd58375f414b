// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! [`Dispatcher`]: resolves a [`Step`] through the action index, invokes the
//! owning module and classifies the outcome.

use std::panic::{self, AssertUnwindSafe};

use derive_more::{Display, Error};
use serde_json::Value;

use crate::{
    event::{self, EventBus, Source, StepOutcome},
    module::{ActionError, Failure, ModuleContainer},
    step::{Step, StepKind},
    suite::TestMeta,
};

/// Classified error of dispatching one [`Step`].
///
/// Any variant stops the current scenario; the failure/error distinction is
/// preserved for the result aggregation.
#[derive(Debug, Display, Error)]
pub enum DispatchError {
    /// [`Step`] references an action absent from the action index.
    ///
    /// Propagates like an assertion failure (stop scenario, continue suite)
    /// but is reported distinctly to aid debugging.
    #[display("action \"{action}\" is not defined")]
    ActionNotDefined {
        /// The unresolved action name.
        #[error(not(source))]
        action: String,
    },

    /// [`Step`] raised an assertion failure.
    #[display("{_0}")]
    Failed(Failure),

    /// [`Step`] raised an unexpected error (including panics out of module
    /// code).
    #[display("{_0}")]
    Errored(#[error(not(source))] anyhow::Error),
}

impl DispatchError {
    /// Re-expresses this error as the [`ActionError`] handed to module
    /// `failed` hooks.
    #[must_use]
    pub fn to_action_error(&self) -> ActionError {
        match self {
            Self::ActionNotDefined { action } => ActionError::failure(
                format!("action \"{action}\" is not defined"),
            ),
            Self::Failed(failure) => ActionError::Failure(failure.clone()),
            Self::Errored(e) => ActionError::fatal(e.to_string()),
        }
    }
}

/// Resolves [`Step`]s through the action index of a [`ModuleContainer`],
/// invokes the owning module and classifies outcomes.
///
/// Stateless beyond the assertion counter; module state mutation is the
/// expected primary effect of dispatching. One [`Dispatcher`] is created per
/// test, borrowing the suite-run-scoped container and event bus.
#[derive(Debug)]
pub struct Dispatcher<'run> {
    /// Modules and action index of the suite run.
    container: &'run mut ModuleContainer,

    /// Event bus to emit step events on.
    bus: &'run mut EventBus,

    /// Test the dispatched steps belong to.
    test: Source<TestMeta>,

    /// Number of assertion steps dispatched successfully.
    assertions: usize,
}

impl<'run> Dispatcher<'run> {
    /// Creates a new [`Dispatcher`] for one test.
    #[must_use]
    pub fn new(
        container: &'run mut ModuleContainer,
        bus: &'run mut EventBus,
        test: Source<TestMeta>,
    ) -> Self {
        Self { container, bus, test, assertions: 0 }
    }

    /// Number of assertion steps dispatched successfully so far.
    #[must_use]
    pub const fn assertions(&self) -> usize {
        self.assertions
    }

    /// Dispatches one [`Step`].
    ///
    /// - [`Comment`] steps are logged and never reach the action index;
    /// - an action absent from the index is reported immediately, without
    ///   step events;
    /// - otherwise `step.before` is emitted, the module method is invoked
    ///   with the step's arguments unpacked positionally (panics are caught
    ///   into the error bucket), and `step.after` is emitted with the
    ///   classified outcome on every invocation path.
    ///
    /// # Errors
    ///
    /// Any [`DispatchError`], stopping the current scenario.
    ///
    /// [`Comment`]: StepKind::Comment
    pub fn run_step(
        &mut self,
        step: &Source<Step>,
    ) -> Result<(), DispatchError> {
        if step.kind() == StepKind::Comment {
            tracing::debug!(comment = %step, "comment step");
            self.bus.emit_step(&self.test, step, event::Step::Started);
            self.bus.emit_step(
                &self.test,
                step,
                event::Step::Finished(StepOutcome::Passed),
            );
            return Ok(());
        }

        if step.exec().is_none()
            && self.container.resolve(step.action()).is_none()
        {
            return Err(DispatchError::ActionNotDefined {
                action: step.action().to_owned(),
            });
        }

        self.bus.emit_step(&self.test, step, event::Step::Started);

        let invoked = panic::catch_unwind(AssertUnwindSafe(|| {
            if let Some(exec) = step.exec() {
                (**exec)(self.container)
            } else {
                self.container
                    .call(step.action(), step.args())
                    .unwrap_or_else(|| {
                        Err(ActionError::fatal(format!(
                            "action \"{}\" vanished from the index",
                            step.action(),
                        )))
                    })
            }
        }));
        let result: Result<Value, ActionError> = match invoked {
            Ok(result) => result,
            Err(payload) => Err(ActionError::fatal(panic_message(&payload))),
        };

        let (outcome, result) = match result {
            Ok(_) => {
                if step.kind() == StepKind::Assertion {
                    self.assertions += 1;
                }
                (StepOutcome::Passed, Ok(()))
            }
            Err(ActionError::Failure(failure)) => (
                StepOutcome::Failed(failure.clone()),
                Err(DispatchError::Failed(failure)),
            ),
            Err(ActionError::Fatal(e)) => (
                StepOutcome::Errored(e.to_string()),
                Err(DispatchError::Errored(e)),
            ),
        };

        // Emitted regardless of the outcome, for trace completeness.
        self.bus.emit_step(
            &self.test,
            step,
            event::Step::Finished(outcome),
        );
        result
    }
}

/// Renders a panic payload as a human-readable message.
fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<String>() {
        format!("module code panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<&str>() {
        format!("module code panicked: {message}")
    } else {
        "module code panicked".into()
    }
}
