// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! [`Step`] definitions: one atomic test action with a name, an ordered
//! argument list and a [`StepKind`] tag.

use std::{fmt, rc::Rc};

use derive_more::Display;
use serde_json::Value;

use crate::module::{ActionError, ModuleContainer};

/// Callback payload of an [`Executor`]-kind [`Step`].
///
/// Invoked by the dispatcher with the suite's [`ModuleContainer`] instead of
/// being resolved through the action index.
///
/// [`Executor`]: StepKind::Executor
pub type ExecutorFn =
    Rc<dyn Fn(&mut ModuleContainer) -> Result<Value, ActionError>>;

/// Classification of a [`Step`], decided by the [`Scenario`] builder method
/// that appended it.
///
/// [`Scenario`]: crate::Scenario
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum StepKind {
    /// Precondition, appended by [`Scenario::given()`].
    ///
    /// [`Scenario::given()`]: crate::Scenario::given()
    #[display("given")]
    Condition,

    /// Action, appended by [`Scenario::when()`].
    ///
    /// [`Scenario::when()`]: crate::Scenario::when()
    #[display("when")]
    Action,

    /// Assertion, appended by [`Scenario::then()`].
    ///
    /// [`Scenario::then()`]: crate::Scenario::then()
    #[display("then")]
    Assertion,

    /// Free-form note, never dispatched through the action index.
    #[display("comment")]
    Comment,

    /// Directly executed callback, carrying an [`ExecutorFn`].
    #[display("execute")]
    Executor,
}

/// One atomic test action: an action name, an ordered argument list and a
/// [`StepKind`] tag.
///
/// [`Step`]s are immutable after construction and owned by the [`Scenario`]
/// that created them.
///
/// # Invariants
///
/// - `action` is non-empty for all kinds except [`StepKind::Comment`];
/// - `args` length is fixed at construction.
///
/// [`Scenario`]: crate::Scenario
#[derive(Clone)]
pub struct Step {
    /// Action name this [`Step`] resolves to.
    ///
    /// Empty only for [`StepKind::Comment`] steps.
    action: String,

    /// Ordered argument list, passed to the resolved action positionally.
    args: Vec<Value>,

    /// Classification tag of this [`Step`].
    kind: StepKind,

    /// Directly executed callback, present only for [`StepKind::Executor`].
    exec: Option<ExecutorFn>,
}

impl Step {
    /// Creates a new [`Step`] of the given `kind`.
    #[must_use]
    pub fn new(
        kind: StepKind,
        action: impl Into<String>,
        args: Vec<Value>,
    ) -> Self {
        let action = action.into();
        debug_assert!(
            kind == StepKind::Comment || !action.is_empty(),
            "non-comment steps require an action name",
        );
        Self { action, args, kind, exec: None }
    }

    /// Creates a [`StepKind::Comment`] [`Step`] out of the given `text`.
    #[must_use]
    pub fn comment(text: impl Into<String>) -> Self {
        Self {
            action: String::new(),
            args: vec![Value::String(text.into())],
            kind: StepKind::Comment,
            exec: None,
        }
    }

    /// Creates a [`StepKind::Executor`] [`Step`] running the given callback
    /// directly, bypassing the action index.
    #[must_use]
    pub fn executor(exec: ExecutorFn) -> Self {
        Self {
            action: "execute".into(),
            args: Vec::new(),
            kind: StepKind::Executor,
            exec: Some(exec),
        }
    }

    /// Action name of this [`Step`].
    #[must_use]
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Ordered arguments of this [`Step`].
    #[must_use]
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// [`StepKind`] of this [`Step`].
    #[must_use]
    pub const fn kind(&self) -> StepKind {
        self.kind
    }

    /// Callback of a [`StepKind::Executor`] [`Step`], if any.
    #[must_use]
    pub fn exec(&self) -> Option<&ExecutorFn> {
        self.exec.as_ref()
    }

    /// Comment text, if this is a [`StepKind::Comment`] [`Step`].
    #[must_use]
    pub fn comment_text(&self) -> Option<&str> {
        (self.kind == StepKind::Comment)
            .then(|| self.args.first().and_then(Value::as_str))
            .flatten()
    }

    /// Renders the action name as human-readable words
    /// (`see_in_database` → `see in database`).
    #[must_use]
    pub fn humanized_action(&self) -> String {
        self.action.replace('_', " ")
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("kind", &self.kind)
            .field("action", &self.action)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(text) = self.comment_text() {
            return write!(f, "# {text}");
        }
        write!(f, "{}", self.humanized_action())?;
        for (i, arg) in self.args.iter().enumerate() {
            if i == 0 {
                write!(f, " ")?;
            } else {
                write!(f, ", ")?;
            }
            write!(f, "{arg}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{Step, StepKind};

    #[test]
    fn displays_humanized_action_with_args() {
        let step = Step::new(
            StepKind::Assertion,
            "see_in_database",
            vec![json!("users"), json!({"name": "alice"})],
        );

        assert_eq!(
            step.to_string(),
            "see in database \"users\", {\"name\":\"alice\"}",
        );
    }

    #[test]
    fn comment_has_empty_action() {
        let step = Step::comment("ready to log in");

        assert_eq!(step.kind(), StepKind::Comment);
        assert_eq!(step.action(), "");
        assert_eq!(step.comment_text(), Some("ready to log in"));
        assert_eq!(step.to_string(), "# ready to log in");
    }
}
