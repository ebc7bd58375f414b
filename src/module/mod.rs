// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Pluggable action [`Module`]s: static action descriptors, lifecycle hooks
//! and the suite-scoped [`ModuleContainer`] resolving action names to module
//! calls.

pub mod container;
pub mod db;
pub mod queue;
pub mod registry;

use derive_more::{Display, Error, From};
use serde_json::{Map, Value};

use crate::{config::SuiteConfig, suite::TestMeta};

pub use self::{
    container::{ActionTarget, ModuleContainer, ModuleOptions},
    registry::Registry,
};

/// Assertion failure raised by an [`Assertion`]-kind step when an expectation
/// is not met.
///
/// Stops the current scenario only; the suite continues with the next test.
///
/// [`Assertion`]: crate::StepKind::Assertion
#[derive(Clone, Debug, Display, Error, Eq, PartialEq)]
#[display("{message}")]
pub struct Failure {
    /// Human-readable description of the unmet expectation.
    pub message: String,
}

impl Failure {
    /// Creates a new [`Failure`] with the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// Error returned by a [`Module`] action call.
///
/// The failure/error distinction is load-bearing: it changes exit-code and
/// reporting semantics for consumers.
#[derive(Debug, Display, Error, From)]
pub enum ActionError {
    /// Expected assertion failure, recorded as "failure".
    #[display("{_0}")]
    Failure(Failure),

    /// Unexpected runtime error, recorded as "error".
    #[display("{_0}")]
    Fatal(#[error(not(source))] anyhow::Error),
}

impl ActionError {
    /// Shortcut for an assertion [`Failure`] with the given message.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure(Failure::new(message))
    }

    /// Shortcut for a [`Fatal`] error with the given message.
    ///
    /// [`Fatal`]: ActionError::Fatal
    #[must_use]
    pub fn fatal(message: impl Into<String>) -> Self {
        Self::Fatal(anyhow::anyhow!(message.into()))
    }
}

/// Error of constructing, configuring or running lifecycle hooks of a
/// [`Module`].
#[derive(Debug, Display, Error)]
pub enum ModuleError {
    /// Module configuration could not be deserialized.
    #[display("module \"{module}\" configuration is invalid: {source}")]
    Config {
        /// Name of the module.
        module: String,

        /// Underlying deserialization error.
        #[error(not(source))]
        source: anyhow::Error,
    },

    /// Module failed to initialize (e.g. its backend is unreachable).
    ///
    /// Fatal for the suite; does not crash unrelated modules.
    #[display("module \"{module}\" failed to initialize: {source}")]
    Init {
        /// Name of the module.
        module: String,

        /// Underlying error.
        #[error(not(source))]
        source: anyhow::Error,
    },

    /// Module lifecycle hook failed.
    #[display("module \"{module}\" hook `{hook}` failed: {source}")]
    Hook {
        /// Name of the module.
        module: String,

        /// Name of the failed hook.
        hook: &'static str,

        /// Underlying error.
        #[error(not(source))]
        source: anyhow::Error,
    },
}

impl ModuleError {
    /// Creates a [`ModuleError::Config`].
    #[must_use]
    pub fn config(
        module: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Config { module: module.into(), source: source.into() }
    }

    /// Creates a [`ModuleError::Init`].
    #[must_use]
    pub fn init(
        module: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Init { module: module.into(), source: source.into() }
    }

    /// Creates a [`ModuleError::Hook`].
    #[must_use]
    pub fn hook(
        module: impl Into<String>,
        hook: &'static str,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Hook { module: module.into(), hook, source: source.into() }
    }
}

/// Static description of one exposed action.
///
/// `params` documents the expected positional arguments; modules parse and
/// validate the actual [`Value`]s themselves, so optional trailing arguments
/// are allowed.
#[derive(Clone, Copy, Debug)]
pub struct ActionSpec {
    /// Exposed action name.
    pub name: &'static str,

    /// Positional parameter names, for documentation and reporting.
    pub params: &'static [&'static str],
}

/// Static descriptor of a [`Module`] type: its registry name, required
/// configuration fields and the full table of exposed actions.
///
/// This table replaces runtime reflection over public methods: a module
/// declares its callable surface once, at type-definition time.
#[derive(Clone, Copy, Debug)]
pub struct ModuleDescriptor {
    /// Registry name of the module.
    pub name: &'static str,

    /// Configuration fields that must be present before the module is
    /// constructed.
    pub required_fields: &'static [&'static str],

    /// Exposed actions of the module.
    pub actions: &'static [ActionSpec],
}

impl ModuleDescriptor {
    /// Looks up the [`ActionSpec`] with the given `name`.
    #[must_use]
    pub fn action(&self, name: &str) -> Option<&'static ActionSpec> {
        self.actions.iter().find(|a| a.name == name)
    }
}

/// Pluggable component exposing named actions backed by a real capability
/// (database, queue, HTTP client, ...).
///
/// One instance is shared across all tests of a suite run, so hooks must
/// reset only per-test mutable state, never the underlying connection.
pub trait Module {
    /// Static descriptor of this module.
    fn descriptor(&self) -> &'static ModuleDescriptor;

    /// Initializes the module after configuration validation.
    ///
    /// # Errors
    ///
    /// If the module's backend is unreachable or misconfigured.
    fn initialize(&mut self) -> Result<(), ModuleError> {
        Ok(())
    }

    /// Runs before the first test of the suite, with the resolved suite
    /// settings.
    ///
    /// # Errors
    ///
    /// Any error here is a fatal suite-setup error.
    fn before_suite(
        &mut self,
        _settings: &SuiteConfig,
    ) -> Result<(), ModuleError> {
        Ok(())
    }

    /// Runs after the last test of the suite.
    ///
    /// # Errors
    ///
    /// If suite teardown fails.
    fn after_suite(&mut self) -> Result<(), ModuleError> {
        Ok(())
    }

    /// Resets per-test in-memory state. Invoked before each test.
    fn cleanup(&mut self) {}

    /// Runs before each test, after [`cleanup()`].
    ///
    /// # Errors
    ///
    /// An error here records the test as errored without running its steps.
    ///
    /// [`cleanup()`]: Module::cleanup()
    fn before(&mut self, _test: &TestMeta) -> Result<(), ModuleError> {
        Ok(())
    }

    /// Runs after each test, regardless of its outcome.
    ///
    /// # Errors
    ///
    /// If per-test teardown fails.
    fn after(&mut self, _test: &TestMeta) -> Result<(), ModuleError> {
        Ok(())
    }

    /// Runs after a test failed or errored, before [`after()`].
    ///
    /// Best effort: errors raised here are logged, never propagated, to
    /// avoid masking the original failure.
    ///
    /// # Errors
    ///
    /// Logged by the caller and counted as a warning.
    ///
    /// [`after()`]: Module::after()
    fn failed(
        &mut self,
        _test: &TestMeta,
        _failure: &ActionError,
    ) -> Result<(), ModuleError> {
        Ok(())
    }

    /// Invokes the action with the given `method` name (one of
    /// [`ModuleDescriptor::actions`]) with `args` unpacked positionally.
    ///
    /// # Errors
    ///
    /// - [`ActionError::Failure`] on an unmet assertion;
    /// - [`ActionError::Fatal`] on any unexpected error.
    fn call(
        &mut self,
        method: &str,
        args: &[Value],
    ) -> Result<Value, ActionError>;
}

/// Extracts a required string argument at `idx`.
///
/// # Errors
///
/// [`ActionError::Fatal`] naming the action and position on a missing or
/// mistyped argument.
pub fn arg_str<'a>(
    args: &'a [Value],
    idx: usize,
    action: &str,
) -> Result<&'a str, ActionError> {
    args.get(idx).and_then(Value::as_str).ok_or_else(|| {
        ActionError::fatal(format!(
            "action \"{action}\" expects a string argument at position {idx}",
        ))
    })
}

/// Extracts a required object argument at `idx`.
///
/// # Errors
///
/// [`ActionError::Fatal`] naming the action and position on a missing or
/// mistyped argument.
pub fn arg_object<'a>(
    args: &'a [Value],
    idx: usize,
    action: &str,
) -> Result<&'a Map<String, Value>, ActionError> {
    args.get(idx).and_then(Value::as_object).ok_or_else(|| {
        ActionError::fatal(format!(
            "action \"{action}\" expects an object argument at position {idx}",
        ))
    })
}

/// Extracts an optional object argument at `idx`, defaulting to an empty
/// criteria map.
///
/// # Errors
///
/// [`ActionError::Fatal`] if the argument is present but not an object.
pub fn arg_object_opt(
    args: &[Value],
    idx: usize,
    action: &str,
) -> Result<Map<String, Value>, ActionError> {
    match args.get(idx) {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(v) => v.as_object().cloned().ok_or_else(|| {
            ActionError::fatal(format!(
                "action \"{action}\" expects an object argument at position \
                 {idx}",
            ))
        }),
    }
}

/// Extracts a required unsigned integer argument at `idx`.
///
/// # Errors
///
/// [`ActionError::Fatal`] naming the action and position on a missing or
/// mistyped argument.
pub fn arg_u64(
    args: &[Value],
    idx: usize,
    action: &str,
) -> Result<u64, ActionError> {
    args.get(idx).and_then(Value::as_u64).ok_or_else(|| {
        ActionError::fatal(format!(
            "action \"{action}\" expects an unsigned integer argument at \
             position {idx}",
        ))
    })
}
