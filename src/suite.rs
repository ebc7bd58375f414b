// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! [`Suite`]: a configured group of [`TestCase`]s sharing one set of enabled
//! modules and settings.

use std::fmt;

use crate::{config::SuiteConfig, scenario::Scenario};

/// Lightweight description of a test, carried by lifecycle events.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TestMeta {
    /// Unique (within the suite) test name.
    pub name: String,

    /// Human-readable feature description of the test's [`Scenario`].
    pub feature: Option<String>,
}

impl fmt::Display for TestMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.feature {
            Some(feature) => write!(f, "{} ({feature})", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// One test case: a named [`Scenario`] plus run-ordering metadata.
#[derive(Debug)]
pub struct TestCase {
    /// Unique (within the suite) test name.
    pub name: String,

    /// The [`Scenario`] to run.
    pub scenario: Scenario,

    /// Names of tests that must run before this one.
    ///
    /// Missing or cyclic dependencies mark this test skipped rather than
    /// raising a hard error.
    pub depends_on: Vec<String>,

    /// Author-declared skip marker with a reason.
    pub skip: Option<String>,

    /// Author-declared incomplete marker with a reason.
    pub incomplete: Option<String>,
}

impl TestCase {
    /// Creates a new [`TestCase`] with the given `name` and `scenario`.
    #[must_use]
    pub fn new(name: impl Into<String>, scenario: Scenario) -> Self {
        Self {
            name: name.into(),
            scenario,
            depends_on: Vec::new(),
            skip: None,
            incomplete: None,
        }
    }

    /// Declares that the test named `name` must run before this one.
    #[must_use]
    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        self.depends_on.push(name.into());
        self
    }

    /// Marks this test as skipped with the given reason.
    #[must_use]
    pub fn skipped(mut self, reason: impl Into<String>) -> Self {
        self.skip = Some(reason.into());
        self
    }

    /// Marks this test as incomplete with the given reason.
    #[must_use]
    pub fn incomplete(mut self, reason: impl Into<String>) -> Self {
        self.incomplete = Some(reason.into());
        self
    }

    /// Builds the [`TestMeta`] describing this test in events.
    #[must_use]
    pub fn meta(&self) -> TestMeta {
        TestMeta {
            name: self.name.clone(),
            feature: self.scenario.feature().map(ToOwned::to_owned),
        }
    }
}

/// A configured group of [`TestCase`]s sharing one set of enabled modules and
/// settings.
#[derive(Debug)]
pub struct Suite {
    /// Fully resolved suite configuration.
    pub config: SuiteConfig,

    /// Test cases, in loader enumeration order.
    pub tests: Vec<TestCase>,
}

impl Suite {
    /// Creates a new [`Suite`] with the given configuration and no tests.
    #[must_use]
    pub fn new(config: SuiteConfig) -> Self {
        Self { config, tests: Vec::new() }
    }

    /// Appends the given [`TestCase`] to this [`Suite`].
    #[must_use]
    pub fn with_test(mut self, test: TestCase) -> Self {
        self.tests.push(test);
        self
    }
}
