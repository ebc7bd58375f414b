// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Scenario-driven test automation engine.
//!
//! A test is a [`Scenario`]: an ordered sequence of typed [`Step`]s built
//! with `given`/`when`/`then` builder methods. Steps name actions; actions
//! are resolved through a suite-scoped action index to pluggable
//! [`Module`]s backed by real capabilities (databases, queues). The
//! [`SuiteRunner`] drives the whole lifecycle, isolates failures at the
//! per-test boundary, and reports every occurrence on an [`EventBus`] that
//! reporters subscribe to.
//!
//! # Example
//!
//! ```rust
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use rehearse::{
//!     Registry, Scenario, Suite, SuiteConfig, SuiteRunner, TestCase,
//! };
//! use serde_json::json;
//!
//! let config = SuiteConfig::from_value(json!({
//!     "actor": "Tester",
//!     "modules": { "enabled": [] },
//! }))?;
//!
//! let mut scenario = Scenario::new();
//! scenario
//!     .set_feature("suite bootstraps")
//!     .comment("no modules enabled, so only comments run");
//!
//! let mut suite =
//!     Suite::new(config).with_test(TestCase::new("smoke", scenario));
//! let stats = SuiteRunner::new(Registry::new()).run(&mut suite)?;
//!
//! assert!(stats.was_successful());
//! # Ok(())
//! # }
//! ```
//!
//! Stateful backends live behind the driver layer: the [`db`] family
//! (dialect strategies over a [`SqlClient`] seam, with SQLite wired
//! natively) and the [`queue`] family (in-process memory queue, beanstalkd
//! protocol client). Both follow one contract: connect once per suite, load
//! a fixture, clean the backend back to a known-empty state.
//!
//! [`SqlClient`]: crate::db::SqlClient

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod event;
pub mod module;
pub mod queue;
pub mod reporter;
pub mod result;
pub mod runner;
pub mod scenario;
pub mod step;
pub mod suite;

pub use self::{
    config::{ModulesConfig, SuiteConfig},
    error::Error,
    event::{EventBus, EventHandler},
    module::{
        ActionError, ActionSpec, Failure, Module, ModuleContainer,
        ModuleDescriptor, ModuleError, Registry,
    },
    result::RunStats,
    runner::{DispatchError, Dispatcher, SuiteRunner},
    scenario::Scenario,
    step::{ExecutorFn, Step, StepKind},
    suite::{Suite, TestCase, TestMeta},
};
