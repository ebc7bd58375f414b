// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Consolidated error handling types.

use std::io;

use derive_more::{Display, Error, From};

use crate::{db::DbError, module::ModuleError, queue::QueueError};

/// Configuration errors, surfaced before the suite starts.
#[derive(Debug, Display, Error)]
pub enum ConfigError {
    /// Enabled module name is absent from the [`Registry`].
    ///
    /// [`Registry`]: crate::module::Registry
    #[display("module \"{module}\" is not registered")]
    UnknownModule {
        /// The unknown module name.
        #[error(not(source))]
        module: String,
    },

    /// Same module enabled twice in one suite.
    #[display("module \"{module}\" is enabled more than once")]
    DuplicateModule {
        /// The duplicated module name.
        #[error(not(source))]
        module: String,
    },

    /// Module configuration misses required fields.
    #[display(
        "module \"{module}\" requires configuration fields: {}",
        fields.join(", ")
    )]
    MissingFields {
        /// Name of the module.
        module: String,

        /// The missing field names.
        #[error(not(source))]
        fields: Vec<String>,
    },

    /// Same action name exposed by two enabled modules.
    ///
    /// Silently letting the last registered module win would guess intent;
    /// a collision is always a configuration mistake here.
    #[display(
        "action \"{action}\" is exposed by both \"{existing}\" and \
         \"{conflicting}\" modules"
    )]
    ActionCollision {
        /// The colliding action name.
        action: String,

        /// Module that registered the action first.
        #[error(not(source))]
        existing: String,

        /// Module that attempted to register it again.
        conflicting: String,
    },

    /// Module option (`only_actions`, `exclude_actions`, `aliases`)
    /// references an action the module does not declare.
    #[display("module \"{module}\" declares no action \"{action}\"")]
    UnknownAction {
        /// Name of the module.
        module: String,

        /// The unknown action name.
        #[error(not(source))]
        action: String,
    },

    /// Two tests in one suite share a name.
    ///
    /// Dependency edges address tests by name, so names must be unique.
    #[display("test \"{test}\" is defined more than once")]
    DuplicateTest {
        /// The duplicated test name.
        #[error(not(source))]
        test: String,
    },

    /// Suite configuration tree could not be deserialized.
    #[display("invalid suite configuration: {reason}")]
    Invalid {
        /// Reason the configuration is invalid.
        #[error(not(source))]
        reason: String,
    },
}

/// Top-level error type for all suite operations.
#[derive(Debug, Display, Error, From)]
pub enum Error {
    /// Configuration error: the suite never starts.
    #[display("configuration error: {_0}")]
    Config(ConfigError),

    /// Module construction or lifecycle hook error.
    #[display("module error: {_0}")]
    Module(ModuleError),

    /// Database driver error.
    #[display("database driver error: {_0}")]
    Db(DbError),

    /// Queue driver error.
    #[display("queue driver error: {_0}")]
    Queue(QueueError),

    /// I/O error.
    #[display("I/O operation failed: {_0}")]
    Io(io::Error),
}

/// Result type alias using the crate's [`enum@Error`].
pub type Result<T> = std::result::Result<T, Error>;
