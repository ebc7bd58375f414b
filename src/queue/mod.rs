// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Queue driver family: a uniform interface over message-queue backends.
//!
//! Every driver translates its backend-specific not-found signal into the
//! uniform [`QueueError::NotFound`], so tests see one error shape regardless
//! of the backend.

pub mod beanstalk;
pub mod memory;

use std::io;

use derive_more::{Display, Error, From};

pub use self::{beanstalk::Beanstalk, memory::Memory};

/// Error of a queue driver operation.
#[derive(Debug, Display, Error, From)]
pub enum QueueError {
    /// Referenced queue does not exist on the backend.
    #[display("queue \"{queue}\" not found")]
    NotFound {
        /// The missing queue name.
        #[error(not(source))]
        queue: String,
    },

    /// Backend is unreachable or rejected the connection.
    #[display("failed to connect to \"{endpoint}\": {reason}")]
    Connection {
        /// The endpoint the connection was attempted with.
        endpoint: String,

        /// Backend-reported reason.
        #[error(not(source))]
        reason: String,
    },

    /// Backend answered something the driver cannot interpret.
    #[display("queue protocol error: {reason}")]
    Protocol {
        /// What went wrong.
        #[error(not(source))]
        reason: String,
    },

    /// Transport-level error.
    #[display("I/O error: {_0}")]
    #[from]
    Io(io::Error),
}

/// Uniform contract of a queue driver.
pub trait QueueDriver {
    /// Adds a message onto the named queue, creating the queue when the
    /// backend creates queues implicitly.
    ///
    /// # Errors
    ///
    /// If the backend rejects the message.
    fn add_message(
        &mut self,
        message: &str,
        queue: &str,
    ) -> Result<(), QueueError>;

    /// Names of all queues currently known to the backend.
    ///
    /// # Errors
    ///
    /// If the backend cannot be queried.
    fn queues(&mut self) -> Result<Vec<String>, QueueError>;

    /// Number of messages currently waiting on the named queue.
    ///
    /// # Errors
    ///
    /// [`QueueError::NotFound`] if the queue does not exist.
    fn current_count(&mut self, queue: &str) -> Result<u64, QueueError>;

    /// Total number of messages the named queue has ever accepted.
    ///
    /// # Errors
    ///
    /// [`QueueError::NotFound`] if the queue does not exist.
    fn total_count(&mut self, queue: &str) -> Result<u64, QueueError>;

    /// Drains and deletes messages from the named queue until it is empty.
    ///
    /// Clearing an already-empty queue is a no-op.
    ///
    /// # Errors
    ///
    /// [`QueueError::NotFound`] if the queue does not exist.
    fn clear(&mut self, queue: &str) -> Result<(), QueueError>;
}
