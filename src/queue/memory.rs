// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! In-process queue driver, mostly useful in tests and local runs.

use std::collections::VecDeque;

use linked_hash_map::LinkedHashMap;

use super::{QueueDriver, QueueError};

/// One in-process queue.
#[derive(Debug, Default)]
struct Channel {
    /// Messages currently waiting.
    messages: VecDeque<String>,

    /// Lifetime count of accepted messages.
    total: u64,
}

/// In-process [`QueueDriver`]: queues are created implicitly on first use,
/// mirroring tube semantics of the beanstalk backend.
#[derive(Debug, Default)]
pub struct Memory {
    /// Queues, in creation order.
    channels: LinkedHashMap<String, Channel>,
}

impl Memory {
    /// Creates a new, empty [`Memory`] driver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn channel(&mut self, queue: &str) -> Result<&mut Channel, QueueError> {
        self.channels.get_mut(queue).ok_or_else(|| QueueError::NotFound {
            queue: queue.to_owned(),
        })
    }
}

impl QueueDriver for Memory {
    fn add_message(
        &mut self,
        message: &str,
        queue: &str,
    ) -> Result<(), QueueError> {
        let channel = self
            .channels
            .entry(queue.to_owned())
            .or_insert_with(Channel::default);
        channel.messages.push_back(message.to_owned());
        channel.total += 1;
        Ok(())
    }

    fn queues(&mut self) -> Result<Vec<String>, QueueError> {
        Ok(self.channels.keys().cloned().collect())
    }

    fn current_count(&mut self, queue: &str) -> Result<u64, QueueError> {
        Ok(self.channel(queue)?.messages.len() as u64)
    }

    fn total_count(&mut self, queue: &str) -> Result<u64, QueueError> {
        Ok(self.channel(queue)?.total)
    }

    fn clear(&mut self, queue: &str) -> Result<(), QueueError> {
        self.channel(queue)?.messages.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Memory, QueueDriver as _, QueueError};

    #[test]
    fn queues_are_created_implicitly() {
        let mut driver = Memory::new();

        driver.add_message("a", "emails").unwrap();
        driver.add_message("b", "emails").unwrap();

        assert_eq!(driver.queues().unwrap(), ["emails"]);
        assert_eq!(driver.current_count("emails").unwrap(), 2);
        assert_eq!(driver.total_count("emails").unwrap(), 2);
    }

    #[test]
    fn clear_preserves_total_count() {
        let mut driver = Memory::new();
        driver.add_message("a", "emails").unwrap();

        driver.clear("emails").unwrap();

        assert_eq!(driver.current_count("emails").unwrap(), 0);
        assert_eq!(driver.total_count("emails").unwrap(), 1);
    }

    #[test]
    fn missing_queue_is_a_uniform_error() {
        let mut driver = Memory::new();

        let err = driver.current_count("ghost").unwrap_err();

        assert!(matches!(err, QueueError::NotFound { queue } if queue == "ghost"));
    }
}
