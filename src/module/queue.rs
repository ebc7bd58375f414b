// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Builtin `queue` [`Module`]: message-queue actions over a [`QueueDriver`].

use anyhow::anyhow;
use serde::Deserialize;
use serde_json::{Map, Value};
use smart_default::SmartDefault;

use crate::queue::{Beanstalk, Memory, QueueDriver};

use super::{
    arg_str, arg_u64, ActionError, ActionSpec, Module, ModuleDescriptor,
    ModuleError,
};

/// Configuration of the `queue` module.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct QueueConfig {
    /// Backend type: `"memory"` or `"beanstalk"` (required).
    #[serde(rename = "type")]
    pub kind: String,

    /// Backend host (required for `beanstalk`).
    pub host: Option<String>,

    /// Backend port.
    #[default = 11300]
    pub port: u16,
}

/// Static descriptor of the `queue` module.
pub static DESCRIPTOR: ModuleDescriptor = ModuleDescriptor {
    name: "queue",
    required_fields: &["type"],
    actions: &[
        ActionSpec {
            name: "put_message_on_queue",
            params: &["message", "queue"],
        },
        ActionSpec { name: "clear_queue", params: &["queue"] },
        ActionSpec { name: "grab_queues", params: &[] },
        ActionSpec { name: "see_queue_exists", params: &["queue"] },
        ActionSpec { name: "see_empty_queue", params: &["queue"] },
        ActionSpec {
            name: "see_queue_has_current_count",
            params: &["queue", "expected"],
        },
        ActionSpec {
            name: "see_queue_has_total_count",
            params: &["queue", "expected"],
        },
    ],
};

/// Constructs a [`QueueModule`] out of its configuration mapping.
///
/// # Errors
///
/// [`ModuleError::Config`] if the mapping doesn't deserialize.
pub fn factory(
    config: &Map<String, Value>,
) -> Result<Box<dyn Module>, ModuleError> {
    let config: QueueConfig =
        serde_json::from_value(Value::Object(config.clone()))
            .map_err(|e| ModuleError::config(DESCRIPTOR.name, e))?;
    Ok(Box::new(QueueModule::new(config)))
}

/// Builtin `queue` [`Module`].
pub struct QueueModule {
    /// Module configuration.
    config: QueueConfig,

    /// Connected driver, populated by [`Module::initialize()`].
    driver: Option<Box<dyn QueueDriver>>,
}

impl QueueModule {
    /// Creates a not-yet-connected [`QueueModule`].
    #[must_use]
    pub fn new(config: QueueConfig) -> Self {
        Self { config, driver: None }
    }

    /// Creates a [`QueueModule`] over an already-connected driver.
    #[must_use]
    pub fn with_driver(
        config: QueueConfig,
        driver: Box<dyn QueueDriver>,
    ) -> Self {
        Self { config, driver: Some(driver) }
    }

    fn driver(&mut self) -> Result<&mut Box<dyn QueueDriver>, ActionError> {
        self.driver.as_mut().ok_or_else(|| {
            ActionError::Fatal(anyhow!("queue driver is not connected"))
        })
    }

    fn see_queue_exists(
        &mut self,
        args: &[Value],
    ) -> Result<Value, ActionError> {
        let queue = arg_str(args, 0, "see_queue_exists")?.to_owned();
        let queues = self
            .driver()?
            .queues()
            .map_err(|e| ActionError::Fatal(e.into()))?;
        if queues.iter().any(|q| q == &queue) {
            Ok(Value::Null)
        } else {
            Err(ActionError::failure(format!(
                "queue \"{queue}\" does not exist (found: {})",
                queues.join(", "),
            )))
        }
    }

    fn current_count(&mut self, queue: &str) -> Result<u64, ActionError> {
        self.driver()?
            .current_count(queue)
            .map_err(|e| ActionError::Fatal(e.into()))
    }

    fn total_count(&mut self, queue: &str) -> Result<u64, ActionError> {
        self.driver()?
            .total_count(queue)
            .map_err(|e| ActionError::Fatal(e.into()))
    }
}

impl Module for QueueModule {
    fn descriptor(&self) -> &'static ModuleDescriptor {
        &DESCRIPTOR
    }

    fn initialize(&mut self) -> Result<(), ModuleError> {
        if self.driver.is_some() {
            return Ok(());
        }
        let driver: Box<dyn QueueDriver> = match self.config.kind.as_str() {
            "memory" => Box::new(Memory::new()),
            "beanstalk" => {
                let host = self.config.host.as_deref().ok_or_else(|| {
                    ModuleError::init(
                        DESCRIPTOR.name,
                        anyhow!("\"beanstalk\" backend requires a host"),
                    )
                })?;
                Box::new(
                    Beanstalk::connect(host, self.config.port)
                        .map_err(|e| ModuleError::init(DESCRIPTOR.name, e))?,
                )
            }
            other => {
                return Err(ModuleError::init(
                    DESCRIPTOR.name,
                    anyhow!("unknown queue backend type \"{other}\""),
                ))
            }
        };
        self.driver = Some(driver);
        Ok(())
    }

    fn call(
        &mut self,
        method: &str,
        args: &[Value],
    ) -> Result<Value, ActionError> {
        match method {
            "put_message_on_queue" => {
                let message =
                    arg_str(args, 0, "put_message_on_queue")?.to_owned();
                let queue =
                    arg_str(args, 1, "put_message_on_queue")?.to_owned();
                self.driver()?
                    .add_message(&message, &queue)
                    .map_err(|e| ActionError::Fatal(e.into()))?;
                Ok(Value::Null)
            }
            "clear_queue" => {
                let queue = arg_str(args, 0, "clear_queue")?.to_owned();
                self.driver()?
                    .clear(&queue)
                    .map_err(|e| ActionError::Fatal(e.into()))?;
                Ok(Value::Null)
            }
            "grab_queues" => {
                let queues = self
                    .driver()?
                    .queues()
                    .map_err(|e| ActionError::Fatal(e.into()))?;
                Ok(Value::Array(
                    queues.into_iter().map(Value::String).collect(),
                ))
            }
            "see_queue_exists" => self.see_queue_exists(args),
            "see_empty_queue" => {
                let queue = arg_str(args, 0, "see_empty_queue")?.to_owned();
                let count = self.current_count(&queue)?;
                if count == 0 {
                    Ok(Value::Null)
                } else {
                    Err(ActionError::failure(format!(
                        "queue \"{queue}\" still holds {count} messages",
                    )))
                }
            }
            "see_queue_has_current_count" => {
                let queue = arg_str(args, 0, "see_queue_has_current_count")?
                    .to_owned();
                let expected =
                    arg_u64(args, 1, "see_queue_has_current_count")?;
                let count = self.current_count(&queue)?;
                if count == expected {
                    Ok(Value::Null)
                } else {
                    Err(ActionError::failure(format!(
                        "queue \"{queue}\" holds {count} messages, expected \
                         {expected}",
                    )))
                }
            }
            "see_queue_has_total_count" => {
                let queue =
                    arg_str(args, 0, "see_queue_has_total_count")?.to_owned();
                let expected = arg_u64(args, 1, "see_queue_has_total_count")?;
                let count = self.total_count(&queue)?;
                if count == expected {
                    Ok(Value::Null)
                } else {
                    Err(ActionError::failure(format!(
                        "queue \"{queue}\" accepted {count} messages in \
                         total, expected {expected}",
                    )))
                }
            }
            other => Err(ActionError::fatal(format!(
                "module \"queue\" declares no action \"{other}\"",
            ))),
        }
    }
}

impl std::fmt::Debug for QueueModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueModule")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
