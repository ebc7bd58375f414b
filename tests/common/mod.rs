//! Shared fixtures: a scripted acting module, a REST-ish stub module and an
//! event-collecting handler.

#![allow(dead_code)]

use std::{cell::RefCell, rc::Rc};

use serde::Deserialize;
use serde_json::{json, Map, Value};

use rehearse::{
    event::{self, Event, EventHandler},
    ActionError, ActionSpec, Module, ModuleDescriptor, ModuleError, Registry,
    SuiteConfig, TestMeta,
};

/// Descriptor of the scripted [`ActingModule`].
pub static ACTING: ModuleDescriptor = ModuleDescriptor {
    name: "acting",
    required_fields: &[],
    actions: &[
        ActionSpec { name: "have_user", params: &["name"] },
        ActionSpec { name: "login", params: &["user", "password"] },
        ActionSpec { name: "see_dashboard", params: &[] },
        ActionSpec { name: "check_foo", params: &[] },
    ],
};

/// Descriptor of the REST-ish [`StubModule`], used for config-validation and
/// collision coverage (it also declares `login`).
pub static REST: ModuleDescriptor = ModuleDescriptor {
    name: "rest",
    required_fields: &["url"],
    actions: &[
        ActionSpec { name: "send_get", params: &["path"] },
        ActionSpec { name: "login", params: &["user", "password"] },
    ],
};

/// Behavior script of the [`ActingModule`], read from its module config.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ActingScript {
    pub fail_on: Option<String>,
    pub error_on: Option<String>,
    pub panic_on: Option<String>,
    pub fail_before_suite: bool,
    pub fail_before: bool,
    pub fail_after: bool,
    pub fail_failed_hook: bool,
}

/// Module whose misbehavior is scripted through its configuration.
#[derive(Debug)]
pub struct ActingModule {
    script: ActingScript,
}

/// Factory of [`ActingModule`]s.
pub fn acting_factory(
    config: &Map<String, Value>,
) -> Result<Box<dyn Module>, ModuleError> {
    let script: ActingScript =
        serde_json::from_value(Value::Object(config.clone()))
            .map_err(|e| ModuleError::config("acting", e))?;
    Ok(Box::new(ActingModule { script }))
}

impl Module for ActingModule {
    fn descriptor(&self) -> &'static ModuleDescriptor {
        &ACTING
    }

    fn before_suite(
        &mut self,
        _settings: &SuiteConfig,
    ) -> Result<(), ModuleError> {
        if self.script.fail_before_suite {
            return Err(ModuleError::hook(
                "acting",
                "before_suite",
                anyhow::anyhow!("scripted before-suite breakage"),
            ));
        }
        Ok(())
    }

    fn before(&mut self, _test: &TestMeta) -> Result<(), ModuleError> {
        if self.script.fail_before {
            return Err(ModuleError::hook(
                "acting",
                "before",
                anyhow::anyhow!("scripted before breakage"),
            ));
        }
        Ok(())
    }

    fn after(&mut self, _test: &TestMeta) -> Result<(), ModuleError> {
        if self.script.fail_after {
            return Err(ModuleError::hook(
                "acting",
                "after",
                anyhow::anyhow!("scripted after breakage"),
            ));
        }
        Ok(())
    }

    fn failed(
        &mut self,
        _test: &TestMeta,
        _failure: &ActionError,
    ) -> Result<(), ModuleError> {
        if self.script.fail_failed_hook {
            return Err(ModuleError::hook(
                "acting",
                "failed",
                anyhow::anyhow!("scripted failed-hook breakage"),
            ));
        }
        Ok(())
    }

    fn call(
        &mut self,
        method: &str,
        _args: &[Value],
    ) -> Result<Value, ActionError> {
        if self.script.panic_on.as_deref() == Some(method) {
            panic!("scripted panic in {method}");
        }
        if self.script.fail_on.as_deref() == Some(method) {
            return Err(ActionError::failure(format!(
                "{method} expectation not met",
            )));
        }
        if self.script.error_on.as_deref() == Some(method) {
            return Err(ActionError::fatal(format!("{method} blew up")));
        }
        Ok(Value::Null)
    }
}

/// REST-ish stub module; every action succeeds.
#[derive(Debug)]
pub struct StubModule;

/// Factory of [`StubModule`]s.
pub fn rest_factory(
    _config: &Map<String, Value>,
) -> Result<Box<dyn Module>, ModuleError> {
    Ok(Box::new(StubModule))
}

impl Module for StubModule {
    fn descriptor(&self) -> &'static ModuleDescriptor {
        &REST
    }

    fn call(
        &mut self,
        _method: &str,
        _args: &[Value],
    ) -> Result<Value, ActionError> {
        Ok(Value::Null)
    }
}

/// Routes `tracing` output into the captured test writer.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Registry with the fixture modules (and no builtins) registered.
pub fn registry() -> Registry {
    let mut registry = Registry::empty();
    registry
        .register(&ACTING, acting_factory)
        .register(&REST, rest_factory);
    registry
}

/// Suite configuration enabling the given modules with the given per-module
/// config tree.
pub fn suite_config(enabled: &[&str], config: Value) -> SuiteConfig {
    SuiteConfig::from_value(json!({
        "actor": "Tester",
        "modules": { "enabled": enabled, "config": config },
    }))
    .expect("fixture suite config must deserialize")
}

/// Event log shared between a [`Collector`] and the asserting test.
pub type EventLog = Rc<RefCell<Vec<String>>>;

/// [`EventHandler`] collecting one rendered line per event.
pub struct Collector {
    log: EventLog,
}

/// Creates a [`Collector`] and the log it writes into.
pub fn collector() -> (Collector, EventLog) {
    let log = EventLog::default();
    (Collector { log: Rc::clone(&log) }, log)
}

impl EventHandler for Collector {
    fn handle_event(&mut self, ev: &Event<event::Suite>) {
        let rendered = match &ev.value {
            event::Suite::Test(_, event::Test::Step(step, sev)) => {
                let subject = if step.action().is_empty() {
                    "#comment".to_owned()
                } else {
                    step.action().to_owned()
                };
                format!("{} {subject}", sev.name())
            }
            event::Suite::Test(meta, tev) => {
                format!("{} {}", tev.name(), meta.name)
            }
            other => other.name().to_owned(),
        };
        self.log.borrow_mut().push(rendered);
    }
}
