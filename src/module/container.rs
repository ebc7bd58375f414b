// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! [`ModuleContainer`]: instantiated modules of one suite run plus the action
//! index resolving action names to owning modules.

use std::collections::BTreeMap;

use linked_hash_map::LinkedHashMap;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{
    config::SuiteConfig,
    error::{ConfigError, Error},
    suite::TestMeta,
};

use super::{ActionError, Module, ModuleError, Registry};

/// Per-module action exposure options, read from the module's configuration
/// mapping.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ModuleOptions {
    /// If non-empty, restricts the exposed actions to the listed ones.
    pub only_actions: Vec<String>,

    /// Actions excluded from exposure.
    pub exclude_actions: Vec<String>,

    /// Additional exposed names: alias → declared action name.
    pub aliases: BTreeMap<String, String>,
}

impl ModuleOptions {
    /// Reads the [`ModuleOptions`] out of a module configuration mapping.
    ///
    /// Unrelated configuration keys are ignored.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] if the option keys have the wrong shape.
    pub fn from_config(
        module: &str,
        config: &Map<String, Value>,
    ) -> Result<Self, ConfigError> {
        serde_json::from_value(Value::Object(config.clone())).map_err(|e| {
            ConfigError::Invalid {
                reason: format!("module \"{module}\" options: {e}"),
            }
        })
    }
}

/// Resolution target of one exposed action name.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ActionTarget {
    /// Name of the owning module.
    pub module: String,

    /// Declared action name the exposed name maps to (differs from the
    /// exposed name only for aliases).
    pub method: &'static str,
}

/// Instantiated modules of one suite run plus the action index.
///
/// One [`ModuleContainer`] exists per suite run and is passed explicitly to
/// the dispatcher and the suite runner (never stored globally), so multiple
/// suites can run in-process safely.
pub struct ModuleContainer {
    /// Instantiated modules, in enablement order.
    modules: LinkedHashMap<String, Box<dyn Module>>,

    /// Action index: exposed action name → [`ActionTarget`].
    actions: LinkedHashMap<String, ActionTarget>,
}

impl ModuleContainer {
    /// Builds a [`ModuleContainer`] out of the suite configuration.
    ///
    /// For every enabled module name: looks the type up in the `registry`,
    /// validates required configuration fields, constructs the instance,
    /// runs its [`Module::initialize()`] hook and indexes its exposed
    /// actions.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::UnknownModule`] on a name absent from the registry;
    /// - [`ConfigError::MissingFields`] before the module is even
    ///   constructed, naming the module and its missing fields;
    /// - [`ConfigError::ActionCollision`] when two enabled modules expose
    ///   the same action name;
    /// - [`ConfigError::UnknownAction`] when exposure options reference an
    ///   undeclared action;
    /// - any [`ModuleError`] raised by the factory or
    ///   [`Module::initialize()`].
    pub fn build(
        registry: &Registry,
        config: &SuiteConfig,
    ) -> Result<Self, Error> {
        let mut this = Self {
            modules: LinkedHashMap::new(),
            actions: LinkedHashMap::new(),
        };

        for name in &config.modules.enabled {
            if this.modules.contains_key(name) {
                return Err(ConfigError::DuplicateModule {
                    module: name.clone(),
                }
                .into());
            }
            let reg = registry.get(name).ok_or_else(|| {
                ConfigError::UnknownModule { module: name.clone() }
            })?;

            let module_config = match config.modules.config.get(name) {
                None => Map::new(),
                Some(Value::Object(m)) => m.clone(),
                Some(_) => {
                    return Err(ConfigError::Invalid {
                        reason: format!(
                            "module \"{name}\" configuration must be an \
                             object",
                        ),
                    }
                    .into())
                }
            };

            let missing: Vec<String> = reg
                .descriptor
                .required_fields
                .iter()
                .filter(|field| {
                    matches!(
                        module_config.get(**field),
                        None | Some(Value::Null)
                    )
                })
                .map(|field| (*field).to_owned())
                .collect();
            if !missing.is_empty() {
                return Err(ConfigError::MissingFields {
                    module: name.clone(),
                    fields: missing,
                }
                .into());
            }

            let options = ModuleOptions::from_config(name, &module_config)?;
            let mut module = (reg.factory)(&module_config)?;
            module.initialize()?;

            this.index_actions(name, reg.descriptor, &options)?;
            let _ = this.modules.insert(name.clone(), module);

            tracing::debug!(module = name.as_str(), "module initialized");
        }

        Ok(this)
    }

    /// Indexes the exposed actions of one module, honoring its
    /// [`ModuleOptions`].
    fn index_actions(
        &mut self,
        module: &str,
        descriptor: &'static super::ModuleDescriptor,
        options: &ModuleOptions,
    ) -> Result<(), Error> {
        for filter in
            options.only_actions.iter().chain(&options.exclude_actions)
        {
            if descriptor.action(filter).is_none() {
                return Err(ConfigError::UnknownAction {
                    module: module.to_owned(),
                    action: filter.clone(),
                }
                .into());
            }
        }

        let mut exposed: Vec<(String, &'static str)> = descriptor
            .actions
            .iter()
            .filter(|spec| {
                options.only_actions.is_empty()
                    || options.only_actions.iter().any(|a| a == spec.name)
            })
            .filter(|spec| {
                !options.exclude_actions.iter().any(|a| a == spec.name)
            })
            .map(|spec| (spec.name.to_owned(), spec.name))
            .collect();

        for (alias, original) in &options.aliases {
            let spec = descriptor.action(original).ok_or_else(|| {
                ConfigError::UnknownAction {
                    module: module.to_owned(),
                    action: original.clone(),
                }
            })?;
            exposed.push((alias.clone(), spec.name));
        }

        for (name, method) in exposed {
            if let Some(existing) = self.actions.get(&name) {
                return Err(ConfigError::ActionCollision {
                    action: name,
                    existing: existing.module.clone(),
                    conflicting: module.to_owned(),
                }
                .into());
            }
            let _ = self.actions.insert(
                name,
                ActionTarget { module: module.to_owned(), method },
            );
        }
        Ok(())
    }

    /// Names of the instantiated modules, in enablement order.
    pub fn module_names(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }

    /// The action index: exposed action name → [`ActionTarget`].
    #[must_use]
    pub fn actions(&self) -> &LinkedHashMap<String, ActionTarget> {
        &self.actions
    }

    /// Resolves the given exposed action name.
    #[must_use]
    pub fn resolve(&self, action: &str) -> Option<&ActionTarget> {
        self.actions.get(action)
    }

    /// Resolves and invokes the given exposed action with `args` unpacked
    /// positionally.
    ///
    /// Returns [`None`] if the action is not defined in the index.
    pub fn call(
        &mut self,
        action: &str,
        args: &[Value],
    ) -> Option<Result<Value, ActionError>> {
        let target = self.actions.get(action)?.clone();
        let module = self.modules.get_mut(&target.module)?;
        Some(module.call(target.method, args))
    }

    /// Invokes every module's [`Module::before_suite()`] hook, in enablement
    /// order.
    ///
    /// # Errors
    ///
    /// The first hook error, which is a fatal suite-setup error.
    pub fn before_suite(
        &mut self,
        settings: &SuiteConfig,
    ) -> Result<(), ModuleError> {
        for (name, module) in self.modules.iter_mut() {
            tracing::debug!(module = name.as_str(), "before_suite");
            module.before_suite(settings)?;
        }
        Ok(())
    }

    /// Invokes every module's [`Module::after_suite()`] hook.
    ///
    /// # Errors
    ///
    /// The first hook error.
    pub fn after_suite(&mut self) -> Result<(), ModuleError> {
        for (name, module) in self.modules.iter_mut() {
            tracing::debug!(module = name.as_str(), "after_suite");
            module.after_suite()?;
        }
        Ok(())
    }

    /// Resets per-test state and invokes every module's [`Module::before()`]
    /// hook.
    ///
    /// # Errors
    ///
    /// The first hook error, which records the test as errored.
    pub fn start_test(&mut self, test: &TestMeta) -> Result<(), ModuleError> {
        for (_, module) in self.modules.iter_mut() {
            module.cleanup();
            module.before(test)?;
        }
        Ok(())
    }

    /// Invokes every module's [`Module::after()`] hook, regardless of the
    /// test outcome.
    ///
    /// # Errors
    ///
    /// The first hook error.
    pub fn end_test(&mut self, test: &TestMeta) -> Result<(), ModuleError> {
        for (_, module) in self.modules.iter_mut() {
            module.after(test)?;
        }
        Ok(())
    }

    /// Invokes every module's [`Module::failed()`] hook, best effort.
    ///
    /// Hook errors are logged and counted, never propagated, to avoid
    /// masking the original failure. Returns the number of hook errors.
    pub fn notify_failed(
        &mut self,
        test: &TestMeta,
        failure: &ActionError,
    ) -> usize {
        let mut hook_errors = 0;
        for (name, module) in self.modules.iter_mut() {
            if let Err(e) = module.failed(test, failure) {
                tracing::warn!(
                    module = name.as_str(),
                    error = %e,
                    "failed-hook error ignored",
                );
                hook_errors += 1;
            }
        }
        hook_errors
    }
}

impl std::fmt::Debug for ModuleContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleContainer")
            .field("modules", &self.modules.keys().collect::<Vec<_>>())
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .finish()
    }
}
