// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! [`Registry`] of constructible [`Module`] types.
//!
//! A [`Registry`] is suite-run-scoped and passed explicitly into
//! [`ModuleContainer::build()`]; there is no process-wide registration
//! state.
//!
//! [`ModuleContainer::build()`]: super::ModuleContainer::build()

use linked_hash_map::LinkedHashMap;
use once_cell::sync::Lazy;
use serde_json::{Map, Value};

use super::{db, queue, Module, ModuleDescriptor, ModuleError};

/// Constructor of a [`Module`] out of its (already validated) configuration
/// mapping.
pub type ModuleFactory =
    fn(&Map<String, Value>) -> Result<Box<dyn Module>, ModuleError>;

/// One registered [`Module`] type.
#[derive(Clone, Copy)]
pub struct Registration {
    /// Static descriptor of the module type.
    pub descriptor: &'static ModuleDescriptor,

    /// Constructor of module instances.
    pub factory: ModuleFactory,
}

/// Builtin module types, registered by [`Registry::new()`].
static BUILTINS: Lazy<Vec<Registration>> = Lazy::new(|| {
    vec![
        Registration { descriptor: &db::DESCRIPTOR, factory: db::factory },
        Registration {
            descriptor: &queue::DESCRIPTOR,
            factory: queue::factory,
        },
    ]
});

/// Registry mapping module names to their descriptors and factories.
pub struct Registry {
    /// Registered module types, in registration order.
    registrations: LinkedHashMap<&'static str, Registration>,
}

impl Registry {
    /// Creates a [`Registry`] with all builtin modules registered.
    #[must_use]
    pub fn new() -> Self {
        let mut this = Self::empty();
        for reg in BUILTINS.iter() {
            let _ = this.register(reg.descriptor, reg.factory);
        }
        this
    }

    /// Creates an empty [`Registry`] without any builtin modules.
    #[must_use]
    pub fn empty() -> Self {
        Self { registrations: LinkedHashMap::new() }
    }

    /// Registers a module type.
    ///
    /// Re-registering a name replaces the previous registration, which is
    /// the supported way of overriding a builtin module. Action-name
    /// collisions between different enabled modules are still rejected at
    /// container build time.
    pub fn register(
        &mut self,
        descriptor: &'static ModuleDescriptor,
        factory: ModuleFactory,
    ) -> &mut Self {
        let _ = self
            .registrations
            .insert(descriptor.name, Registration { descriptor, factory });
        self
    }

    /// Looks up the [`Registration`] for the given module `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Registration> {
        self.registrations.get(name).copied()
    }

    /// Names of all registered module types, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.registrations.keys().copied()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("registrations", &self.names().collect::<Vec<_>>())
            .finish()
    }
}
