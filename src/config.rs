// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Suite configuration: the fully resolved settings tree the engine consumes.
//!
//! Resolving this tree from layered configuration files is a collaborator
//! concern; [`deep_merge()`] is provided for collaborators applying
//! global → suite → dist-override layering.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConfigError;

/// Fully resolved configuration of one suite.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct SuiteConfig {
    /// Actor name the tests are written against (reporting only).
    #[serde(default)]
    pub actor: String,

    /// Root of the suite's test files.
    #[serde(default)]
    pub path: PathBuf,

    /// Module enablement and per-module configuration.
    #[serde(default)]
    pub modules: ModulesConfig,
}

/// Module enablement and per-module configuration of one suite.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ModulesConfig {
    /// Enabled module names, in enablement order.
    #[serde(default)]
    pub enabled: Vec<String>,

    /// Per-module configuration mappings, keyed by module name.
    #[serde(default)]
    pub config: Map<String, Value>,
}

impl SuiteConfig {
    /// Deserializes a [`SuiteConfig`] from a resolved configuration tree.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] if the tree doesn't match the expected
    /// shape.
    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        serde_json::from_value(value)
            .map_err(|e| ConfigError::Invalid { reason: e.to_string() })
    }

    /// Configuration mapping of the module named `name`, if any.
    #[must_use]
    pub fn module_config(&self, name: &str) -> Option<&Map<String, Value>> {
        self.modules.config.get(name).and_then(Value::as_object)
    }
}

/// Deep-merges the `overlay` configuration tree into `base`.
///
/// Objects are merged key-by-key with `overlay` keys taking precedence;
/// any non-object `overlay` value (including arrays) replaces the `base`
/// value wholesale.
pub fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(slot) => deep_merge(slot, value),
                    None => {
                        let _ = base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{deep_merge, SuiteConfig};

    #[test]
    fn suite_keys_take_precedence_on_merge() {
        let mut base = json!({
            "actor": "Tester",
            "modules": {
                "enabled": ["db"],
                "config": {"db": {"dsn": "sqlite:base.db", "cleanup": true}},
            },
        });
        let overlay = json!({
            "modules": {
                "config": {"db": {"dsn": "sqlite:suite.db"}},
            },
        });

        deep_merge(&mut base, overlay);
        let cfg = SuiteConfig::from_value(base).unwrap();

        let db = cfg.module_config("db").unwrap();
        assert_eq!(db["dsn"], json!("sqlite:suite.db"));
        assert_eq!(db["cleanup"], json!(true));
        assert_eq!(cfg.modules.enabled, ["db"]);
    }

    #[test]
    fn arrays_are_replaced_not_merged() {
        let mut base = json!({"modules": {"enabled": ["db", "queue"]}});
        deep_merge(&mut base, json!({"modules": {"enabled": ["db"]}}));

        assert_eq!(base["modules"]["enabled"], json!(["db"]));
    }

    #[test]
    fn malformed_tree_is_a_configuration_error() {
        let err = SuiteConfig::from_value(json!({"modules": 42})).unwrap_err();

        assert!(err.to_string().contains("invalid suite configuration"));
    }
}
