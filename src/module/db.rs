// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Builtin `db` [`Module`]: fixture population and database assertions over
//! a [`DbDriver`].

use std::{fs, path::PathBuf};

use anyhow::anyhow;
use serde::Deserialize;
use serde_json::{Map, Value};
use smart_default::SmartDefault;

use crate::{
    config::SuiteConfig,
    db::{self, DbDriver, Row},
    suite::TestMeta,
};

use super::{
    arg_object, arg_object_opt, arg_str, ActionError, ActionSpec, Module,
    ModuleDescriptor, ModuleError,
};

/// When the database is reset to its seeded state.
///
/// An explicit option rather than an inferred global rule: suites wanting
/// isolation pay for a per-test reseed, suites wanting speed reset once per
/// suite and write tests that tolerate shared state.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum RefreshPolicy {
    /// Cleanup and populate once, before the first test.
    #[default]
    PerSuite,

    /// Cleanup and populate before every test.
    PerTest,
}

/// Configuration of the `db` module.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct DbConfig {
    /// DSN of the database to connect to (required).
    pub dsn: String,

    /// Backend user name.
    pub user: Option<String>,

    /// Backend password.
    pub password: Option<String>,

    /// Path of the fixture dump to load.
    pub dump: Option<PathBuf>,

    /// Whether to wipe the database before populating.
    #[default = true]
    pub cleanup: bool,

    /// Whether to load the dump at all.
    #[default = true]
    pub populate: bool,

    /// When to reset the database to its seeded state.
    pub refresh: RefreshPolicy,
}

/// Static descriptor of the `db` module.
pub static DESCRIPTOR: ModuleDescriptor = ModuleDescriptor {
    name: "db",
    required_fields: &["dsn"],
    actions: &[
        ActionSpec { name: "have_in_database", params: &["table", "row"] },
        ActionSpec {
            name: "see_in_database",
            params: &["table", "criteria"],
        },
        ActionSpec {
            name: "dont_see_in_database",
            params: &["table", "criteria"],
        },
        ActionSpec {
            name: "grab_from_database",
            params: &["table", "column", "criteria"],
        },
        ActionSpec {
            name: "grab_num_records",
            params: &["table", "criteria"],
        },
    ],
};

/// Constructs a [`DbModule`] out of its configuration mapping.
///
/// # Errors
///
/// [`ModuleError::Config`] if the mapping doesn't deserialize.
pub fn factory(
    config: &Map<String, Value>,
) -> Result<Box<dyn Module>, ModuleError> {
    let config: DbConfig =
        serde_json::from_value(Value::Object(config.clone()))
            .map_err(|e| ModuleError::config(DESCRIPTOR.name, e))?;
    Ok(Box::new(DbModule::new(config)))
}

/// Builtin `db` [`Module`].
///
/// Rows inserted through `have_in_database` are remembered and deleted again
/// in the after-test hook, keyed by primary key where the backend exposes
/// one.
pub struct DbModule {
    /// Module configuration.
    config: DbConfig,

    /// Connected driver, populated by [`Module::initialize()`].
    driver: Option<Box<dyn DbDriver>>,

    /// Rows inserted by the current test, to delete back in `after`.
    inserted: Vec<(String, Row)>,
}

impl DbModule {
    /// Creates a not-yet-connected [`DbModule`].
    #[must_use]
    pub fn new(config: DbConfig) -> Self {
        Self { config, driver: None, inserted: Vec::new() }
    }

    /// Creates a [`DbModule`] over an already-connected driver.
    ///
    /// The seam for server backends whose [`SqlClient`] the embedding crate
    /// supplies.
    ///
    /// [`SqlClient`]: crate::db::SqlClient
    #[must_use]
    pub fn with_driver(config: DbConfig, driver: Box<dyn DbDriver>) -> Self {
        Self { config, driver: Some(driver), inserted: Vec::new() }
    }

    fn driver(&mut self) -> anyhow::Result<&mut Box<dyn DbDriver>> {
        self.driver
            .as_mut()
            .ok_or_else(|| anyhow!("database driver is not connected"))
    }

    /// Resets the database to its seeded state per configuration.
    fn refresh(&mut self) -> anyhow::Result<()> {
        if self.config.cleanup {
            self.driver()?.cleanup()?;
        }
        if self.config.populate {
            if let Some(path) = self.config.dump.clone() {
                let dump = fs::read_to_string(&path).map_err(|e| {
                    anyhow!("cannot read dump \"{}\": {e}", path.display())
                })?;
                self.driver()?.load(&dump)?;
            }
        }
        Ok(())
    }

    fn have_in_database(
        &mut self,
        args: &[Value],
    ) -> Result<Value, ActionError> {
        let table = arg_str(args, 0, "have_in_database")?.to_owned();
        let row = arg_object(args, 1, "have_in_database")?.clone();
        let _ = self
            .driver()
            .map_err(ActionError::Fatal)?
            .insert(&table, &row)
            .map_err(|e| ActionError::Fatal(e.into()))?;
        self.inserted.push((table, row));
        Ok(Value::Null)
    }

    fn see_in_database(
        &mut self,
        args: &[Value],
    ) -> Result<Value, ActionError> {
        let table = arg_str(args, 0, "see_in_database")?.to_owned();
        let criteria = arg_object_opt(args, 1, "see_in_database")?;
        let count = self
            .driver()
            .map_err(ActionError::Fatal)?
            .count(&table, &criteria)
            .map_err(|e| ActionError::Fatal(e.into()))?;
        if count == 0 {
            return Err(ActionError::failure(format!(
                "no records found in table \"{table}\" matching {}",
                Value::Object(criteria),
            )));
        }
        Ok(Value::Null)
    }

    fn dont_see_in_database(
        &mut self,
        args: &[Value],
    ) -> Result<Value, ActionError> {
        let table = arg_str(args, 0, "dont_see_in_database")?.to_owned();
        let criteria = arg_object_opt(args, 1, "dont_see_in_database")?;
        let count = self
            .driver()
            .map_err(ActionError::Fatal)?
            .count(&table, &criteria)
            .map_err(|e| ActionError::Fatal(e.into()))?;
        if count != 0 {
            return Err(ActionError::failure(format!(
                "found {count} records in table \"{table}\" matching {}",
                Value::Object(criteria),
            )));
        }
        Ok(Value::Null)
    }

    fn grab_from_database(
        &mut self,
        args: &[Value],
    ) -> Result<Value, ActionError> {
        let table = arg_str(args, 0, "grab_from_database")?.to_owned();
        let column = arg_str(args, 1, "grab_from_database")?.to_owned();
        let criteria = arg_object_opt(args, 2, "grab_from_database")?;
        let values = self
            .driver()
            .map_err(ActionError::Fatal)?
            .select_values(&column, &table, &criteria)
            .map_err(|e| ActionError::Fatal(e.into()))?;
        values.into_iter().next().ok_or_else(|| {
            ActionError::failure(format!(
                "no records found in table \"{table}\" matching {}",
                Value::Object(criteria),
            ))
        })
    }

    fn grab_num_records(
        &mut self,
        args: &[Value],
    ) -> Result<Value, ActionError> {
        let table = arg_str(args, 0, "grab_num_records")?.to_owned();
        let criteria = arg_object_opt(args, 1, "grab_num_records")?;
        let count = self
            .driver()
            .map_err(ActionError::Fatal)?
            .count(&table, &criteria)
            .map_err(|e| ActionError::Fatal(e.into()))?;
        Ok(Value::from(count))
    }
}

impl Module for DbModule {
    fn descriptor(&self) -> &'static ModuleDescriptor {
        &DESCRIPTOR
    }

    fn initialize(&mut self) -> Result<(), ModuleError> {
        if self.driver.is_none() {
            let driver = db::connect(
                &self.config.dsn,
                self.config.user.as_deref(),
                self.config.password.as_deref(),
            )
            .map_err(|e| ModuleError::init(DESCRIPTOR.name, e))?;
            self.driver = Some(driver);
        }
        Ok(())
    }

    fn before_suite(
        &mut self,
        _settings: &SuiteConfig,
    ) -> Result<(), ModuleError> {
        self.refresh()
            .map_err(|e| ModuleError::hook(DESCRIPTOR.name, "before_suite", e))
    }

    fn cleanup(&mut self) {
        self.inserted.clear();
    }

    fn before(&mut self, _test: &TestMeta) -> Result<(), ModuleError> {
        if self.config.refresh == RefreshPolicy::PerTest {
            self.refresh()
                .map_err(|e| ModuleError::hook(DESCRIPTOR.name, "before", e))?;
        }
        Ok(())
    }

    fn after(&mut self, _test: &TestMeta) -> Result<(), ModuleError> {
        while let Some((table, row)) = self.inserted.pop() {
            let driver = self
                .driver()
                .map_err(|e| ModuleError::hook(DESCRIPTOR.name, "after", e))?;
            // Narrow the delete-back criteria to the primary key when the
            // inserted row carries all its columns; the full row otherwise.
            let pk = driver.primary_key(&table).unwrap_or_default();
            let criteria: Row = if !pk.is_empty()
                && pk.iter().all(|c| row.contains_key(c))
            {
                pk.iter().map(|c| (c.clone(), row[c].clone())).collect()
            } else {
                row
            };
            let _ = driver.delete(&table, &criteria).map_err(|e| {
                ModuleError::hook(DESCRIPTOR.name, "after", anyhow!(e))
            })?;
        }
        Ok(())
    }

    fn call(
        &mut self,
        method: &str,
        args: &[Value],
    ) -> Result<Value, ActionError> {
        match method {
            "have_in_database" => self.have_in_database(args),
            "see_in_database" => self.see_in_database(args),
            "dont_see_in_database" => self.dont_see_in_database(args),
            "grab_from_database" => self.grab_from_database(args),
            "grab_num_records" => self.grab_num_records(args),
            other => Err(ActionError::fatal(format!(
                "module \"db\" declares no action \"{other}\"",
            ))),
        }
    }
}

impl std::fmt::Debug for DbModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbModule")
            .field("config", &self.config)
            .field("inserted", &self.inserted.len())
            .finish_non_exhaustive()
    }
}
