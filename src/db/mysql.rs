// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! MySQL-like [`Dialect`].

use serde_json::Value;

use super::{
    dialect::{first_column_strings, Dialect},
    DbError, SqlClient,
};

/// MySQL-like [`Dialect`]: backtick quoting, table enumeration through
/// `information_schema` and foreign-key checks disabled around cleanup.
#[derive(Clone, Copy, Debug, Default)]
pub struct MySql;

impl Dialect for MySql {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote(&self, ident: &str) -> String {
        format!("`{ident}`")
    }

    /// Drops all tables of the current schema with foreign-key checks
    /// disabled, so tables referencing each other drop in any order.
    ///
    /// Checks are re-enabled on every exit path: leaving them off would
    /// poison the shared connection for subsequent tests.
    fn cleanup(&self, client: &mut dyn SqlClient) -> Result<(), DbError> {
        let _ = client.execute("SET FOREIGN_KEY_CHECKS=0", &[])?;
        let dropped: Result<(), DbError> = (|| {
            let tables = first_column_strings(client.query(
                "SELECT table_name FROM information_schema.tables \
                 WHERE table_schema = DATABASE() \
                 AND table_type = 'BASE TABLE'",
                &[],
            )?);
            for table in tables {
                let _ = client.execute(
                    &format!("DROP TABLE IF EXISTS {}", self.quote(&table)),
                    &[],
                )?;
            }
            Ok(())
        })();
        let reenabled = client.execute("SET FOREIGN_KEY_CHECKS=1", &[]);
        dropped.and(reenabled.map(drop))
    }

    fn primary_key(
        &self,
        client: &mut dyn SqlClient,
        table: &str,
    ) -> Result<Vec<String>, DbError> {
        let rows = client.query(
            "SELECT column_name FROM information_schema.key_column_usage \
             WHERE table_schema = DATABASE() \
             AND table_name = ? \
             AND constraint_name = 'PRIMARY' \
             ORDER BY ordinal_position",
            &[Value::String(table.to_owned())],
        )?;
        Ok(first_column_strings(rows))
    }
}
