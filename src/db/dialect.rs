// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! [`Dialect`] strategy: the backend-specific parts of SQL generation,
//! cleanup and catalog introspection.

use super::{DbError, SqlClient};

/// Backend-specific strategy of a [`Db`] driver.
///
/// The defaults implement the ANSI-ish generic-SQL dialect: double-quoted
/// identifiers, `?` placeholders, no cleanup and no primary-key
/// introspection. Concrete dialects override what their backend does
/// differently.
///
/// [`Db`]: super::Db
pub trait Dialect {
    /// Name of this dialect, for diagnostics.
    fn name(&self) -> &'static str;

    /// Quotes an identifier.
    fn quote(&self, ident: &str) -> String {
        format!("\"{ident}\"")
    }

    /// Renders the positional parameter placeholder with the given 1-based
    /// index.
    fn placeholder(&self, index: usize) -> String {
        let _ = index;
        "?".into()
    }

    /// Drops everything user-created, preserving schema and connection.
    ///
    /// The generic dialect has no portable way to enumerate user objects,
    /// so this is a no-op unless overridden.
    ///
    /// # Errors
    ///
    /// If the backend rejects a drop statement.
    fn cleanup(&self, client: &mut dyn SqlClient) -> Result<(), DbError> {
        let _ = client;
        Ok(())
    }

    /// Ordered primary-key column names of `table`.
    ///
    /// Empty when the table has no primary key or the dialect has no
    /// introspection support.
    ///
    /// # Errors
    ///
    /// If the catalog query fails.
    fn primary_key(
        &self,
        client: &mut dyn SqlClient,
        table: &str,
    ) -> Result<Vec<String>, DbError> {
        let _ = (client, table);
        Ok(Vec::new())
    }
}

/// The generic-SQL dialect: ANSI quoting, `?` placeholders, no cleanup.
#[derive(Clone, Copy, Debug, Default)]
pub struct GenericSql;

impl Dialect for GenericSql {
    fn name(&self) -> &'static str {
        "generic"
    }
}

/// Pulls the first column value of every row as a string.
///
/// Catalog queries in the concrete dialects all produce single-column name
/// listings, so this is the shared decoding step.
pub(super) fn first_column_strings(
    rows: Vec<super::Row>,
) -> Vec<String> {
    rows.into_iter()
        .filter_map(|row| {
            row.values().next().and_then(|v| v.as_str().map(ToOwned::to_owned))
        })
        .collect()
}
