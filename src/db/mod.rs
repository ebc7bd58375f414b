// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! SQL driver family: a uniform contract for connecting to a stateful
//! database backend, loading a fixture dump and wiping all user data back to
//! an empty state, with backend-specific [`Dialect`] strategies.
//!
//! The wire connection itself is abstracted behind [`SqlClient`]: [`Sqlite`]
//! is wired natively via `rusqlite`, while clients for server backends are
//! supplied by the embedder and paired with the matching [`Dialect`] through
//! [`Db::new()`].

pub mod dialect;
pub mod mssql;
pub mod mysql;
pub mod oracle;
pub mod postgres;
pub mod sqlite;

use std::{collections::HashMap, io};

use derive_more::{Display, Error, From};
use itertools::Itertools as _;
use lazy_regex::{regex_captures, regex_is_match};
use sealed::sealed;
use serde_json::{Map, Value};

pub use self::{
    dialect::{Dialect, GenericSql},
    mssql::SqlServer,
    mysql::MySql,
    oracle::Oracle,
    postgres::Postgres,
    sqlite::{RusqliteClient, Sqlite, SqliteDialect},
};

/// One result row: column name → value.
pub type Row = Map<String, Value>;

/// Error of a database driver operation.
#[derive(Debug, Display, Error, From)]
pub enum DbError {
    /// Backend is unreachable or rejected the connection.
    ///
    /// Fatal and not retried automatically: retries are a test-author
    /// responsibility.
    #[display("failed to connect to \"{dsn}\": {reason}")]
    Connection {
        /// The DSN the connection was attempted with.
        dsn: String,

        /// Backend-reported reason.
        #[error(not(source))]
        reason: String,
    },

    /// DSN references a backend this crate cannot construct by itself.
    #[display("unsupported DSN \"{dsn}\": {reason}")]
    UnsupportedDsn {
        /// The offending DSN.
        dsn: String,

        /// Why the DSN is not supported.
        #[error(not(source))]
        reason: String,
    },

    /// A statement failed to execute.
    #[display("statement `{statement}` failed: {reason}")]
    Statement {
        /// The offending statement.
        statement: String,

        /// Backend-reported reason.
        #[error(not(source))]
        reason: String,
    },

    /// Filesystem error (file-backed databases, dump files).
    #[display("I/O error: {_0}")]
    #[from]
    Io(io::Error),
}

/// Opaque database connection handle: the single seam every [`Dialect`]
/// talks through.
///
/// Statements are parameterized positionally with [`Value`]s.
pub trait SqlClient {
    /// Executes the given statement, returning the number of affected rows.
    ///
    /// # Errors
    ///
    /// [`DbError::Statement`] if the backend rejects the statement.
    fn execute(
        &mut self,
        sql: &str,
        params: &[Value],
    ) -> Result<u64, DbError>;

    /// Runs the given query, returning all result [`Row`]s.
    ///
    /// # Errors
    ///
    /// [`DbError::Statement`] if the backend rejects the query.
    fn query(
        &mut self,
        sql: &str,
        params: &[Value],
    ) -> Result<Vec<Row>, DbError>;
}

/// SQL-oriented readings of a [`Value`].
#[sealed]
pub trait ValueSqlExt {
    /// Indicates whether this value must be rendered as an SQL `NULL`
    /// predicate (`IS NULL`) rather than an equality: equality with `NULL`
    /// never matches in standard SQL semantics.
    fn is_sql_null(&self) -> bool;

    /// Reads this value as a non-negative count, however the backend typed
    /// it (integer, float or numeric text).
    fn as_sql_count(&self) -> Option<u64>;
}

#[sealed]
impl ValueSqlExt for Value {
    fn is_sql_null(&self) -> bool {
        self.is_null()
    }

    fn as_sql_count(&self) -> Option<u64> {
        match self {
            Self::Number(n) => {
                n.as_u64().or_else(|| n.as_f64().map(|f| f as u64))
            }
            Self::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// Uniform contract of a database driver: connect once per suite, [`load()`]
/// a fixture, [`cleanup()`] back to an empty-but-structured state.
///
/// [`cleanup()`]: DbDriver::cleanup()
/// [`load()`]: DbDriver::load()
pub trait DbDriver {
    /// Executes a fixture dump, statement by statement.
    ///
    /// Statement boundaries follow [`sql_statements()`]: a configurable
    /// multi-character delimiter (default `;`) switchable with an in-stream
    /// `DELIMITER <token>` directive, with comment-only and blank lines
    /// skipped.
    ///
    /// Dumps containing DDL are not atomic on most backends (DDL is rarely
    /// transactional); on a mid-dump error the backend is left partially
    /// seeded and [`cleanup()`] should be invoked before reuse.
    ///
    /// # Errors
    ///
    /// On the first failing statement.
    ///
    /// [`cleanup()`]: DbDriver::cleanup()
    fn load(&mut self, dump: &str) -> Result<(), DbError>;

    /// Drops everything user-created, preserving schema and connection.
    ///
    /// # Errors
    ///
    /// If the backend rejects a drop statement.
    fn cleanup(&mut self) -> Result<(), DbError>;

    /// Inserts one row, returning the number of affected rows.
    ///
    /// # Errors
    ///
    /// If the insert statement fails or `row` is empty.
    fn insert(&mut self, table: &str, row: &Row) -> Result<u64, DbError>;

    /// Counts rows matching `criteria`.
    ///
    /// # Errors
    ///
    /// If the select statement fails.
    fn count(&mut self, table: &str, criteria: &Row) -> Result<u64, DbError>;

    /// Selects the values of one `column` from rows matching `criteria`.
    ///
    /// # Errors
    ///
    /// If the select statement fails.
    fn select_values(
        &mut self,
        column: &str,
        table: &str,
        criteria: &Row,
    ) -> Result<Vec<Value>, DbError>;

    /// Deletes rows matching `criteria`, returning the number of affected
    /// rows.
    ///
    /// # Errors
    ///
    /// If the delete statement fails.
    fn delete(&mut self, table: &str, criteria: &Row) -> Result<u64, DbError>;

    /// Ordered primary-key column names of `table`, cached per table name
    /// for the life of the connection.
    ///
    /// An empty result means no primary key, or a dialect without
    /// introspection support.
    ///
    /// # Errors
    ///
    /// If the catalog query fails.
    fn primary_key(&mut self, table: &str) -> Result<Vec<String>, DbError>;
}

/// Generic SQL driver: a [`SqlClient`] paired with a [`Dialect`] strategy.
///
/// Backend-specific drivers needing more than statement generation (e.g.
/// [`Sqlite`] with its file snapshotting) wrap this type.
pub struct Db {
    /// Connection handle.
    client: Box<dyn SqlClient>,

    /// Dialect strategy: quoting, placeholders, cleanup, introspection.
    dialect: Box<dyn Dialect>,

    /// Per-table primary-key cache, kept for the life of the connection.
    pk_cache: HashMap<String, Vec<String>>,
}

impl Db {
    /// Creates a new [`Db`] driver out of an established connection and a
    /// [`Dialect`] strategy.
    #[must_use]
    pub fn new(client: Box<dyn SqlClient>, dialect: Box<dyn Dialect>) -> Self {
        Self { client, dialect, pk_cache: HashMap::new() }
    }

    /// [`Dialect`] strategy of this driver.
    #[must_use]
    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    /// Executes a raw statement through the underlying connection.
    ///
    /// # Errors
    ///
    /// [`DbError::Statement`] if the backend rejects the statement.
    pub fn execute(
        &mut self,
        sql: &str,
        params: &[Value],
    ) -> Result<u64, DbError> {
        self.client.execute(sql, params)
    }

    /// Runs a raw query through the underlying connection.
    ///
    /// # Errors
    ///
    /// [`DbError::Statement`] if the backend rejects the query.
    pub fn query(
        &mut self,
        sql: &str,
        params: &[Value],
    ) -> Result<Vec<Row>, DbError> {
        self.client.query(sql, params)
    }

    /// Swaps the underlying connection, dropping (and so closing) the old
    /// one and invalidating the primary-key cache.
    pub(crate) fn replace_client(&mut self, client: Box<dyn SqlClient>) {
        self.client = client;
        self.pk_cache.clear();
    }

    /// Builds a `WHERE` clause and its bound parameters out of `criteria`.
    ///
    /// A `null` criteria value generates an `IS NULL` predicate and binds no
    /// parameter.
    fn where_clause(&self, criteria: &Row) -> (String, Vec<Value>) {
        if criteria.is_empty() {
            return (String::new(), Vec::new());
        }
        let mut params = Vec::new();
        let clause = criteria
            .iter()
            .map(|(column, value)| {
                let column = self.dialect.quote(column);
                if value.is_sql_null() {
                    format!("{column} IS NULL")
                } else {
                    params.push(value.clone());
                    format!(
                        "{column} = {}",
                        self.dialect.placeholder(params.len()),
                    )
                }
            })
            .join(" AND ");
        (format!(" WHERE {clause}"), params)
    }
}

impl DbDriver for Db {
    fn load(&mut self, dump: &str) -> Result<(), DbError> {
        let statements = sql_statements(dump);
        tracing::debug!(
            dialect = self.dialect.name(),
            statements = statements.len(),
            "loading dump",
        );
        for statement in &statements {
            let _ = self.client.execute(statement, &[])?;
        }
        Ok(())
    }

    fn cleanup(&mut self) -> Result<(), DbError> {
        tracing::debug!(dialect = self.dialect.name(), "cleaning up database");
        self.dialect.cleanup(self.client.as_mut())?;
        self.pk_cache.clear();
        Ok(())
    }

    fn insert(&mut self, table: &str, row: &Row) -> Result<u64, DbError> {
        if row.is_empty() {
            return Err(DbError::Statement {
                statement: format!("INSERT INTO {table}"),
                reason: "cannot insert an empty row".into(),
            });
        }
        let columns =
            row.keys().map(|c| self.dialect.quote(c)).join(", ");
        let placeholders =
            (1..=row.len()).map(|i| self.dialect.placeholder(i)).join(", ");
        let sql = format!(
            "INSERT INTO {} ({columns}) VALUES ({placeholders})",
            self.dialect.quote(table),
        );
        let params: Vec<Value> = row.values().cloned().collect();
        self.client.execute(&sql, &params)
    }

    fn count(&mut self, table: &str, criteria: &Row) -> Result<u64, DbError> {
        let (where_sql, params) = self.where_clause(criteria);
        let sql = format!(
            "SELECT COUNT(*) AS counted FROM {}{where_sql}",
            self.dialect.quote(table),
        );
        let rows = self.client.query(&sql, &params)?;
        Ok(rows
            .first()
            .and_then(|row| row.values().next())
            .and_then(ValueSqlExt::as_sql_count)
            .unwrap_or(0))
    }

    fn select_values(
        &mut self,
        column: &str,
        table: &str,
        criteria: &Row,
    ) -> Result<Vec<Value>, DbError> {
        let (where_sql, params) = self.where_clause(criteria);
        let sql = format!(
            "SELECT {} FROM {}{where_sql}",
            self.dialect.quote(column),
            self.dialect.quote(table),
        );
        let rows = self.client.query(&sql, &params)?;
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                row.get(column)
                    .cloned()
                    .or_else(|| row.values().next().cloned())
            })
            .collect())
    }

    fn delete(&mut self, table: &str, criteria: &Row) -> Result<u64, DbError> {
        let (where_sql, params) = self.where_clause(criteria);
        let sql =
            format!("DELETE FROM {}{where_sql}", self.dialect.quote(table));
        self.client.execute(&sql, &params)
    }

    fn primary_key(&mut self, table: &str) -> Result<Vec<String>, DbError> {
        if let Some(cached) = self.pk_cache.get(table) {
            return Ok(cached.clone());
        }
        let pk = self.dialect.primary_key(self.client.as_mut(), table)?;
        let _ = self.pk_cache.insert(table.to_owned(), pk.clone());
        Ok(pk)
    }
}

impl std::fmt::Debug for Db {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Db")
            .field("dialect", &self.dialect.name())
            .field("pk_cache", &self.pk_cache)
            .finish_non_exhaustive()
    }
}

/// Connects to the backend described by `dsn`.
///
/// Only `sqlite:` DSNs can be constructed in-process. For server backends
/// pair your own [`SqlClient`] with [`dialect_for()`] via [`Db::new()`].
///
/// # Errors
///
/// - [`DbError::Connection`] if the backend rejects the connection;
/// - [`DbError::UnsupportedDsn`] for schemes without an in-process client.
pub fn connect(
    dsn: &str,
    _user: Option<&str>,
    _password: Option<&str>,
) -> Result<Box<dyn DbDriver>, DbError> {
    match dsn.split(':').next().unwrap_or_default() {
        "sqlite" => {
            let path = dsn.trim_start_matches("sqlite:");
            Ok(Box::new(Sqlite::connect(path)?))
        }
        "mysql" | "pgsql" | "sqlsrv" | "oci" => {
            Err(DbError::UnsupportedDsn {
                dsn: dsn.to_owned(),
                reason: "no in-process client for this backend; pair your \
                         own `SqlClient` with `dialect_for()` via `Db::new()`"
                    .into(),
            })
        }
        scheme => Err(DbError::UnsupportedDsn {
            dsn: dsn.to_owned(),
            reason: format!("unknown scheme \"{scheme}\""),
        }),
    }
}

/// Picks the [`Dialect`] strategy matching the given DSN scheme.
///
/// # Errors
///
/// [`DbError::UnsupportedDsn`] on an unknown scheme.
pub fn dialect_for(dsn: &str) -> Result<Box<dyn Dialect>, DbError> {
    match dsn.split(':').next().unwrap_or_default() {
        "mysql" => Ok(Box::new(MySql)),
        "pgsql" => Ok(Box::new(Postgres)),
        "sqlsrv" => Ok(Box::new(SqlServer)),
        "oci" => Ok(Box::new(Oracle)),
        "sqlite" => Ok(Box::new(SqliteDialect)),
        scheme => Err(DbError::UnsupportedDsn {
            dsn: dsn.to_owned(),
            reason: format!("unknown scheme \"{scheme}\""),
        }),
    }
}

/// Splits a fixture dump into executable statements.
///
/// Statements are accumulated line by line until the current delimiter is
/// seen at line end. The delimiter defaults to `;` and is switchable for the
/// remainder of the stream with a `DELIMITER <token>` directive line
/// (mirroring common SQL-dump tooling), so definitions containing `;`
/// internally (stored procedures, triggers) survive intact. Comment-only and
/// blank lines between statements are skipped.
#[must_use]
pub fn sql_statements(dump: &str) -> Vec<String> {
    let mut delimiter = ";".to_owned();
    let mut statements = Vec::new();
    let mut current = String::new();

    for line in dump.lines() {
        let trimmed = line.trim();
        if current.is_empty() {
            if trimmed.is_empty()
                || regex_is_match!(r"^(?:--|#|//)", trimmed)
            {
                continue;
            }
            if let Some((_, token)) =
                regex_captures!(r"(?i)^DELIMITER\s+(\S+)$", trimmed)
            {
                delimiter = token.to_owned();
                continue;
            }
        }

        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(line);

        if trimmed.ends_with(delimiter.as_str()) {
            let stmt = current.trim_end();
            let stmt = stmt[..stmt.len() - delimiter.len()].trim_end();
            if !stmt.is_empty() {
                statements.push(stmt.to_owned());
            }
            current.clear();
        }
    }

    let rest = current.trim();
    if !rest.is_empty() {
        statements.push(rest.to_owned());
    }
    statements
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted [`SqlClient`] for dialect unit tests.

    use std::collections::VecDeque;

    use serde_json::Value;

    use super::{DbError, Row, SqlClient};

    /// [`SqlClient`] recording every statement and replaying scripted query
    /// results.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingClient {
        pub executed: Vec<String>,
        pub results: VecDeque<Vec<Row>>,
    }

    impl RecordingClient {
        pub(crate) fn with_results(
            results: impl IntoIterator<Item = Vec<Row>>,
        ) -> Self {
            Self {
                executed: Vec::new(),
                results: results.into_iter().collect(),
            }
        }
    }

    impl SqlClient for RecordingClient {
        fn execute(
            &mut self,
            sql: &str,
            _params: &[Value],
        ) -> Result<u64, DbError> {
            self.executed.push(sql.to_owned());
            Ok(0)
        }

        fn query(
            &mut self,
            sql: &str,
            _params: &[Value],
        ) -> Result<Vec<Row>, DbError> {
            self.executed.push(sql.to_owned());
            Ok(self.results.pop_front().unwrap_or_default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::sql_statements;

    #[test]
    fn splits_on_default_delimiter() {
        let dump = "\
            -- seed users\n\
            CREATE TABLE users (id INT);\n\
            \n\
            INSERT INTO users\n\
            VALUES (1);\n";

        assert_eq!(
            sql_statements(dump),
            ["CREATE TABLE users (id INT)", "INSERT INTO users\nVALUES (1)"],
        );
    }

    #[test]
    fn delimiter_directive_spans_internal_semicolons() {
        let dump = "\
            DELIMITER //\n\
            CREATE PROCEDURE prune()\n\
            BEGIN\n\
            DELETE FROM sessions;\n\
            END //\n\
            DELIMITER ;\n\
            DROP TABLE sessions;\n";

        let statements = sql_statements(dump);
        assert_eq!(statements.len(), 2);
        assert!(statements[0].contains("DELETE FROM sessions;"));
        assert_eq!(statements[1], "DROP TABLE sessions");
    }

    #[test]
    fn trailing_statement_without_delimiter_is_kept() {
        assert_eq!(sql_statements("SELECT 1"), ["SELECT 1"]);
    }

    #[test]
    fn comment_and_blank_lines_are_skipped() {
        let dump = "# a\n// b\n-- c\n\n";

        assert!(sql_statements(dump).is_empty());
    }
}
