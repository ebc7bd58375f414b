// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! File-backed SQLite driver, wired natively via `rusqlite`.

use std::{
    fs,
    path::{Path, PathBuf},
};

use rusqlite::types::ValueRef;
use serde_json::Value;

use super::{
    dialect::{first_column_strings, Dialect},
    Db, DbDriver, DbError, Row, SqlClient,
};

/// SQLite [`Dialect`]: ANSI quoting, `PRAGMA`-based introspection and
/// `sqlite_master`-based cleanup.
///
/// The [`Sqlite`] driver bypasses this cleanup in favor of truncating the
/// backing file, which is cheaper; the dialect-level variant serves clients
/// attached to databases the driver doesn't own.
#[derive(Clone, Copy, Debug, Default)]
pub struct SqliteDialect;

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn cleanup(&self, client: &mut dyn SqlClient) -> Result<(), DbError> {
        let tables = first_column_strings(client.query(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
            &[],
        )?);
        for table in tables {
            let _ = client.execute(
                &format!("DROP TABLE IF EXISTS {}", self.quote(&table)),
                &[],
            )?;
        }
        Ok(())
    }

    fn primary_key(
        &self,
        client: &mut dyn SqlClient,
        table: &str,
    ) -> Result<Vec<String>, DbError> {
        let rows = client.query(
            &format!("PRAGMA table_info({})", self.quote(table)),
            &[],
        )?;
        let mut columns: Vec<(u64, String)> = rows
            .iter()
            .filter_map(|row| {
                let pk = row.get("pk").and_then(Value::as_u64)?;
                let name = row.get("name").and_then(Value::as_str)?;
                (pk > 0).then(|| (pk, name.to_owned()))
            })
            .collect();
        columns.sort_by_key(|(pk, _)| *pk);
        Ok(columns.into_iter().map(|(_, name)| name).collect())
    }
}

/// [`SqlClient`] over an open `rusqlite` connection.
pub struct RusqliteClient {
    /// The open connection.
    conn: rusqlite::Connection,
}

impl RusqliteClient {
    /// Opens (creating if absent) the database file at `path`.
    ///
    /// # Errors
    ///
    /// [`DbError::Connection`] if the file cannot be opened.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        rusqlite::Connection::open(path)
            .map(|conn| Self { conn })
            .map_err(|e| DbError::Connection {
                dsn: format!("sqlite:{}", path.display()),
                reason: e.to_string(),
            })
    }

    /// Opens an in-memory database, for dialect-level use.
    ///
    /// # Errors
    ///
    /// [`DbError::Connection`] if the database cannot be created.
    pub fn open_in_memory() -> Result<Self, DbError> {
        rusqlite::Connection::open_in_memory()
            .map(|conn| Self { conn })
            .map_err(|e| DbError::Connection {
                dsn: "sqlite::memory:".into(),
                reason: e.to_string(),
            })
    }
}

/// Converts a [`Value`] parameter into its SQLite representation.
fn to_sql(value: &Value) -> rusqlite::types::Value {
    use rusqlite::types::Value as Sql;

    match value {
        Value::Null => Sql::Null,
        Value::Bool(b) => Sql::Integer(i64::from(*b)),
        Value::Number(n) => n
            .as_i64()
            .map_or_else(|| Sql::Real(n.as_f64().unwrap_or(0.0)), Sql::Integer),
        Value::String(s) => Sql::Text(s.clone()),
        other => Sql::Text(other.to_string()),
    }
}

/// Converts an SQLite result cell into a [`Value`].
///
/// Blobs are projected through UTF-8 lossily: fixture assertions deal in
/// text.
fn from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map_or(Value::Null, Value::Number),
        ValueRef::Text(t) | ValueRef::Blob(t) => {
            Value::String(String::from_utf8_lossy(t).into_owned())
        }
    }
}

impl SqlClient for RusqliteClient {
    fn execute(
        &mut self,
        sql: &str,
        params: &[Value],
    ) -> Result<u64, DbError> {
        let params: Vec<rusqlite::types::Value> =
            params.iter().map(to_sql).collect();
        self.conn
            .execute(sql, rusqlite::params_from_iter(params))
            .map(|affected| affected as u64)
            .map_err(|e| DbError::Statement {
                statement: sql.to_owned(),
                reason: e.to_string(),
            })
    }

    fn query(
        &mut self,
        sql: &str,
        params: &[Value],
    ) -> Result<Vec<Row>, DbError> {
        let fail = |e: rusqlite::Error| DbError::Statement {
            statement: sql.to_owned(),
            reason: e.to_string(),
        };
        let params: Vec<rusqlite::types::Value> =
            params.iter().map(to_sql).collect();

        let mut stmt = self.conn.prepare(sql).map_err(fail)?;
        let columns: Vec<String> =
            stmt.column_names().iter().map(|c| (*c).to_owned()).collect();
        let mut rows =
            stmt.query(rusqlite::params_from_iter(params)).map_err(fail)?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(fail)? {
            let mut decoded = Row::new();
            for (i, column) in columns.iter().enumerate() {
                let cell = row.get_ref(i).map_err(fail)?;
                let _ = decoded.insert(column.clone(), from_sql(cell));
            }
            out.push(decoded);
        }
        Ok(out)
    }
}

impl std::fmt::Debug for RusqliteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RusqliteClient").finish_non_exhaustive()
    }
}

/// Placeholder client installed while the backing file is manipulated
/// directly.
struct Disconnected;

impl SqlClient for Disconnected {
    fn execute(
        &mut self,
        sql: &str,
        _params: &[Value],
    ) -> Result<u64, DbError> {
        Err(DbError::Statement {
            statement: sql.to_owned(),
            reason: "connection is closed".into(),
        })
    }

    fn query(
        &mut self,
        sql: &str,
        _params: &[Value],
    ) -> Result<Vec<Row>, DbError> {
        Err(DbError::Statement {
            statement: sql.to_owned(),
            reason: "connection is closed".into(),
        })
    }
}

/// File-backed SQLite driver.
///
/// [`cleanup()`] truncates the backing file to zero bytes and reopens the
/// connection, which is cheaper than statement-by-statement drops. The
/// first [`load()`] additionally caches a byte snapshot of the freshly
/// seeded file; subsequent loads restore the snapshot instead of re-running
/// the fixture script.
///
/// [`cleanup()`]: DbDriver::cleanup()
/// [`load()`]: DbDriver::load()
#[derive(Debug)]
pub struct Sqlite {
    /// Path of the backing database file.
    path: PathBuf,

    /// Byte snapshot of the file right after the first successful load.
    snapshot: Option<Vec<u8>>,

    /// Underlying generic driver.
    db: Db,
}

impl Sqlite {
    /// Opens (creating if absent) the database file at `path`.
    ///
    /// # Errors
    ///
    /// - [`DbError::UnsupportedDsn`] for in-memory databases: snapshotting
    ///   requires a backing file;
    /// - [`DbError::Connection`] if the file cannot be opened.
    pub fn connect(path: impl AsRef<Path>) -> Result<Self, DbError> {
        let path = path.as_ref().to_path_buf();
        if path.as_os_str().is_empty() || path == Path::new(":memory:") {
            return Err(DbError::UnsupportedDsn {
                dsn: format!("sqlite:{}", path.display()),
                reason: "a file-backed database is required".into(),
            });
        }
        let client = RusqliteClient::open(&path)?;
        Ok(Self {
            path,
            snapshot: None,
            db: Db::new(Box::new(client), Box::new(SqliteDialect)),
        })
    }

    /// Path of the backing database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Drops the live connection so the backing file can be replaced.
    fn disconnect(&mut self) {
        self.db.replace_client(Box::new(Disconnected));
    }

    /// Reopens the connection onto the backing file.
    fn reconnect(&mut self) -> Result<(), DbError> {
        let client = RusqliteClient::open(&self.path)?;
        self.db.replace_client(Box::new(client));
        Ok(())
    }

    /// Replaces the backing file contents, reconnecting on every exit path.
    fn replace_file(&mut self, contents: &[u8]) -> Result<(), DbError> {
        self.disconnect();
        let written =
            fs::write(&self.path, contents).map_err(DbError::from);
        let reconnected = self.reconnect();
        written.and(reconnected)
    }
}

impl DbDriver for Sqlite {
    fn load(&mut self, dump: &str) -> Result<(), DbError> {
        if let Some(snapshot) = self.snapshot.take() {
            tracing::debug!(
                path = %self.path.display(),
                "restoring post-load snapshot",
            );
            let restored = self.replace_file(&snapshot);
            self.snapshot = Some(snapshot);
            return restored;
        }

        self.db.load(dump)?;
        self.disconnect();
        let snapshot = fs::read(&self.path).map_err(DbError::from);
        let reconnected = self.reconnect();
        self.snapshot = Some(snapshot?);
        reconnected
    }

    fn cleanup(&mut self) -> Result<(), DbError> {
        tracing::debug!(path = %self.path.display(), "truncating database");
        self.replace_file(b"")
    }

    fn insert(&mut self, table: &str, row: &Row) -> Result<u64, DbError> {
        self.db.insert(table, row)
    }

    fn count(&mut self, table: &str, criteria: &Row) -> Result<u64, DbError> {
        self.db.count(table, criteria)
    }

    fn select_values(
        &mut self,
        column: &str,
        table: &str,
        criteria: &Row,
    ) -> Result<Vec<Value>, DbError> {
        self.db.select_values(column, table, criteria)
    }

    fn delete(&mut self, table: &str, criteria: &Row) -> Result<u64, DbError> {
        self.db.delete(table, criteria)
    }

    fn primary_key(&mut self, table: &str) -> Result<Vec<String>, DbError> {
        self.db.primary_key(table)
    }
}
