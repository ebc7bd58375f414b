// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! SQL-Server-like [`Dialect`].

use serde_json::Value;

use super::{
    dialect::{first_column_strings, Dialect},
    DbError, SqlClient,
};

/// T-SQL batch dropping every base table through a cursor.
///
/// SQL Server has no single "drop all" primitive, so enumeration and drop
/// run server-side in one round trip.
const DROP_ALL_TABLES: &str = "\
DECLARE @stmt NVARCHAR(MAX);\n\
DECLARE tables_cursor CURSOR FOR \
SELECT 'DROP TABLE [' + table_name + ']' \
FROM information_schema.tables WHERE table_type = 'BASE TABLE';\n\
OPEN tables_cursor;\n\
FETCH NEXT FROM tables_cursor INTO @stmt;\n\
WHILE @@FETCH_STATUS = 0\n\
BEGIN\n\
    EXEC(@stmt);\n\
    FETCH NEXT FROM tables_cursor INTO @stmt;\n\
END;\n\
CLOSE tables_cursor;\n\
DEALLOCATE tables_cursor;";

/// SQL-Server-like [`Dialect`]: bracket quoting and cursor-based cleanup.
#[derive(Clone, Copy, Debug, Default)]
pub struct SqlServer;

impl Dialect for SqlServer {
    fn name(&self) -> &'static str {
        "sqlsrv"
    }

    fn quote(&self, ident: &str) -> String {
        format!("[{ident}]")
    }

    fn cleanup(&self, client: &mut dyn SqlClient) -> Result<(), DbError> {
        client.execute(DROP_ALL_TABLES, &[]).map(drop)
    }

    fn primary_key(
        &self,
        client: &mut dyn SqlClient,
        table: &str,
    ) -> Result<Vec<String>, DbError> {
        let rows = client.query(
            "SELECT kcu.column_name \
             FROM information_schema.table_constraints tc \
             JOIN information_schema.key_column_usage kcu \
             ON kcu.constraint_name = tc.constraint_name \
             WHERE tc.constraint_type = 'PRIMARY KEY' \
             AND tc.table_name = ? \
             ORDER BY kcu.ordinal_position",
            &[Value::String(table.to_owned())],
        )?;
        Ok(first_column_strings(rows))
    }
}

#[cfg(test)]
mod tests {
    use crate::db::{testing::RecordingClient, Dialect as _};

    use super::SqlServer;

    #[test]
    fn cleanup_runs_one_cursor_batch() {
        let mut client = RecordingClient::default();

        SqlServer.cleanup(&mut client).unwrap();

        assert_eq!(client.executed.len(), 1);
        let batch = &client.executed[0];
        assert!(batch.contains("DECLARE tables_cursor CURSOR"));
        assert!(batch.contains("@@FETCH_STATUS"));
        assert!(batch.contains("DEALLOCATE tables_cursor"));
    }

    #[test]
    fn quoting_uses_brackets() {
        assert_eq!(SqlServer.quote("users"), "[users]");
    }
}
