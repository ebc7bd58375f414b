// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Oracle-like [`Dialect`].

use serde_json::Value;

use super::{
    dialect::{first_column_strings, Dialect},
    DbError, SqlClient,
};

/// PL/SQL block dropping the schema's triggers, tables and sequences.
///
/// Triggers go first so that table drops don't fire them; `CASCADE
/// CONSTRAINTS` unties foreign keys between tables.
const DROP_ALL_OBJECTS: &str = "\
BEGIN\n\
    FOR i IN (SELECT trigger_name FROM user_triggers) LOOP\n\
        EXECUTE IMMEDIATE('DROP TRIGGER ' || i.trigger_name);\n\
    END LOOP;\n\
    FOR i IN (SELECT table_name FROM user_tables) LOOP\n\
        EXECUTE IMMEDIATE('DROP TABLE ' || i.table_name || ' CASCADE CONSTRAINTS');\n\
    END LOOP;\n\
    FOR i IN (SELECT sequence_name FROM user_sequences) LOOP\n\
        EXECUTE IMMEDIATE('DROP SEQUENCE ' || i.sequence_name);\n\
    END LOOP;\n\
END;";

/// Oracle-like [`Dialect`]: `:n` placeholders and cursor-based PL/SQL
/// cleanup covering triggers and sequences besides tables.
#[derive(Clone, Copy, Debug, Default)]
pub struct Oracle;

impl Dialect for Oracle {
    fn name(&self) -> &'static str {
        "oci"
    }

    fn placeholder(&self, index: usize) -> String {
        format!(":{index}")
    }

    fn cleanup(&self, client: &mut dyn SqlClient) -> Result<(), DbError> {
        client.execute(DROP_ALL_OBJECTS, &[]).map(drop)
    }

    fn primary_key(
        &self,
        client: &mut dyn SqlClient,
        table: &str,
    ) -> Result<Vec<String>, DbError> {
        let rows = client.query(
            "SELECT cols.column_name FROM all_constraints cons \
             JOIN all_cons_columns cols \
             ON cons.constraint_name = cols.constraint_name \
             WHERE cons.constraint_type = 'P' \
             AND cols.table_name = :1 \
             ORDER BY cols.position",
            &[Value::String(table.to_owned())],
        )?;
        Ok(first_column_strings(rows))
    }
}

#[cfg(test)]
mod tests {
    use crate::db::{testing::RecordingClient, Dialect as _};

    use super::Oracle;

    #[test]
    fn cleanup_drops_triggers_tables_and_sequences() {
        let mut client = RecordingClient::default();

        Oracle.cleanup(&mut client).unwrap();

        assert_eq!(client.executed.len(), 1);
        let block = &client.executed[0];
        let triggers = block.find("DROP TRIGGER").unwrap();
        let tables = block.find("DROP TABLE").unwrap();
        let sequences = block.find("DROP SEQUENCE").unwrap();
        assert!(triggers < tables && tables < sequences);
        assert!(block.contains("CASCADE CONSTRAINTS"));
    }
}
