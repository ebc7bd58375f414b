// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Postgres-like [`Dialect`].

use serde_json::Value;

use super::{
    dialect::{first_column_strings, Dialect},
    DbError, SqlClient,
};

/// Postgres-like [`Dialect`]: `$n` placeholders and cleanup enumerating
/// tables, sequences and enum types through the catalogs, dropped with
/// `CASCADE`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Postgres;

impl Dialect for Postgres {
    fn name(&self) -> &'static str {
        "pgsql"
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${index}")
    }

    fn cleanup(&self, client: &mut dyn SqlClient) -> Result<(), DbError> {
        let tables = first_column_strings(client.query(
            "SELECT table_name FROM information_schema.tables \
             WHERE table_schema = 'public' \
             AND table_type = 'BASE TABLE'",
            &[],
        )?);
        for table in tables {
            let _ = client.execute(
                &format!(
                    "DROP TABLE IF EXISTS {} CASCADE",
                    self.quote(&table),
                ),
                &[],
            )?;
        }

        let sequences = first_column_strings(client.query(
            "SELECT relname FROM pg_class WHERE relkind = 'S'",
            &[],
        )?);
        for sequence in sequences {
            let _ = client.execute(
                &format!(
                    "DROP SEQUENCE IF EXISTS {} CASCADE",
                    self.quote(&sequence),
                ),
                &[],
            )?;
        }

        let types = first_column_strings(client.query(
            "SELECT t.typname FROM pg_type t \
             JOIN pg_namespace n ON n.oid = t.typnamespace \
             WHERE t.typtype = 'e' AND n.nspname = 'public'",
            &[],
        )?);
        for ty in types {
            let _ = client.execute(
                &format!("DROP TYPE IF EXISTS {} CASCADE", self.quote(&ty)),
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
            "SELECT a.attname FROM pg_index i \
             JOIN pg_attribute a \
             ON a.attrelid = i.indrelid AND a.attnum = ANY(i.indkey) \
             WHERE i.indrelid = $1::regclass AND i.indisprimary",
            &[Value::String(table.to_owned())],
        )?;
        Ok(first_column_strings(rows))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::db::{testing::RecordingClient, Dialect as _, Row};

    use super::Postgres;

    fn name_row(key: &str, name: &str) -> Row {
        let mut row = Row::new();
        let _ = row.insert(key.into(), json!(name));
        row
    }

    #[test]
    fn cleanup_drops_tables_sequences_and_enum_types() {
        let mut client = RecordingClient::with_results([
            vec![name_row("table_name", "users")],
            vec![name_row("relname", "users_id_seq")],
            vec![name_row("typname", "mood")],
        ]);

        Postgres.cleanup(&mut client).unwrap();

        let drops: Vec<_> = client
            .executed
            .iter()
            .filter(|sql| sql.starts_with("DROP"))
            .collect();
        assert_eq!(
            drops,
            [
                "DROP TABLE IF EXISTS \"users\" CASCADE",
                "DROP SEQUENCE IF EXISTS \"users_id_seq\" CASCADE",
                "DROP TYPE IF EXISTS \"mood\" CASCADE",
            ],
        );
    }

    #[test]
    fn placeholders_are_numbered() {
        use crate::db::Dialect as _;

        assert_eq!(Postgres.placeholder(1), "$1");
        assert_eq!(Postgres.placeholder(3), "$3");
    }
}
