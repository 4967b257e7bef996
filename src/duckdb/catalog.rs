//! Catalog introspection through DuckDB's metadata table functions.

use super::DuckDb;
use crate::catalog::{CatalogReader, CheckConstraints, ForeignKeyRow};
use crate::schema::{Column, ColumnKey};
use ahash::AHashMap;
use anyhow::{bail, Context, Result};
use duckdb::params;

impl DuckDb {
    /// Key role per column from PRIMARY KEY and single-column UNIQUE constraints
    fn column_keys(&self, table: &str) -> Result<AHashMap<String, ColumnKey>> {
        let sql = "SELECT constraint_type, unnest(constraint_column_names) \
                   FROM duckdb_constraints() \
                   WHERE schema_name = ? AND table_name = ? \
                   AND (constraint_type = 'PRIMARY KEY' \
                        OR (constraint_type = 'UNIQUE' AND len(constraint_column_names) = 1))";
        let mut stmt = self
            .conn
            .prepare(sql)
            .context("Failed to prepare key constraint query")?;
        let rows = stmt
            .query_map(params![self.schema, table], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .with_context(|| format!("Failed to read key constraints for {}", table))?;

        let mut keys = AHashMap::new();
        for row in rows {
            let (kind, column) = row?;
            let key = if kind == "PRIMARY KEY" {
                ColumnKey::Primary
            } else {
                ColumnKey::Unique
            };
            // Primary wins when a column is also declared unique
            let entry = keys.entry(column).or_insert(key);
            if key == ColumnKey::Primary {
                *entry = key;
            }
        }
        Ok(keys)
    }

    /// Columns that take part in some foreign key
    fn foreign_key_columns(&self, table: &str) -> Result<Vec<String>> {
        let sql = "SELECT DISTINCT unnest(constraint_column_names) \
                   FROM duckdb_constraints() \
                   WHERE schema_name = ? AND table_name = ? AND constraint_type = 'FOREIGN KEY'";
        let mut stmt = self
            .conn
            .prepare(sql)
            .context("Failed to prepare foreign key column query")?;
        let rows = stmt.query_map(params![self.schema, table], |row| row.get::<_, String>(0))?;
        Ok(rows.collect::<duckdb::Result<Vec<_>>>()?)
    }

    fn list_names(&self, sql: &str, what: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .with_context(|| format!("Failed to prepare {} query", what))?;
        let rows = stmt
            .query_map(params![self.schema], |row| row.get::<_, String>(0))
            .with_context(|| format!("Failed to list {}", what))?;
        Ok(rows.collect::<duckdb::Result<Vec<_>>>()?)
    }
}

impl CatalogReader for DuckDb {
    fn list_tables(&self) -> Result<Vec<String>> {
        self.list_names(
            "SELECT table_name FROM duckdb_tables() \
             WHERE schema_name = ? AND NOT temporary ORDER BY table_name",
            "tables",
        )
    }

    fn list_views(&self) -> Result<Vec<String>> {
        self.list_names(
            "SELECT view_name FROM duckdb_views() \
             WHERE schema_name = ? AND NOT internal ORDER BY view_name",
            "views",
        )
    }

    fn list_columns(&self, table: &str) -> Result<Vec<Column>> {
        let keys = self.column_keys(table)?;
        let fk_columns = self.foreign_key_columns(table)?;

        let sql = "SELECT column_name, data_type, column_default, is_nullable, \
                   character_maximum_length, numeric_precision, numeric_scale, comment \
                   FROM duckdb_columns() \
                   WHERE schema_name = ? AND table_name = ? \
                   ORDER BY column_index";
        let mut stmt = self
            .conn
            .prepare(sql)
            .context("Failed to prepare column query")?;
        let rows = stmt
            .query_map(params![self.schema, table], |row| {
                let name: String = row.get(0)?;
                let data_type: String = row.get(1)?;
                let default: Option<String> = row.get(2)?;
                let is_nullable: bool = row.get(3)?;
                let char_max_length: Option<i64> = row.get(4)?;
                let numeric_precision: Option<i64> = row.get(5)?;
                let numeric_scale: Option<i64> = row.get(6)?;
                let comment: Option<String> = row.get(7)?;

                let is_sequence = default
                    .as_deref()
                    .is_some_and(|d| d.trim_start().to_ascii_lowercase().starts_with("nextval("));

                Ok(Column {
                    column_type: data_type.clone(),
                    data_type,
                    char_max_length,
                    numeric_precision,
                    numeric_scale,
                    is_nullable,
                    extra: if is_sequence {
                        "auto_increment".to_string()
                    } else {
                        String::new()
                    },
                    comment: comment.unwrap_or_default(),
                    key: keys.get(&name).copied().unwrap_or_else(|| {
                        if fk_columns.contains(&name) {
                            ColumnKey::Multiple
                        } else {
                            ColumnKey::None
                        }
                    }),
                    name,
                })
            })
            .with_context(|| format!("Failed to read columns for {}", table))?;

        let columns = rows.collect::<duckdb::Result<Vec<_>>>()?;
        if columns.is_empty() {
            bail!("Table {} not found in schema {}", table, self.schema);
        }
        Ok(columns)
    }

    fn list_foreign_keys(&self) -> Result<Vec<ForeignKeyRow>> {
        let sql = "SELECT table_name, \
                          unnest(constraint_column_names), \
                          referenced_table, \
                          unnest(referenced_column_names), \
                          constraint_name \
                   FROM duckdb_constraints() \
                   WHERE schema_name = ? AND constraint_type = 'FOREIGN KEY' \
                   ORDER BY table_name, constraint_index";
        let mut stmt = self
            .conn
            .prepare(sql)
            .context("Failed to prepare foreign key query")?;
        let rows = stmt
            .query_map(params![self.schema], |row| {
                Ok(ForeignKeyRow {
                    table: row.get(0)?,
                    column: row.get(1)?,
                    referenced_table: row.get(2)?,
                    referenced_column: row.get(3)?,
                    constraint_name: row.get(4)?,
                })
            })
            .context("Failed to list foreign keys")?;
        Ok(rows.collect::<duckdb::Result<Vec<_>>>()?)
    }

    fn list_check_constraints(&self) -> Result<CheckConstraints> {
        let sql = "SELECT table_name, constraint_name, constraint_text \
                   FROM duckdb_constraints() \
                   WHERE schema_name = ? AND constraint_type = 'CHECK'";
        let mut stmt = self
            .conn
            .prepare(sql)
            .context("Failed to prepare check constraint query")?;
        let rows = stmt
            .query_map(params![self.schema], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .context("Failed to list check constraints")?;

        let mut checks = CheckConstraints::new();
        for row in rows {
            let (table, name, expression) = row?;
            checks.entry(table).or_default().insert(name, expression);
        }
        Ok(checks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> DuckDb {
        let db = DuckDb::open_in_memory().unwrap();
        db.execute_batch(
            "CREATE SEQUENCE users_seq;
             CREATE TABLE users (
                 id INTEGER PRIMARY KEY DEFAULT nextval('users_seq'),
                 email VARCHAR UNIQUE NOT NULL,
                 nickname VARCHAR
             );
             CREATE TABLE posts (
                 id INTEGER PRIMARY KEY,
                 user_id INTEGER NOT NULL REFERENCES users(id),
                 score INTEGER CHECK (score >= 0)
             );
             CREATE VIEW user_emails AS SELECT email FROM users;",
        )
        .unwrap();
        db
    }

    #[test]
    fn test_tables_and_views() {
        let db = db();
        assert_eq!(db.list_tables().unwrap(), vec!["posts", "users"]);
        assert_eq!(db.list_views().unwrap(), vec!["user_emails"]);
    }

    #[test]
    fn test_columns() {
        let db = db();
        let columns = db.list_columns("users").unwrap();
        let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "email", "nickname"]);

        assert!(columns[0].is_primary_key());
        assert!(columns[0].is_auto_generated());
        assert_eq!(columns[1].key, ColumnKey::Unique);
        assert!(!columns[1].is_nullable);
        assert!(columns[2].is_nullable);

        let posts = db.list_columns("posts").unwrap();
        assert_eq!(posts[1].key, ColumnKey::Multiple);
    }

    #[test]
    fn test_unknown_table_is_an_error() {
        assert!(db().list_columns("missing").is_err());
    }

    #[test]
    fn test_foreign_keys() {
        let fks = db().list_foreign_keys().unwrap();
        assert_eq!(fks.len(), 1);
        assert_eq!(fks[0].table, "posts");
        assert_eq!(fks[0].column, "user_id");
        assert_eq!(fks[0].referenced_table, "users");
        assert_eq!(fks[0].referenced_column, "id");
    }

    #[test]
    fn test_check_constraints() {
        let checks = db().list_check_constraints().unwrap();
        let posts = checks.get("posts").unwrap();
        assert_eq!(posts.len(), 1);
        assert!(posts.values().next().unwrap().contains("score"));
    }
}
