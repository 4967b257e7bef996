//! Storage writes against DuckDB.

use super::{quote_ident, DuckDb};
use crate::storage::{StorageWriter, Value};
use anyhow::{Context, Result};
use duckdb::types::Value as DuckValue;
use duckdb::params_from_iter;

/// Convert a generated value into a DuckDB parameter value
pub fn to_duckdb_value(value: &Value) -> DuckValue {
    match value {
        Value::Null => DuckValue::Null,
        Value::Bool(b) => DuckValue::Boolean(*b),
        Value::Int(n) => DuckValue::BigInt(*n),
        Value::UInt(n) => DuckValue::UBigInt(*n),
        Value::Float(x) => DuckValue::Double(*x),
        Value::Text(s) => DuckValue::Text(s.clone()),
        Value::Bytes(b) => DuckValue::Blob(b.clone()),
    }
}

/// Build `INSERT INTO "schema"."table" ("a", "b") VALUES (?, ?)`
fn insert_sql(table: &str, columns: &[String]) -> String {
    let column_list = columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = vec!["?"; columns.len()].join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table, column_list, placeholders
    )
}

/// Build `UPDATE "schema"."table" SET "a" = ?, "b" = ? WHERE "pk" = ?`
fn update_sql(table: &str, pk_column: &str, assignments: &[(String, Value)]) -> String {
    let set_list = assignments
        .iter()
        .map(|(column, _)| format!("{} = ?", quote_ident(column)))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "UPDATE {} SET {} WHERE {} = ?",
        table,
        set_list,
        quote_ident(pk_column)
    )
}

impl StorageWriter for DuckDb {
    fn insert_batch(
        &mut self,
        table: &str,
        columns: &[String],
        rows: &[Vec<Value>],
    ) -> Result<usize> {
        if rows.is_empty() {
            return Ok(0);
        }
        let sql = insert_sql(&self.qualified(table), columns);

        // Dropping the transaction without commit rolls the whole batch back
        let tx = self
            .conn
            .transaction()
            .context("Failed to begin insert transaction")?;
        {
            let mut stmt = tx
                .prepare(&sql)
                .with_context(|| format!("Failed to prepare insert into {}", table))?;
            for row in rows {
                let params: Vec<DuckValue> = row.iter().map(to_duckdb_value).collect();
                stmt.execute(params_from_iter(params.iter()))
                    .with_context(|| format!("Failed to insert row into {}", table))?;
            }
        }
        tx.commit()
            .with_context(|| format!("Failed to commit batch into {}", table))?;

        Ok(rows.len())
    }

    fn update_columns(
        &mut self,
        table: &str,
        pk_column: &str,
        pk_value: &Value,
        assignments: &[(String, Value)],
    ) -> Result<()> {
        if assignments.is_empty() {
            return Ok(());
        }
        let sql = update_sql(&self.qualified(table), pk_column, assignments);
        let params: Vec<DuckValue> = assignments
            .iter()
            .map(|(_, value)| to_duckdb_value(value))
            .chain(std::iter::once(to_duckdb_value(pk_value)))
            .collect();

        self.conn
            .execute(&sql, params_from_iter(params.iter()))
            .with_context(|| format!("Failed to update {} where {} = {}", table, pk_column, pk_value))?;
        Ok(())
    }

    fn count_rows(&self, table: &str) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.qualified(table));
        let count: i64 = self
            .conn
            .query_row(&sql, [], |row| row.get(0))
            .with_context(|| format!("Failed to count rows in {}", table))?;
        Ok(count.max(0) as u64)
    }
}
