//! In-memory storage used for dry runs and tests.

use super::{StorageWriter, Value};
use ahash::{AHashMap, AHashSet};
use anyhow::{bail, Result};

#[derive(Debug, Clone, Default)]
struct MemoryTable {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl MemoryTable {
    fn column_index(&mut self, name: &str) -> usize {
        match self.columns.iter().position(|c| c == name) {
            Some(idx) => idx,
            None => {
                self.columns.push(name.to_string());
                for row in &mut self.rows {
                    row.push(Value::Null);
                }
                self.columns.len() - 1
            }
        }
    }
}

/// Storage that keeps every inserted row in memory.
///
/// Tables are created on first insert. Inserts into tables marked with
/// [`MemoryStore::fail_inserts`] return an error, which lets callers exercise
/// their failure paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: AHashMap<String, MemoryTable>,
    failing_inserts: AHashSet<String>,
    failing_updates: AHashSet<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every insert into `table` fail
    pub fn fail_inserts(mut self, table: &str) -> Self {
        self.failing_inserts.insert(table.to_string());
        self
    }

    /// Make every update on `table` fail
    pub fn fail_updates(mut self, table: &str) -> Self {
        self.failing_updates.insert(table.to_string());
        self
    }

    /// Rows of a table as column name to value maps, in insertion order
    pub fn rows(&self, table: &str) -> Vec<AHashMap<String, Value>> {
        let Some(t) = self.tables.get(table) else {
            return Vec::new();
        };
        t.rows
            .iter()
            .map(|row| {
                t.columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect()
            })
            .collect()
    }

    /// Every value stored in one column of a table
    pub fn column_values(&self, table: &str, column: &str) -> Vec<Value> {
        let Some(t) = self.tables.get(table) else {
            return Vec::new();
        };
        match t.columns.iter().position(|c| c == column) {
            Some(idx) => t.rows.iter().map(|row| row[idx].clone()).collect(),
            None => Vec::new(),
        }
    }
}

impl StorageWriter for MemoryStore {
    fn insert_batch(
        &mut self,
        table: &str,
        columns: &[String],
        rows: &[Vec<Value>],
    ) -> Result<usize> {
        if self.failing_inserts.contains(table) {
            bail!("insert into {} rejected", table);
        }
        if let Some(bad) = rows.iter().find(|row| row.len() != columns.len()) {
            bail!(
                "row has {} values but {} columns were given for {}",
                bad.len(),
                columns.len(),
                table
            );
        }

        let t = self.tables.entry(table.to_string()).or_default();
        let indices: Vec<usize> = columns.iter().map(|c| t.column_index(c)).collect();
        for row in rows {
            let mut stored = vec![Value::Null; t.columns.len()];
            for (value, &idx) in row.iter().zip(&indices) {
                stored[idx] = value.clone();
            }
            t.rows.push(stored);
        }
        Ok(rows.len())
    }

    fn update_columns(
        &mut self,
        table: &str,
        pk_column: &str,
        pk_value: &Value,
        assignments: &[(String, Value)],
    ) -> Result<()> {
        if self.failing_updates.contains(table) {
            bail!("update on {} rejected", table);
        }
        let Some(t) = self.tables.get_mut(table) else {
            bail!("table {} does not exist", table);
        };
        let Some(pk_idx) = t.columns.iter().position(|c| c == pk_column) else {
            bail!("column {}.{} does not exist", table, pk_column);
        };
        let Some(row_idx) = t.rows.iter().position(|row| &row[pk_idx] == pk_value) else {
            bail!("no row in {} with {} = {}", table, pk_column, pk_value);
        };

        for (column, value) in assignments {
            let idx = t.column_index(column);
            t.rows[row_idx][idx] = value.clone();
        }
        Ok(())
    }

    fn count_rows(&self, table: &str) -> Result<u64> {
        Ok(self.tables.get(table).map_or(0, |t| t.rows.len() as u64))
    }
}
