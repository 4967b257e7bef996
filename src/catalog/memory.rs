//! In-memory catalog assembled programmatically.

use super::{CatalogReader, CheckConstraints, ForeignKeyRow};
use crate::schema::Column;
use anyhow::{bail, Result};

/// Catalog held in memory, built table by table.
///
/// Useful for tests and for embedding the analysis in tools that already
/// know their schema.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    tables: Vec<(String, Vec<Column>)>,
    views: Vec<String>,
    foreign_keys: Vec<ForeignKeyRow>,
    checks: CheckConstraints,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table with its columns (builder style)
    pub fn table(mut self, name: &str, columns: Vec<Column>) -> Self {
        self.tables.push((name.to_string(), columns));
        self
    }

    pub fn view(mut self, name: &str) -> Self {
        self.views.push(name.to_string());
        self
    }

    /// Add a single-column foreign key `table.column -> referenced_table.referenced_column`
    pub fn foreign_key(
        mut self,
        table: &str,
        column: &str,
        referenced_table: &str,
        referenced_column: &str,
    ) -> Self {
        let constraint_name = format!("fk_{table}_{column}");
        self.foreign_keys.push(ForeignKeyRow {
            table: table.to_string(),
            column: column.to_string(),
            referenced_table: referenced_table.to_string(),
            referenced_column: referenced_column.to_string(),
            constraint_name,
        });
        self
    }

    /// Add a foreign key row with an explicit constraint name
    pub fn foreign_key_row(mut self, row: ForeignKeyRow) -> Self {
        self.foreign_keys.push(row);
        self
    }

    pub fn check(mut self, table: &str, name: &str, expression: &str) -> Self {
        self.checks
            .entry(table.to_string())
            .or_default()
            .insert(name.to_string(), expression.to_string());
        self
    }
}

impl CatalogReader for MemoryCatalog {
    fn list_tables(&self) -> Result<Vec<String>> {
        Ok(self.tables.iter().map(|(name, _)| name.clone()).collect())
    }

    fn list_views(&self) -> Result<Vec<String>> {
        Ok(self.views.clone())
    }

    fn list_columns(&self, table: &str) -> Result<Vec<Column>> {
        match self.tables.iter().find(|(name, _)| name == table) {
            Some((_, columns)) => Ok(columns.clone()),
            None => bail!("unknown table: {}", table),
        }
    }

    fn list_foreign_keys(&self) -> Result<Vec<ForeignKeyRow>> {
        Ok(self.foreign_keys.clone())
    }

    fn list_check_constraints(&self) -> Result<CheckConstraints> {
        Ok(self.checks.clone())
    }
}
