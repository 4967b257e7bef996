//! Catalog introspection.
//!
//! A [`CatalogReader`] is the read-only source of schema metadata: tables,
//! views, columns, foreign keys and check constraints. Analysis consumes it
//! without knowing which database sits behind it.

pub mod memory;

use crate::schema::Column;
use anyhow::Result;
use std::collections::BTreeMap;

/// Foreign key row as returned by the catalog, before nullability is resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyRow {
    pub table: String,
    pub column: String,
    pub referenced_table: String,
    pub referenced_column: String,
    pub constraint_name: String,
}

/// Check constraints keyed by table, then constraint name
pub type CheckConstraints = BTreeMap<String, BTreeMap<String, String>>;

/// Source of schema metadata.
pub trait CatalogReader {
    /// Base tables in catalog order
    fn list_tables(&self) -> Result<Vec<String>>;

    /// Views; listed for reporting, never populated
    fn list_views(&self) -> Result<Vec<String>>;

    /// Columns of a table in ordinal order
    fn list_columns(&self, table: &str) -> Result<Vec<Column>>;

    /// Every foreign key column of every table
    fn list_foreign_keys(&self) -> Result<Vec<ForeignKeyRow>>;

    /// Best-effort: backends without check constraint metadata return an error
    /// or an empty map, and neither stops analysis.
    fn list_check_constraints(&self) -> Result<CheckConstraints>;
}
