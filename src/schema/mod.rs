//! Schema model and dependency analysis.
//!
//! This module provides:
//! - Data models for tables, columns, and foreign keys as read from a catalog
//! - Dependency graph construction with boolean reachability
//! - Many-to-many (junction table) classification
//! - Circular dependency detection
//! - Population ordering that respects foreign keys

mod analysis;
mod classify;
mod cycles;
mod graph;
mod order;

pub use analysis::*;
pub use classify::*;
pub use cycles::*;
pub use graph::*;
pub use order::*;

use ahash::AHashMap;
use serde::Serialize;
use std::fmt;

/// Unique identifier for a table within a schema (its catalog position)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(pub u32);

impl TableId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TableId({})", self.0)
    }
}

/// Role a column plays in the table's keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKey {
    #[default]
    None,
    /// Part of the primary key (`PRI`)
    Primary,
    /// Unique index (`UNI`)
    Unique,
    /// Non-unique index, usually a foreign key (`MUL`)
    Multiple,
}

/// Column definition as returned by catalog introspection
#[derive(Debug, Clone, Default, Serialize)]
pub struct Column {
    pub name: String,
    /// Declared data type (`varchar`, `INTEGER`, ...)
    pub data_type: String,
    /// Raw type string including length, precision, enum values, unsigned-ness
    pub column_type: String,
    pub char_max_length: Option<i64>,
    pub numeric_precision: Option<i64>,
    pub numeric_scale: Option<i64>,
    pub is_nullable: bool,
    pub key: ColumnKey,
    /// Extra flags such as `auto_increment`
    pub extra: String,
    pub comment: String,
}

impl Column {
    /// Create a column with a name and type; other attributes default
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        let data_type = data_type.into();
        Self {
            name: name.into(),
            column_type: data_type.clone(),
            data_type,
            ..Default::default()
        }
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.is_nullable = nullable;
        self
    }

    pub fn key(mut self, key: ColumnKey) -> Self {
        self.key = key;
        self
    }

    pub fn extra(mut self, extra: impl Into<String>) -> Self {
        self.extra = extra.into();
        self
    }

    pub fn column_type(mut self, column_type: impl Into<String>) -> Self {
        self.column_type = column_type.into();
        self
    }

    pub fn is_primary_key(&self) -> bool {
        self.key == ColumnKey::Primary
    }

    /// Whether the storage engine fills this column itself
    pub fn is_auto_generated(&self) -> bool {
        let extra = self.extra.to_ascii_lowercase();
        extra.contains("auto_increment")
            || extra.contains("virtual generated")
            || extra.contains("stored generated")
    }
}

/// Foreign key row: one owning column referencing one column of another table.
///
/// Composite keys appear as several rows sharing a constraint name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForeignKey {
    pub table: String,
    pub column: String,
    pub referenced_table: String,
    pub referenced_column: String,
    /// Nullability of the owning column
    pub is_nullable: bool,
    pub constraint_name: String,
}

impl ForeignKey {
    pub fn is_self_reference(&self) -> bool {
        self.table == self.referenced_table
    }

    /// Identity of the constraint this column belongs to.
    ///
    /// Columns of one composite key share it; an unnamed key stands alone.
    pub fn constraint_key(&self) -> &str {
        if self.constraint_name.is_empty() {
            &self.column
        } else {
            &self.constraint_name
        }
    }
}

/// Classification of a table for population purposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableCategory {
    /// No foreign keys
    Standalone,
    /// Has foreign keys, not part of a cycle
    Dependent,
    /// Junction table realising a many-to-many relationship
    ManyToMany,
    /// Part of a circular dependency
    Circular,
}

impl fmt::Display for TableCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableCategory::Standalone => write!(f, "Standalone"),
            TableCategory::Dependent => write!(f, "Dependent"),
            TableCategory::ManyToMany => write!(f, "Many-to-Many"),
            TableCategory::Circular => write!(f, "Circular"),
        }
    }
}

/// Complete table definition
#[derive(Debug, Clone)]
pub struct TableSchema {
    pub name: String,
    pub id: TableId,
    /// Column definitions in ordinal order
    pub columns: Vec<Column>,
    /// Outgoing foreign keys, including ones whose target is not in the schema
    pub foreign_keys: Vec<ForeignKey>,
    /// Check constraints by name (best-effort)
    pub check_constraints: Vec<(String, String)>,
}

impl TableSchema {
    pub fn new(name: String, id: TableId) -> Self {
        Self {
            name,
            id,
            columns: Vec::new(),
            foreign_keys: Vec::new(),
            check_constraints: Vec::new(),
        }
    }

    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// First primary-key column, used to address rows for updates
    pub fn primary_key_column(&self) -> Option<&Column> {
        self.columns.iter().find(|c| c.is_primary_key())
    }

    pub fn primary_key_count(&self) -> usize {
        self.columns.iter().filter(|c| c.is_primary_key()).count()
    }

    /// Columns the populator must supply values for
    pub fn insertable_columns(&self) -> Vec<&Column> {
        self.columns
            .iter()
            .filter(|c| !c.is_auto_generated())
            .collect()
    }

    pub fn has_foreign_keys(&self) -> bool {
        !self.foreign_keys.is_empty()
    }
}

/// Complete database schema
#[derive(Debug, Default)]
pub struct Schema {
    /// Map from table name to table ID
    pub tables: AHashMap<String, TableId>,
    /// Table schemas indexed by TableId, in catalog order
    pub table_schemas: Vec<TableSchema>,
    /// Views are listed for reporting only and never populated
    pub views: Vec<String>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_table_id(&self, name: &str) -> Option<TableId> {
        self.tables.get(name).copied()
    }

    pub fn table(&self, id: TableId) -> Option<&TableSchema> {
        self.table_schemas.get(id.index())
    }

    pub fn get_table(&self, name: &str) -> Option<&TableSchema> {
        self.get_table_id(name).and_then(|id| self.table(id))
    }

    pub fn table_name(&self, id: TableId) -> &str {
        &self.table_schemas[id.index()].name
    }

    /// Add a new table, returning its ID
    pub fn add_table(&mut self, name: impl Into<String>, columns: Vec<Column>) -> TableId {
        let id = TableId(self.table_schemas.len() as u32);
        let mut table = TableSchema::new(name.into(), id);
        table.columns = columns;
        self.tables.insert(table.name.clone(), id);
        self.table_schemas.push(table);
        id
    }

    /// Attach a foreign key row to its owning table.
    ///
    /// Nullability is resolved from the owning column; an unknown column is
    /// treated as NOT NULL. Rows whose owning table is unknown are dropped.
    pub fn add_foreign_key(
        &mut self,
        table: &str,
        column: &str,
        referenced_table: &str,
        referenced_column: &str,
        constraint_name: &str,
    ) -> bool {
        let Some(id) = self.get_table_id(table) else {
            return false;
        };
        let owner = &mut self.table_schemas[id.index()];
        let is_nullable = owner
            .get_column(column)
            .map(|c| c.is_nullable)
            .unwrap_or(false);
        owner.foreign_keys.push(ForeignKey {
            table: table.to_string(),
            column: column.to_string(),
            referenced_table: referenced_table.to_string(),
            referenced_column: referenced_column.to_string(),
            is_nullable,
            constraint_name: constraint_name.to_string(),
        });
        true
    }

    pub fn len(&self) -> usize {
        self.table_schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table_schemas.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TableSchema> {
        self.table_schemas.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = TableId> {
        (0..self.table_schemas.len() as u32).map(TableId)
    }

    /// Table names in catalog order
    pub fn table_names(&self) -> Vec<String> {
        self.iter().map(|t| t.name.clone()).collect()
    }
}
