//! Embedded DuckDB backend.
//!
//! [`DuckDb`] is both the catalog source and the storage writer for a
//! population run:
//!
//! - **Catalog**: tables, views, columns and constraints from DuckDB's
//!   `duckdb_tables()`, `duckdb_views()`, `duckdb_columns()` and
//!   `duckdb_constraints()` table functions
//! - **Storage**: one transaction per insert batch, targeted updates keyed by
//!   primary key, and row counts
//!
//! # Example
//!
//! ```ignore
//! use sql_populator::duckdb::DuckDb;
//! use sql_populator::schema::analyze;
//!
//! let db = DuckDb::open(Path::new("app.duckdb"))?;
//! let analysis = analyze(&db)?;
//! println!("{:?}", analysis.ordered_tables());
//! ```

mod catalog;
mod writer;

use anyhow::{Context, Result};
use duckdb::Connection;
use std::path::Path;

/// Schema that holds the application tables unless told otherwise
pub const DEFAULT_SCHEMA: &str = "main";

/// A DuckDB database opened for analysis and population
pub struct DuckDb {
    conn: Connection,
    schema: String,
}

impl DuckDb {
    /// Open (or create) a database file
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open DuckDB database: {}", path.display()))?;
        Ok(Self {
            conn,
            schema: DEFAULT_SCHEMA.to_string(),
        })
    }

    /// Open a transient in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to create in-memory DuckDB database")?;
        Ok(Self {
            conn,
            schema: DEFAULT_SCHEMA.to_string(),
        })
    }

    /// Introspect and populate a different schema
    pub fn with_schema(mut self, schema: &str) -> Self {
        self.schema = schema.to_string();
        self
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Run one or more statements that return no rows (e.g. DDL)
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn
            .execute_batch(sql)
            .with_context(|| format!("Failed to execute: {}", sql))
    }

    /// Get the underlying DuckDB connection (for advanced use)
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Schema-qualified, quoted table reference
    fn qualified(&self, table: &str) -> String {
        format!("{}.{}", quote_ident(&self.schema), quote_ident(table))
    }
}

/// Quote an identifier for DuckDB
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("users"), "\"users\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_open_in_memory() {
        let db = DuckDb::open_in_memory().unwrap();
        db.execute_batch("CREATE TABLE t (id INTEGER)").unwrap();
        assert_eq!(db.schema(), DEFAULT_SCHEMA);
        assert_eq!(db.qualified("t"), "\"main\".\"t\"");
    }
}
