//! Storage writes.
//!
//! The populator only ever talks to storage through [`StorageWriter`]: batched
//! inserts, targeted updates keyed by primary key, and row counts.

mod memory;

pub use memory::MemoryStore;

use ahash::AHashMap;
use anyhow::Result;
use serde::Serialize;
use std::fmt;

/// A single generated cell value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    /// Text, including dates, times and JSON rendered as strings
    Text(String),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::UInt(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", x),
            Value::Text(s) => write!(f, "'{}'", s),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// A generated row as column name to value
pub type Record = AHashMap<String, Value>;

/// Write side of the storage collaborator.
pub trait StorageWriter {
    /// Insert rows atomically; either every row lands or none does.
    ///
    /// Returns the number of rows written.
    fn insert_batch(&mut self, table: &str, columns: &[String], rows: &[Vec<Value>])
        -> Result<usize>;

    /// Apply every `(column, value)` assignment to the row whose `pk_column`
    /// equals `pk_value`, as a single statement
    fn update_columns(
        &mut self,
        table: &str,
        pk_column: &str,
        pk_value: &Value,
        assignments: &[(String, Value)],
    ) -> Result<()>;

    fn count_rows(&self, table: &str) -> Result<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Null.to_string(), "NULL");
        assert_eq!(Value::Int(-3).to_string(), "-3");
        assert_eq!(Value::from("abc").to_string(), "'abc'");
        assert_eq!(Value::Bytes(vec![1, 2]).to_string(), "<2 bytes>");
    }

    #[test]
    fn test_value_serializes_untagged() {
        let json = serde_json::to_string(&vec![Value::Null, Value::Int(1), Value::from("x")]).unwrap();
        assert_eq!(json, r#"[null,1,"x"]"#);
    }
}
