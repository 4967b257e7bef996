//! Post-population verification: row count thresholds per table.

use crate::storage::StorageWriter;
use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

/// Row count of one table below the threshold
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableShortfall {
    pub table: String,
    pub rows: u64,
}

/// Outcome of a verification pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct VerificationResult {
    pub success: bool,
    /// Tables with no rows at all
    pub empty_tables: Vec<String>,
    /// Tables with some rows but fewer than the minimum
    pub partially_populated_tables: Vec<TableShortfall>,
    pub min_records: u64,
}

/// Check that every table holds at least `min_records` rows.
///
/// A count query failure is an error: verification cannot vouch for a table
/// it could not read.
pub fn verify(
    storage: &dyn StorageWriter,
    tables: &[String],
    min_records: u64,
) -> Result<VerificationResult> {
    let mut result = VerificationResult {
        min_records,
        ..Default::default()
    };

    for table in tables {
        let rows = storage
            .count_rows(table)
            .with_context(|| format!("Failed to count rows in {}", table))?;

        if rows == 0 {
            warn!("Table {} is empty", table);
            result.empty_tables.push(table.clone());
        } else if rows < min_records {
            warn!(
                "Table {} has {} rows, expected at least {}",
                table, rows, min_records
            );
            result.partially_populated_tables.push(TableShortfall {
                table: table.clone(),
                rows,
            });
        }
    }

    result.success = result.empty_tables.is_empty() && result.partially_populated_tables.is_empty();
    if result.success {
        info!(
            "All {} tables have at least {} records",
            tables.len(),
            min_records
        );
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, Value};

    fn store_with(counts: &[(&str, i64)]) -> MemoryStore {
        let mut store = MemoryStore::new();
        for (table, n) in counts {
            let rows: Vec<Vec<Value>> = (0..*n).map(|i| vec![Value::Int(i)]).collect();
            store
                .insert_batch(table, &["id".to_string()], &rows)
                .unwrap();
        }
        store
    }

    #[test]
    fn test_all_tables_populated() {
        let store = store_with(&[("users", 10), ("posts", 10)]);
        let tables = vec!["users".to_string(), "posts".to_string()];
        let result = verify(&store, &tables, 5).unwrap();

        assert!(result.success);
        assert!(result.empty_tables.is_empty());
    }

    #[test]
    fn test_empty_and_partial_tables_reported() {
        let store = store_with(&[("users", 10), ("posts", 2)]);
        let tables = vec![
            "users".to_string(),
            "posts".to_string(),
            "comments".to_string(),
        ];
        let result = verify(&store, &tables, 5).unwrap();

        assert!(!result.success);
        assert_eq!(result.empty_tables, vec!["comments".to_string()]);
        assert_eq!(
            result.partially_populated_tables,
            vec![TableShortfall {
                table: "posts".to_string(),
                rows: 2
            }]
        );
    }

    #[test]
    fn test_zero_minimum_only_flags_empty_tables() {
        let store = store_with(&[("users", 1)]);
        let tables = vec!["users".to_string(), "tags".to_string()];
        let result = verify(&store, &tables, 0).unwrap();

        assert_eq!(result.empty_tables, vec!["tags".to_string()]);
        assert!(result.partially_populated_tables.is_empty());
    }
}
