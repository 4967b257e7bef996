//! Records inserted during one population run.

use crate::storage::{Record, Value};
use ahash::AHashMap;
use rand::{Rng, RngExt};

/// Per-table list of inserted rows, in insertion order.
///
/// Supplies foreign key values to dependent tables and peer values to the
/// circular backfill. Lives only as long as one run.
#[derive(Debug, Default)]
pub struct RecordCache {
    tables: AHashMap<String, Vec<Record>>,
}

impl RecordCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self, table: &str) -> &[Record] {
        self.tables
            .get(table)
            .map(|r| r.as_slice())
            .unwrap_or(&[])
    }

    pub fn len(&self, table: &str) -> usize {
        self.records(table).len()
    }

    pub fn is_empty(&self, table: &str) -> bool {
        self.len(table) == 0
    }

    pub fn extend(&mut self, table: &str, records: impl IntoIterator<Item = Record>) {
        self.tables
            .entry(table.to_string())
            .or_default()
            .extend(records);
    }

    /// Value of `column` in the record at `index`, if present and not null
    pub fn value(&self, table: &str, index: usize, column: &str) -> Option<&Value> {
        self.records(table)
            .get(index)
            .and_then(|r| r.get(column))
            .filter(|v| !v.is_null())
    }

    /// Overwrite one column of a cached record
    pub fn set_value(&mut self, table: &str, index: usize, column: &str, value: Value) {
        if let Some(record) = self.tables.get_mut(table).and_then(|r| r.get_mut(index)) {
            record.insert(column.to_string(), value);
        }
    }

    /// Uniformly random record index, `None` when the table has no records
    pub fn random_index<R: Rng + ?Sized>(&self, table: &str, rng: &mut R) -> Option<usize> {
        match self.len(table) {
            0 => None,
            n => Some(rng.random_range(0..n)),
        }
    }

    /// `column` of a uniformly random record
    pub fn random_value<R: Rng + ?Sized>(
        &self,
        table: &str,
        column: &str,
        rng: &mut R,
    ) -> Option<Value> {
        let index = self.random_index(table, rng)?;
        self.value(table, index, column).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn record(id: i64) -> Record {
        let mut r = Record::new();
        r.insert("id".to_string(), Value::Int(id));
        r.insert("parent_id".to_string(), Value::Null);
        r
    }

    #[test]
    fn test_empty_table_yields_nothing() {
        let cache = RecordCache::new();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(cache.is_empty("users"));
        assert_eq!(cache.random_value("users", "id", &mut rng), None);
    }

    #[test]
    fn test_random_value_comes_from_table() {
        let mut cache = RecordCache::new();
        cache.extend("users", (1..=5).map(record));
        let mut rng = StdRng::seed_from_u64(1);

        for _ in 0..20 {
            let value = cache.random_value("users", "id", &mut rng).unwrap();
            assert!(matches!(value, Value::Int(1..=5)));
        }
    }

    #[test]
    fn test_null_values_are_not_candidates() {
        let mut cache = RecordCache::new();
        cache.extend("users", [record(1)]);
        assert_eq!(cache.value("users", 0, "parent_id"), None);

        cache.set_value("users", 0, "parent_id", Value::Int(1));
        assert_eq!(cache.value("users", 0, "parent_id"), Some(&Value::Int(1)));
    }
}
