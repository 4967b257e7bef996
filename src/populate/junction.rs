//! Many-to-many (junction) table sizing and combination drawing.

use super::Populator;
use crate::schema::TableSchema;
use ahash::AHashMap;
use rand::RngExt;
use tracing::debug;

/// Foreign key constraint to the index of the cached record a row points at
pub(super) type Combination = AHashMap<String, usize>;

impl Populator<'_> {
    /// Distinct referenced tables of a junction, in foreign key order
    fn junction_targets(table: &TableSchema) -> Vec<&str> {
        let mut targets: Vec<&str> = Vec::new();
        for fk in &table.foreign_keys {
            if !targets.contains(&fk.referenced_table.as_str()) {
                targets.push(&fk.referenced_table);
            }
        }
        targets
    }

    /// Distinct foreign key constraints of a junction with their referenced
    /// tables. Two constraints into the same table are drawn independently.
    fn junction_constraints(table: &TableSchema) -> Vec<(&str, &str)> {
        let mut constraints: Vec<(&str, &str)> = Vec::new();
        for fk in &table.foreign_keys {
            let key = fk.constraint_key();
            if !constraints.iter().any(|&(k, _)| k == key) {
                constraints.push((key, &fk.referenced_table));
            }
        }
        constraints
    }

    /// Record count for a junction table.
    ///
    /// The product of populated counts across the distinct referenced tables,
    /// capped at twice the configured count; zero when any referenced table
    /// is empty.
    pub(super) fn junction_record_count(&self, table: &TableSchema) -> usize {
        let configured = self.options.records_for(&table.name);
        let mut product: usize = 1;

        for target in Self::junction_targets(table) {
            let populated = self.cache.len(target);
            if populated == 0 {
                debug!(
                    "Junction table {} references empty table {}",
                    table.name, target
                );
                return 0;
            }
            product = product.saturating_mul(populated);
        }

        product.min(configured.saturating_mul(2))
    }

    /// Draw `count` combinations of referenced records.
    ///
    /// Combinations are distinct whenever the combination space fits in a
    /// `usize` and holds at least `count` entries; otherwise each row picks
    /// its referenced records independently.
    pub(super) fn junction_combinations(
        &mut self,
        table: &TableSchema,
        count: usize,
    ) -> Vec<Combination> {
        let constraints = Self::junction_constraints(table);
        let sizes: Vec<usize> = constraints
            .iter()
            .map(|&(_, target)| self.cache.len(target))
            .collect();

        let space = sizes
            .iter()
            .try_fold(1usize, |acc, &n| acc.checked_mul(n));

        match space {
            Some(space) if space >= count && space > 0 => {
                rand::seq::index::sample(&mut self.rng, space, count)
                    .into_iter()
                    .map(|mut index| {
                        // Mixed-radix decode: one digit per constraint
                        let mut combination = Combination::with_capacity(constraints.len());
                        for (&(key, _), &size) in constraints.iter().zip(&sizes) {
                            combination.insert(key.to_string(), index % size);
                            index /= size;
                        }
                        combination
                    })
                    .collect()
            }
            _ => (0..count)
                .map(|_| {
                    constraints
                        .iter()
                        .zip(&sizes)
                        .filter(|&(_, &size)| size > 0)
                        .map(|(&(key, _), &size)| (key.to_string(), self.rng.random_range(0..size)))
                        .collect()
                })
                .collect(),
        }
    }
}
