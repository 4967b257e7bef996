//! Second pass for circular tables: point seeded rows at peer records.

use super::{DeferredBackfill, Populator};
use crate::schema::{TableId, TableSchema};
use crate::storage::Value;
use tracing::{debug, info, warn};

/// Circular foreign key columns sharing one constraint.
///
/// Every column is resolved from the same referenced record, so composite
/// keys point at a row that exists.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct CircularConstraint {
    pub(super) name: String,
    pub(super) referenced_table: String,
    /// (owning column, referenced column) pairs
    pub(super) columns: Vec<(String, String)>,
}

impl CircularConstraint {
    fn describe(&self, table: &str) -> String {
        let columns: Vec<&str> = self.columns.iter().map(|(c, _)| c.as_str()).collect();
        format!("{}.({})", table, columns.join(", "))
    }
}

impl Populator<'_> {
    /// Circular foreign keys of a table grouped by constraint, in key order
    pub(super) fn circular_constraints(&self, table: &TableSchema) -> Vec<CircularConstraint> {
        let mut constraints: Vec<CircularConstraint> = Vec::new();

        for fk in &table.foreign_keys {
            if !self.references_circular(fk) {
                continue;
            }
            if table.get_column(&fk.column).is_some_and(|c| c.is_auto_generated()) {
                continue;
            }

            let key = fk.constraint_key();
            match constraints
                .iter_mut()
                .find(|c| c.name == key && c.referenced_table == fk.referenced_table)
            {
                Some(existing) => {
                    if !existing.columns.iter().any(|(c, _)| c == &fk.column) {
                        existing
                            .columns
                            .push((fk.column.clone(), fk.referenced_column.clone()));
                    }
                }
                None => constraints.push(CircularConstraint {
                    name: key.to_string(),
                    referenced_table: fk.referenced_table.clone(),
                    columns: vec![(fk.column.clone(), fk.referenced_column.clone())],
                }),
            }
        }
        constraints
    }

    /// Backfill every circular foreign key of a freshly seeded table.
    ///
    /// Keys whose peer table is still empty are deferred until every table
    /// has been attempted.
    pub(super) fn backfill_circular(&mut self, id: TableId) {
        let analysis = self.analysis;
        let table = &analysis.schema.table_schemas[id.index()];

        for constraint in self.circular_constraints(table) {
            if self.cache.is_empty(&constraint.referenced_table) {
                warn!(
                    "Referenced table {} has no data yet, deferring update of {}",
                    constraint.referenced_table,
                    constraint.describe(&table.name)
                );
                self.deferred.push(DeferredBackfill {
                    table: id,
                    constraint,
                });
                continue;
            }

            self.backfill(table, &constraint);
        }
    }

    /// Retry circular foreign keys whose peer table was empty earlier
    pub(super) fn run_deferred_backfill(&mut self) {
        let deferred = std::mem::take(&mut self.deferred);
        let analysis = self.analysis;

        for entry in deferred {
            let table = &analysis.schema.table_schemas[entry.table.index()];
            let constraint = &entry.constraint;
            if self.cache.is_empty(&constraint.referenced_table) {
                warn!(
                    "Referenced table {} is still empty, {} stays unresolved",
                    constraint.referenced_table,
                    constraint.describe(&table.name)
                );
                continue;
            }
            self.backfill(table, constraint);
        }
    }

    /// Point each cached row of `table` at a random record of the referenced
    /// table, setting every column of the constraint in one update. Update
    /// failures are logged and skipped.
    fn backfill(&mut self, table: &TableSchema, constraint: &CircularConstraint) {
        let Some(pk) = table.primary_key_column() else {
            warn!(
                "No primary key found for table {}, skipping update of {}",
                table.name,
                constraint.describe(&table.name)
            );
            return;
        };

        let mut updated = 0usize;
        for index in 0..self.cache.len(&table.name) {
            let Some(pk_value) = self.cache.value(&table.name, index, &pk.name).cloned() else {
                continue;
            };
            let Some(target) = self
                .cache
                .random_index(&constraint.referenced_table, &mut self.rng)
            else {
                continue;
            };
            let assignments: Option<Vec<(String, Value)>> = constraint
                .columns
                .iter()
                .map(|(column, referenced)| {
                    self.cache
                        .value(&constraint.referenced_table, target, referenced)
                        .cloned()
                        .map(|value| (column.clone(), value))
                })
                .collect();
            let Some(assignments) = assignments else {
                continue;
            };

            match self
                .storage
                .update_columns(&table.name, &pk.name, &pk_value, &assignments)
            {
                Ok(()) => {
                    for (column, value) in assignments {
                        self.cache.set_value(&table.name, index, &column, value);
                    }
                    updated += 1;
                }
                Err(e) => warn!(
                    "Error updating circular foreign key {} for {} = {}: {:#}",
                    constraint.describe(&table.name),
                    pk.name,
                    pk_value,
                    e
                ),
            }
        }

        if updated > 0 {
            info!(
                "Resolved {} -> {} on {} rows",
                constraint.describe(&table.name),
                constraint.referenced_table,
                updated
            );
        } else {
            debug!("No rows of {} updated for {}", table.name, constraint.name);
        }
    }
}
