//! Population orchestrator.
//!
//! Walks the insertion order and fills each table:
//! - ordinary tables in a single pass, foreign keys drawn from the record cache
//! - circular tables in two passes: seed rows with circular foreign keys left
//!   null (or a placeholder), then backfill them from peer records
//! - many-to-many tables sized from the populated tables they join
//!
//! A table failure never stops the run; every table in the order is attempted.

mod cache;
mod circular;
mod junction;

pub use cache::RecordCache;

use crate::generator::ValueGenerator;
use crate::schema::{Column, ForeignKey, SchemaAnalysis, TableId, TableSchema};
use crate::storage::{Record, StorageWriter, Value};
use ahash::{AHashMap, AHashSet};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const DEFAULT_RECORDS: usize = 10;
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Why a table could not be populated
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TableFailure {
    #[error("no value available for NOT NULL foreign key {column} referencing {referenced_table}.{referenced_column}")]
    MissingForeignKeyValue {
        column: String,
        referenced_table: String,
        referenced_column: String,
    },
    #[error("batch insert failed: {message}")]
    InsertFailed { message: String },
}

/// Run settings
#[derive(Debug, Clone)]
pub struct PopulateOptions {
    /// Records per table unless overridden
    pub records: usize,
    /// Rows per insert transaction
    pub batch_size: usize,
    /// Seed for the random source; drawn from entropy when absent
    pub seed: Option<u64>,
    /// Per-table record counts
    pub table_records: AHashMap<String, usize>,
    /// Tables left untouched
    pub skip_tables: AHashSet<String>,
}

impl Default for PopulateOptions {
    fn default() -> Self {
        Self {
            records: DEFAULT_RECORDS,
            batch_size: DEFAULT_BATCH_SIZE,
            seed: None,
            table_records: AHashMap::new(),
            skip_tables: AHashSet::new(),
        }
    }
}

impl PopulateOptions {
    pub fn new(records: usize) -> Self {
        Self {
            records,
            ..Default::default()
        }
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn table_records(mut self, table: &str, records: usize) -> Self {
        self.table_records.insert(table.to_string(), records);
        self
    }

    pub fn skip_table(mut self, table: &str) -> Self {
        self.skip_tables.insert(table.to_string());
        self
    }

    /// Configured record count for a table
    pub fn records_for(&self, table: &str) -> usize {
        self.table_records
            .get(table)
            .copied()
            .unwrap_or(self.records)
    }

    pub fn is_skipped(&self, table: &str) -> bool {
        self.skip_tables.contains(table)
    }
}

/// A table that could not be populated
#[derive(Debug, Clone, Serialize)]
pub struct FailedTable {
    pub table: String,
    pub reason: TableFailure,
}

/// Outcome of a population run
#[derive(Debug, Clone, Default, Serialize)]
pub struct PopulationResult {
    pub successful_tables: Vec<String>,
    pub failed_tables: Vec<FailedTable>,
    pub skipped_tables: Vec<String>,
    pub total_records_inserted: u64,
    /// Rows committed per table, including tables that failed part way
    pub records_per_table: BTreeMap<String, u64>,
    pub seed: u64,
}

impl PopulationResult {
    pub fn is_success(&self) -> bool {
        self.failed_tables.is_empty()
    }

    pub fn failed_table_names(&self) -> Vec<String> {
        self.failed_tables.iter().map(|f| f.table.clone()).collect()
    }
}

/// Circular foreign key whose peer table was still empty during pass 2
#[derive(Debug, Clone)]
struct DeferredBackfill {
    table: TableId,
    constraint: circular::CircularConstraint,
}

/// Drives one population run over an analyzed schema.
pub struct Populator<'a> {
    analysis: &'a SchemaAnalysis,
    storage: &'a mut dyn StorageWriter,
    generator: &'a mut dyn ValueGenerator,
    options: PopulateOptions,
    rng: StdRng,
    seed: u64,
    cache: RecordCache,
    deferred: Vec<DeferredBackfill>,
    on_table: Option<Box<dyn Fn(&str) + 'a>>,
}

impl<'a> Populator<'a> {
    pub fn new(
        analysis: &'a SchemaAnalysis,
        storage: &'a mut dyn StorageWriter,
        generator: &'a mut dyn ValueGenerator,
        options: PopulateOptions,
    ) -> Self {
        let seed = options.seed.unwrap_or_else(rand::random);
        Self {
            analysis,
            storage,
            generator,
            options,
            rng: StdRng::seed_from_u64(seed),
            seed,
            cache: RecordCache::new(),
            deferred: Vec::new(),
            on_table: None,
        }
    }

    /// Call `callback` with each table name once it has been attempted
    pub fn on_table<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str) + 'a,
    {
        self.on_table = Some(Box::new(callback));
        self
    }

    /// Records inserted so far
    pub fn cache(&self) -> &RecordCache {
        &self.cache
    }

    /// Attempt every table in insertion order.
    pub fn populate(&mut self) -> PopulationResult {
        let analysis = self.analysis;
        let mut result = PopulationResult {
            seed: self.seed,
            ..Default::default()
        };

        info!(
            "Populating {} tables with {} records each (seed {})",
            analysis.order.len(),
            self.options.records,
            self.seed
        );

        for &id in &analysis.order {
            let name = analysis.schema.table_name(id);

            if self.options.is_skipped(name) {
                info!("Skipping table {}", name);
                result.skipped_tables.push(name.to_string());
                self.notify(name);
                continue;
            }

            let mut inserted = 0u64;
            let outcome = self.populate_table(id, &mut inserted);
            result.total_records_inserted += inserted;
            result.records_per_table.insert(name.to_string(), inserted);

            match outcome {
                Ok(()) => {
                    info!("Populated table {} with {} records", name, inserted);
                    result.successful_tables.push(name.to_string());
                }
                Err(reason) => {
                    warn!("Failed to populate table {}: {}", name, reason);
                    result.failed_tables.push(FailedTable {
                        table: name.to_string(),
                        reason,
                    });
                }
            }
            self.notify(name);
        }

        self.run_deferred_backfill();

        info!(
            "Population finished: {} succeeded, {} failed, {} records inserted",
            result.successful_tables.len(),
            result.failed_tables.len(),
            result.total_records_inserted
        );
        result
    }

    fn notify(&self, table: &str) {
        if let Some(callback) = &self.on_table {
            callback(table);
        }
    }

    fn populate_table(&mut self, id: TableId, inserted: &mut u64) -> Result<(), TableFailure> {
        let analysis = self.analysis;
        let table = &analysis.schema.table_schemas[id.index()];
        let columns = table.insertable_columns();

        if columns.is_empty() {
            warn!("No insertable columns found for table {}", table.name);
            return Ok(());
        }

        let is_circular = analysis.is_circular(id);
        let is_junction = analysis.is_many_to_many(id);
        debug!(
            "Populating table {} ({})",
            table.name,
            analysis.category(id)
        );

        let count = if is_junction {
            self.junction_record_count(table)
        } else {
            self.options.records_for(&table.name)
        };
        if count == 0 {
            info!("Nothing to generate for table {}", table.name);
            return Ok(());
        }

        // Pass 1 leaves foreign keys into the cycle unresolved
        let deferred_columns: AHashSet<&str> = if is_circular {
            table
                .foreign_keys
                .iter()
                .filter(|fk| self.references_circular(fk))
                .map(|fk| fk.column.as_str())
                .collect()
        } else {
            AHashSet::new()
        };

        let combinations = if is_junction {
            Some(self.junction_combinations(table, count))
        } else {
            None
        };

        let column_names: Vec<String> = columns.iter().map(|c| c.name.clone()).collect();
        let batch_size = self.options.batch_size.max(1);
        let mut rows: Vec<Vec<Value>> = Vec::with_capacity(batch_size.min(count));
        let mut records: Vec<Record> = Vec::with_capacity(batch_size.min(count));

        for i in 0..count {
            let combination = combinations.as_ref().and_then(|c| c.get(i));
            let (record, row) = self.generate_record(table, &columns, &deferred_columns, combination)?;
            records.push(record);
            rows.push(row);

            if rows.len() >= batch_size {
                self.flush(table, &column_names, &mut rows, &mut records, inserted)?;
            }
        }
        self.flush(table, &column_names, &mut rows, &mut records, inserted)?;

        if is_circular {
            self.backfill_circular(id);
        }
        Ok(())
    }

    fn generate_record(
        &mut self,
        table: &TableSchema,
        columns: &[&Column],
        deferred_columns: &AHashSet<&str>,
        combination: Option<&junction::Combination>,
    ) -> Result<(Record, Vec<Value>), TableFailure> {
        let mut record = Record::with_capacity(columns.len());
        let mut row = Vec::with_capacity(columns.len());
        // Referenced record chosen per (constraint, referenced table) in this row
        let mut picks: AHashMap<(&str, &str), usize> = AHashMap::new();

        for column in columns {
            let foreign_key = table.foreign_keys.iter().find(|fk| fk.column == column.name);

            let value = match foreign_key {
                Some(_) if deferred_columns.contains(column.name.as_str()) => {
                    if column.is_nullable {
                        Value::Null
                    } else {
                        self.generator.generate_value(table, column)
                    }
                }
                Some(fk) => {
                    let key = (fk.constraint_key(), fk.referenced_table.as_str());
                    let index = match combination.and_then(|c| c.get(key.0)) {
                        Some(&index) => Some(index),
                        None => {
                            match picks.get(&key) {
                                Some(&index) => Some(index),
                                None => {
                                    let index = self
                                        .cache
                                        .random_index(&fk.referenced_table, &mut self.rng);
                                    if let Some(index) = index {
                                        picks.insert(key, index);
                                    }
                                    index
                                }
                            }
                        }
                    };

                    let value = index.and_then(|index| {
                        self.cache
                            .value(&fk.referenced_table, index, &fk.referenced_column)
                            .cloned()
                    });
                    match value {
                        Some(value) => value,
                        None if column.is_nullable => Value::Null,
                        None => {
                            return Err(TableFailure::MissingForeignKeyValue {
                                column: fk.column.clone(),
                                referenced_table: fk.referenced_table.clone(),
                                referenced_column: fk.referenced_column.clone(),
                            })
                        }
                    }
                }
                None => self.generator.generate_value(table, column),
            };

            record.insert(column.name.clone(), value.clone());
            row.push(value);
        }

        Ok((record, row))
    }

    /// Insert pending rows as one batch and move them into the cache
    fn flush(
        &mut self,
        table: &TableSchema,
        columns: &[String],
        rows: &mut Vec<Vec<Value>>,
        records: &mut Vec<Record>,
        inserted: &mut u64,
    ) -> Result<(), TableFailure> {
        if rows.is_empty() {
            return Ok(());
        }

        let written = self
            .storage
            .insert_batch(&table.name, columns, rows)
            .map_err(|e| TableFailure::InsertFailed {
                message: format!("{:#}", e),
            })?;
        debug!("Inserted batch of {} rows into {}", written, table.name);

        *inserted += written as u64;
        rows.clear();
        self.cache.extend(&table.name, records.drain(..));
        Ok(())
    }

    /// Whether a foreign key points into the circular set
    fn references_circular(&self, fk: &ForeignKey) -> bool {
        self.analysis
            .schema
            .get_table_id(&fk.referenced_table)
            .is_some_and(|target| self.analysis.is_circular(target))
    }
}

/// Run a population with a fresh [`Populator`].
pub fn populate(
    analysis: &SchemaAnalysis,
    storage: &mut dyn StorageWriter,
    generator: &mut dyn ValueGenerator,
    options: PopulateOptions,
) -> PopulationResult {
    Populator::new(analysis, storage, generator, options).populate()
}
