//! Synthetic value generation.
//!
//! - `types`: folds catalog type strings into [`DataType`]
//! - `fake`: [`FakeGenerator`], column-name heuristics then per-type handlers

mod fake;
mod types;

pub use fake::FakeGenerator;
pub use types::{DataType, IntWidth, SpatialKind};

use crate::schema::{Column, TableSchema};
use crate::storage::Value;

/// Generated-value provider used by the populator for non foreign key columns.
pub trait ValueGenerator {
    /// Produce a value for `column` of `table`. `Value::Null` is allowed.
    fn generate_value(&mut self, table: &TableSchema, column: &Column) -> Value;
}
