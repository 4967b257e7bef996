//! Circular dependency detection.
//!
//! Two independent checks feed the circular set:
//! - graph reachability: A and B are circular when each can reach the other
//! - direct references: A has a foreign key to B and B has one to A
//!
//! The second check only sees two-table cycles, which the first one also
//! finds; both are kept so their results can be compared.

use super::{DependencyGraph, Schema, TableId};
use ahash::AHashSet;

/// Result of cycle detection
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    /// Tables taking part in at least one cycle
    pub circular: AHashSet<TableId>,
    /// Mutually reachable pairs `(a, b)` with `a` before `b` in catalog order
    pub reachability_pairs: Vec<(TableId, TableId)>,
    /// Pairs referencing each other directly, same ordering
    pub direct_pairs: Vec<(TableId, TableId)>,
}

impl CycleReport {
    pub fn is_circular(&self, id: TableId) -> bool {
        self.circular.contains(&id)
    }

    /// Union of both pair lists without duplicates, reachability pairs first
    pub fn all_pairs(&self) -> Vec<(TableId, TableId)> {
        let mut pairs = self.reachability_pairs.clone();
        for pair in &self.direct_pairs {
            if !pairs.contains(pair) {
                pairs.push(*pair);
            }
        }
        pairs
    }
}

/// Pairs of distinct tables that can reach each other through foreign keys.
///
/// Runs one BFS per table, then checks every pair against the resulting
/// reachability matrix.
pub fn reachability_pairs(graph: &DependencyGraph) -> Vec<(TableId, TableId)> {
    let reach = graph.reachability();
    let n = graph.len();
    let mut pairs = Vec::new();

    for a in 0..n {
        for b in (a + 1)..n {
            if reach[a][b] && reach[b][a] {
                pairs.push((TableId(a as u32), TableId(b as u32)));
            }
        }
    }

    pairs
}

/// Pairs of distinct tables holding foreign keys directly to each other.
///
/// Works on the foreign key lists alone, without the graph.
pub fn direct_reference_pairs(schema: &Schema) -> Vec<(TableId, TableId)> {
    let references = |from: TableId, to: TableId| {
        let target = schema.table_name(to);
        schema.table_schemas[from.index()]
            .foreign_keys
            .iter()
            .any(|fk| fk.referenced_table == target)
    };

    let mut pairs = Vec::new();
    for a in schema.ids() {
        if !schema.table_schemas[a.index()].has_foreign_keys() {
            continue;
        }
        for b in schema.ids().filter(|b| b.0 > a.0) {
            if references(a, b) && references(b, a) {
                pairs.push((a, b));
            }
        }
    }

    pairs
}

/// Run both checks and union their results.
pub fn detect_cycles(schema: &Schema, graph: &DependencyGraph) -> CycleReport {
    let reachability_pairs = reachability_pairs(graph);
    let direct_pairs = direct_reference_pairs(schema);

    let circular = reachability_pairs
        .iter()
        .chain(direct_pairs.iter())
        .flat_map(|&(a, b)| [a, b])
        .collect();

    CycleReport {
        circular,
        reachability_pairs,
        direct_pairs,
    }
}
