//! Dependency graph over tables built from foreign keys.
//!
//! An edge `A -> B` means table A holds a foreign key referencing table B,
//! so B must be populated before A. Edges carry a weight (1 for NOT NULL
//! foreign keys, 2 for nullable ones) that the analysis report exposes as
//! required or optional; reachability ignores weights entirely.

use super::{Schema, TableId};
use std::collections::VecDeque;

/// Weight of an edge created by a NOT NULL foreign key
pub const MANDATORY_EDGE_WEIGHT: u8 = 1;
/// Weight of an edge created by a nullable foreign key
pub const OPTIONAL_EDGE_WEIGHT: u8 = 2;

/// A weighted edge to a referenced table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub to: TableId,
    pub weight: u8,
}

/// Directed dependency graph with one node per table.
#[derive(Debug)]
pub struct DependencyGraph {
    /// For each table, the tables it references (deduplicated)
    edges: Vec<Vec<Edge>>,
}

impl DependencyGraph {
    /// Build the graph from a schema's foreign keys.
    ///
    /// Foreign keys referencing tables outside the schema are skipped here but
    /// stay on the owning table. When several foreign keys connect the same
    /// pair of tables, the mandatory weight wins.
    pub fn from_schema(schema: &Schema) -> Self {
        let mut edges: Vec<Vec<Edge>> = vec![Vec::new(); schema.len()];

        for table in schema.iter() {
            for fk in &table.foreign_keys {
                let Some(to) = schema.get_table_id(&fk.referenced_table) else {
                    continue;
                };
                let weight = if fk.is_nullable {
                    OPTIONAL_EDGE_WEIGHT
                } else {
                    MANDATORY_EDGE_WEIGHT
                };

                let out = &mut edges[table.id.index()];
                match out.iter_mut().find(|e| e.to == to) {
                    Some(existing) => existing.weight = existing.weight.min(weight),
                    None => out.push(Edge { to, weight }),
                }
            }
        }

        Self { edges }
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Outgoing edges of a table
    pub fn edges(&self, id: TableId) -> &[Edge] {
        &self.edges[id.index()]
    }

    pub fn edge_weight(&self, from: TableId, to: TableId) -> Option<u8> {
        self.edges[from.index()]
            .iter()
            .find(|e| e.to == to)
            .map(|e| e.weight)
    }

    pub fn edge_count(&self) -> usize {
        self.edges.iter().map(Vec::len).sum()
    }

    /// Tables reachable from `from` through one or more edges.
    ///
    /// `from` itself is only included when it lies on a cycle.
    pub fn reachable_from(&self, from: TableId) -> Vec<bool> {
        let mut visited = vec![false; self.len()];
        let mut queue = VecDeque::new();

        for edge in self.edges(from) {
            if !visited[edge.to.index()] {
                visited[edge.to.index()] = true;
                queue.push_back(edge.to);
            }
        }

        while let Some(current) = queue.pop_front() {
            for edge in self.edges(current) {
                if !visited[edge.to.index()] {
                    visited[edge.to.index()] = true;
                    queue.push_back(edge.to);
                }
            }
        }

        visited
    }

    /// Reachability matrix: `matrix[a][b]` is true when b is reachable from a.
    pub fn reachability(&self) -> Vec<Vec<bool>> {
        (0..self.len() as u32)
            .map(|i| self.reachable_from(TableId(i)))
            .collect()
    }
}
