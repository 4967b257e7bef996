//! Full schema analysis: catalog read, graph, classification, cycles, order.

use super::{
    classify_tables, detect_cycles, detect_many_to_many, insertion_order, CycleReport,
    DependencyGraph, ForeignKey, Schema, TableCategory, TableId, MANDATORY_EDGE_WEIGHT,
};
use crate::catalog::CatalogReader;
use ahash::{AHashMap, AHashSet};
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Everything known about a schema after one analysis run.
///
/// Nothing here is cached across runs; analyzing again after a schema change
/// rebuilds every part from the catalog.
#[derive(Debug)]
pub struct SchemaAnalysis {
    pub schema: Schema,
    pub graph: DependencyGraph,
    pub many_to_many: AHashSet<TableId>,
    pub cycles: CycleReport,
    pub categories: AHashMap<TableId, TableCategory>,
    /// Population order over every table
    pub order: Vec<TableId>,
}

impl SchemaAnalysis {
    /// Run graph construction, classification, cycle detection and ordering
    /// over an already loaded schema.
    pub fn from_schema(schema: Schema) -> Self {
        let graph = DependencyGraph::from_schema(&schema);
        let many_to_many: AHashSet<TableId> = detect_many_to_many(&schema).into_iter().collect();
        let cycles = detect_cycles(&schema, &graph);
        let categories = classify_tables(&schema, &many_to_many, &cycles.circular);
        let order = insertion_order(&schema, &cycles.circular, &many_to_many);

        debug!(
            tables = schema.len(),
            edges = graph.edge_count(),
            many_to_many = many_to_many.len(),
            circular = cycles.circular.len(),
            "Schema analysis complete"
        );

        Self {
            schema,
            graph,
            many_to_many,
            cycles,
            categories,
            order,
        }
    }

    pub fn is_circular(&self, id: TableId) -> bool {
        self.cycles.is_circular(id)
    }

    pub fn is_many_to_many(&self, id: TableId) -> bool {
        self.many_to_many.contains(&id)
    }

    pub fn category(&self, id: TableId) -> TableCategory {
        self.categories
            .get(&id)
            .copied()
            .unwrap_or(TableCategory::Standalone)
    }

    /// Table names in population order
    pub fn ordered_tables(&self) -> Vec<String> {
        self.names(self.order.iter().copied())
    }

    /// Circular table names, sorted
    pub fn circular_tables(&self) -> Vec<String> {
        let mut names = self.names(self.cycles.circular.iter().copied());
        names.sort();
        names
    }

    /// Many-to-many table names in catalog order
    pub fn many_to_many_tables(&self) -> Vec<String> {
        self.names(self.schema.ids().filter(|id| self.many_to_many.contains(id)))
    }

    /// Circular pairs for reporting, from both detection checks
    pub fn direct_circular_pairs(&self) -> Vec<(String, String)> {
        self.cycles
            .all_pairs()
            .into_iter()
            .map(|(a, b)| {
                (
                    self.schema.table_name(a).to_string(),
                    self.schema.table_name(b).to_string(),
                )
            })
            .collect()
    }

    /// Serializable summary of the analysis
    pub fn report(&self) -> AnalysisReport {
        let foreign_keys_by_table = self
            .schema
            .iter()
            .filter(|t| t.has_foreign_keys())
            .map(|t| (t.name.clone(), t.foreign_keys.clone()))
            .collect();
        let categories = self
            .schema
            .iter()
            .map(|t| (t.name.clone(), self.category(t.id)))
            .collect();
        let dependencies = self
            .schema
            .iter()
            .filter(|t| !self.graph.edges(t.id).is_empty())
            .map(|t| {
                let edges = self
                    .graph
                    .edges(t.id)
                    .iter()
                    .map(|edge| Dependency {
                        table: self.schema.table_name(edge.to).to_string(),
                        weight: edge.weight,
                        required: edge.weight == MANDATORY_EDGE_WEIGHT,
                    })
                    .collect();
                (t.name.clone(), edges)
            })
            .collect();

        AnalysisReport {
            tables: self.schema.table_names(),
            views: self.schema.views.clone(),
            foreign_keys_by_table,
            many_to_many_tables: self.many_to_many_tables(),
            circular_tables: self.circular_tables(),
            ordered_tables: self.ordered_tables(),
            direct_circular_pairs: self.direct_circular_pairs(),
            categories,
            dependencies,
        }
    }

    fn names(&self, ids: impl Iterator<Item = TableId>) -> Vec<String> {
        ids.map(|id| self.schema.table_name(id).to_string()).collect()
    }
}

/// Analysis result as exposed to callers and the CLI
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub tables: Vec<String>,
    pub views: Vec<String>,
    pub foreign_keys_by_table: BTreeMap<String, Vec<ForeignKey>>,
    pub many_to_many_tables: Vec<String>,
    pub circular_tables: Vec<String>,
    pub ordered_tables: Vec<String>,
    pub direct_circular_pairs: Vec<(String, String)>,
    pub categories: BTreeMap<String, TableCategory>,
    /// Graph edges per table that references other tables
    pub dependencies: BTreeMap<String, Vec<Dependency>>,
}

/// One dependency graph edge in a report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dependency {
    /// Referenced table
    pub table: String,
    pub weight: u8,
    /// Whether a NOT NULL foreign key backs the edge
    pub required: bool,
}

/// Read the catalog into a [`Schema`].
///
/// Table, view and foreign key listing errors abort; a failed column listing
/// only leaves that table without columns, and check constraints are
/// best-effort.
pub fn load_schema(catalog: &dyn CatalogReader) -> Result<Schema> {
    let mut schema = Schema::new();

    let tables = catalog.list_tables().context("Failed to list tables")?;
    schema.views = catalog.list_views().context("Failed to list views")?;

    for table in &tables {
        let columns = match catalog.list_columns(table) {
            Ok(columns) => columns,
            Err(e) => {
                warn!("Failed to retrieve columns for table {}: {:#}", table, e);
                Vec::new()
            }
        };
        schema.add_table(table.as_str(), columns);
    }

    let foreign_keys = catalog
        .list_foreign_keys()
        .context("Failed to list foreign keys")?;
    for fk in &foreign_keys {
        if !schema.add_foreign_key(
            &fk.table,
            &fk.column,
            &fk.referenced_table,
            &fk.referenced_column,
            &fk.constraint_name,
        ) {
            debug!(
                "Ignoring foreign key {} on unknown table {}",
                fk.constraint_name, fk.table
            );
        }
    }

    match catalog.list_check_constraints() {
        Ok(checks) => {
            for (table, constraints) in checks {
                if let Some(id) = schema.get_table_id(&table) {
                    schema.table_schemas[id.index()]
                        .check_constraints
                        .extend(constraints);
                }
            }
        }
        Err(e) => warn!("Could not read check constraints: {:#}", e),
    }

    Ok(schema)
}

/// Read the catalog and analyze it.
pub fn analyze(catalog: &dyn CatalogReader) -> Result<SchemaAnalysis> {
    let schema = load_schema(catalog)?;
    info!(
        "Found {} tables and {} views",
        schema.len(),
        schema.views.len()
    );
    Ok(SchemaAnalysis::from_schema(schema))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::memory::MemoryCatalog;
    use crate::schema::Column;

    #[test]
    fn test_failed_column_listing_keeps_table() {
        struct FlakyCatalog(MemoryCatalog);

        impl CatalogReader for FlakyCatalog {
            fn list_tables(&self) -> Result<Vec<String>> {
                Ok(vec!["ok".to_string(), "broken".to_string()])
            }
            fn list_views(&self) -> Result<Vec<String>> {
                self.0.list_views()
            }
            fn list_columns(&self, table: &str) -> Result<Vec<Column>> {
                self.0.list_columns(table)
            }
            fn list_foreign_keys(&self) -> Result<Vec<crate::catalog::ForeignKeyRow>> {
                self.0.list_foreign_keys()
            }
            fn list_check_constraints(&self) -> Result<crate::catalog::CheckConstraints> {
                anyhow::bail!("check constraints not supported")
            }
        }

        let catalog = FlakyCatalog(MemoryCatalog::new().table("ok", vec![Column::new("id", "int")]));
        let analysis = analyze(&catalog).unwrap();

        assert_eq!(analysis.schema.len(), 2);
        assert!(analysis.schema.get_table("broken").unwrap().columns.is_empty());
    }

    #[test]
    fn test_check_constraints_attached() {
        let catalog = MemoryCatalog::new()
            .table("products", vec![Column::new("price", "decimal")])
            .check("products", "price_positive", "price > 0");
        let schema = load_schema(&catalog).unwrap();

        let products = schema.get_table("products").unwrap();
        assert_eq!(
            products.check_constraints,
            vec![("price_positive".to_string(), "price > 0".to_string())]
        );
    }
}
