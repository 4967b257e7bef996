//! Population order for tables.
//!
//! Produces a permutation of all tables where:
//! 1. non-circular tables follow their non-circular dependencies
//! 2. circular tables follow every non-circular table (sorted by name)
//! 3. many-to-many tables come last, whatever their other classification

use super::{Schema, TableId};
use ahash::AHashSet;
use tracing::debug;

/// Compute the insertion order.
///
/// Deterministic for a given schema: zero-FK tables are seeded in catalog
/// order, dependent tables are placed first-eligible-first in catalog order,
/// and circular tables are sorted by name.
pub fn insertion_order(
    schema: &Schema,
    circular: &AHashSet<TableId>,
    many_to_many: &AHashSet<TableId>,
) -> Vec<TableId> {
    let mut order: Vec<TableId> = Vec::with_capacity(schema.len());
    let mut placed = vec![false; schema.len()];

    let non_circular: Vec<TableId> = schema.ids().filter(|id| !circular.contains(id)).collect();

    // Seed with tables that have no foreign keys at all
    for &id in &non_circular {
        if !schema.table_schemas[id.index()].has_foreign_keys() {
            order.push(id);
            placed[id.index()] = true;
        }
    }

    let mut remaining: Vec<TableId> = non_circular
        .into_iter()
        .filter(|id| !placed[id.index()])
        .collect();

    while !remaining.is_empty() {
        let eligible = remaining
            .iter()
            .position(|&id| unresolved_dependencies(schema, id, &placed, circular) == 0);

        let pos = match eligible {
            Some(pos) => pos,
            None => {
                // Deadlock: take the table with the fewest unresolved dependencies
                let pos = remaining
                    .iter()
                    .enumerate()
                    .min_by_key(|&(_, &id)| unresolved_dependencies(schema, id, &placed, circular))
                    .map(|(pos, _)| pos)
                    .unwrap_or(0);
                debug!(
                    "No eligible table in scan; placing {} with fewest unresolved dependencies",
                    schema.table_name(remaining[pos])
                );
                pos
            }
        };

        let id = remaining.remove(pos);
        placed[id.index()] = true;
        order.push(id);
    }

    let mut circular_tables: Vec<TableId> = circular.iter().copied().collect();
    circular_tables.sort_by(|a, b| schema.table_name(*a).cmp(schema.table_name(*b)));
    order.extend(circular_tables);

    // Stable partition: many-to-many tables move to the end
    let (mut ordered, junctions): (Vec<TableId>, Vec<TableId>) =
        order.into_iter().partition(|id| !many_to_many.contains(id));
    ordered.extend(junctions);
    ordered
}

/// Count foreign keys that still block placement of a table.
///
/// Self-references, already placed targets, and circular targets never block.
fn unresolved_dependencies(
    schema: &Schema,
    id: TableId,
    placed: &[bool],
    circular: &AHashSet<TableId>,
) -> usize {
    let table = &schema.table_schemas[id.index()];
    table
        .foreign_keys
        .iter()
        .filter(|fk| !fk.is_self_reference())
        .filter(|fk| match schema.get_table_id(&fk.referenced_table) {
            Some(target) => !placed[target.index()] && !circular.contains(&target),
            None => true,
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Column;

    fn build(tables: &[&str], fks: &[(&str, &str)]) -> Schema {
        let mut schema = Schema::new();
        for table in tables {
            schema.add_table(*table, vec![Column::new("id", "int")]);
        }
        for (owner, target) in fks {
            schema.add_foreign_key(owner, &format!("{target}_id"), target, "id", "fk");
        }
        schema
    }

    fn names(schema: &Schema, order: &[TableId]) -> Vec<String> {
        order.iter().map(|id| schema.table_name(*id).to_string()).collect()
    }

    #[test]
    fn test_dependencies_before_dependents() {
        // Catalog order deliberately lists children first
        let schema = build(
            &["comments", "posts", "users"],
            &[("comments", "posts"), ("posts", "users")],
        );
        let order = insertion_order(&schema, &AHashSet::new(), &AHashSet::new());
        assert_eq!(names(&schema, &order), vec!["users", "posts", "comments"]);
    }

    #[test]
    fn test_self_reference_does_not_block() {
        let schema = build(&["categories"], &[("categories", "categories")]);
        let order = insertion_order(&schema, &AHashSet::new(), &AHashSet::new());
        assert_eq!(names(&schema, &order), vec!["categories"]);
    }

    #[test]
    fn test_circular_tables_sorted_by_name_after_others() {
        let schema = build(
            &["zeta", "alpha", "plain", "child"],
            &[("zeta", "alpha"), ("alpha", "zeta"), ("child", "alpha")],
        );
        let circular: AHashSet<TableId> = [TableId(0), TableId(1)].into_iter().collect();
        let order = insertion_order(&schema, &circular, &AHashSet::new());

        // child references a circular table, which does not block it
        assert_eq!(names(&schema, &order), vec!["plain", "child", "alpha", "zeta"]);
    }

    #[test]
    fn test_dangling_reference_resolved_by_tie_break() {
        let schema = build(
            &["users", "orders", "refunds"],
            &[("orders", "customers"), ("refunds", "orders"), ("refunds", "users")],
        );
        let order = insertion_order(&schema, &AHashSet::new(), &AHashSet::new());
        assert_eq!(names(&schema, &order), vec!["users", "orders", "refunds"]);
    }

    #[test]
    fn test_many_to_many_moved_last() {
        let schema = build(
            &["tags", "post_tags", "posts", "comments"],
            &[("post_tags", "posts"), ("post_tags", "tags"), ("comments", "posts")],
        );
        let m2m: AHashSet<TableId> = [TableId(1)].into_iter().collect();
        let order = insertion_order(&schema, &AHashSet::new(), &m2m);
        assert_eq!(
            names(&schema, &order),
            vec!["tags", "posts", "comments", "post_tags"]
        );
    }

    #[test]
    fn test_order_is_deterministic() {
        let schema = build(
            &["b", "a", "c", "d"],
            &[("c", "a"), ("d", "b"), ("a", "d"), ("d", "a")],
        );
        let circular: AHashSet<TableId> = [TableId(1), TableId(3)].into_iter().collect();
        let first = insertion_order(&schema, &circular, &AHashSet::new());
        for _ in 0..5 {
            assert_eq!(insertion_order(&schema, &circular, &AHashSet::new()), first);
        }
        assert_eq!(first.len(), 4);
    }
}
