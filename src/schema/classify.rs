//! Table classification.
//!
//! Many-to-many detection is a structural heuristic, not a schema property:
//! unusual schemas can produce false positives or negatives, and both are
//! accepted silently. Classification is a pure function of the schema and
//! the circular set, recomputed on every analysis run.

use super::{Schema, TableCategory, TableId, TableSchema};
use ahash::{AHashMap, AHashSet};

/// Minimum share of foreign keys among a junction table's columns
const JUNCTION_FK_RATIO: f64 = 0.5;

/// Check whether a table looks like a many-to-many junction table.
///
/// All of the following must hold, with F foreign keys, C columns and
/// P primary-key columns:
/// - F >= 2
/// - F / C >= 0.5
/// - P >= F - 1
/// - the foreign keys reference at least 2 distinct tables
pub fn is_many_to_many(table: &TableSchema) -> bool {
    let fk_count = table.foreign_keys.len();
    let column_count = table.columns.len();

    if fk_count < 2 || column_count == 0 {
        return false;
    }
    if (fk_count as f64) / (column_count as f64) < JUNCTION_FK_RATIO {
        return false;
    }
    if table.primary_key_count() < fk_count - 1 {
        return false;
    }

    let referenced: AHashSet<&str> = table
        .foreign_keys
        .iter()
        .map(|fk| fk.referenced_table.as_str())
        .collect();
    referenced.len() >= 2
}

/// All tables classified as many-to-many, in catalog order
pub fn detect_many_to_many(schema: &Schema) -> Vec<TableId> {
    schema
        .iter()
        .filter(|t| is_many_to_many(t))
        .map(|t| t.id)
        .collect()
}

/// Assign a category to every table.
///
/// Precedence: many-to-many, then circular, then dependent (has foreign
/// keys), otherwise standalone.
pub fn classify_tables(
    schema: &Schema,
    many_to_many: &AHashSet<TableId>,
    circular: &AHashSet<TableId>,
) -> AHashMap<TableId, TableCategory> {
    schema
        .iter()
        .map(|t| {
            let category = if many_to_many.contains(&t.id) {
                TableCategory::ManyToMany
            } else if circular.contains(&t.id) {
                TableCategory::Circular
            } else if t.has_foreign_keys() {
                TableCategory::Dependent
            } else {
                TableCategory::Standalone
            };
            (t.id, category)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Column, ColumnKey};

    fn junction_schema(extra_columns: usize, pk_on_fks: bool) -> Schema {
        let mut schema = Schema::new();
        schema.add_table("users", vec![Column::new("id", "int").key(ColumnKey::Primary)]);
        schema.add_table("posts", vec![Column::new("id", "int").key(ColumnKey::Primary)]);

        let key = if pk_on_fks {
            ColumnKey::Primary
        } else {
            ColumnKey::Multiple
        };
        let mut columns = vec![
            Column::new("user_id", "int").key(key),
            Column::new("post_id", "int").key(key),
        ];
        for i in 0..extra_columns {
            columns.push(Column::new(format!("extra_{i}"), "varchar"));
        }
        schema.add_table("user_posts", columns);
        schema.add_foreign_key("user_posts", "user_id", "users", "id", "fk_u");
        schema.add_foreign_key("user_posts", "post_id", "posts", "id", "fk_p");
        schema
    }

    #[test]
    fn test_composite_pk_junction_is_many_to_many() {
        let schema = junction_schema(0, true);
        assert!(is_many_to_many(schema.get_table("user_posts").unwrap()));
        assert!(!is_many_to_many(schema.get_table("users").unwrap()));
    }

    #[test]
    fn test_junction_with_payload_columns() {
        // 2 FKs over 4 columns is exactly the 0.5 threshold
        let schema = junction_schema(2, true);
        assert!(is_many_to_many(schema.get_table("user_posts").unwrap()));

        // 2 FKs over 5 columns falls below it
        let schema = junction_schema(3, true);
        assert!(!is_many_to_many(schema.get_table("user_posts").unwrap()));
    }

    #[test]
    fn test_primary_key_coverage_required() {
        let schema = junction_schema(0, false);
        assert!(!is_many_to_many(schema.get_table("user_posts").unwrap()));
    }

    #[test]
    fn test_same_target_twice_is_not_many_to_many() {
        let mut schema = Schema::new();
        schema.add_table("users", vec![Column::new("id", "int").key(ColumnKey::Primary)]);
        schema.add_table(
            "friendships",
            vec![
                Column::new("user_a", "int").key(ColumnKey::Primary),
                Column::new("user_b", "int").key(ColumnKey::Primary),
            ],
        );
        schema.add_foreign_key("friendships", "user_a", "users", "id", "fk_a");
        schema.add_foreign_key("friendships", "user_b", "users", "id", "fk_b");

        assert!(!is_many_to_many(schema.get_table("friendships").unwrap()));
    }

    #[test]
    fn test_category_precedence() {
        let schema = junction_schema(0, true);
        let users = schema.get_table_id("users").unwrap();
        let posts = schema.get_table_id("posts").unwrap();
        let junction = schema.get_table_id("user_posts").unwrap();

        let m2m: AHashSet<TableId> = [junction].into_iter().collect();
        let circular: AHashSet<TableId> = [junction, posts].into_iter().collect();
        let categories = classify_tables(&schema, &m2m, &circular);

        assert_eq!(categories[&users], TableCategory::Standalone);
        assert_eq!(categories[&posts], TableCategory::Circular);
        assert_eq!(categories[&junction], TableCategory::ManyToMany);
    }
}
