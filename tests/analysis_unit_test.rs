//! Schema analysis tests: classification, cycle detection and insertion order

use sql_populator::catalog::memory::MemoryCatalog;
use sql_populator::schema::{analyze, Column, ColumnKey, SchemaAnalysis, TableCategory};

fn pk(name: &str) -> Column {
    Column::new(name, "int").key(ColumnKey::Primary)
}

fn fk_column(name: &str, nullable: bool) -> Column {
    Column::new(name, "int")
        .key(ColumnKey::Multiple)
        .nullable(nullable)
}

fn position(analysis: &SchemaAnalysis, table: &str) -> usize {
    analysis
        .ordered_tables()
        .iter()
        .position(|t| t == table)
        .unwrap_or_else(|| panic!("{table} missing from order"))
}

/// users <- posts <- comments, plus a users/posts junction
fn blog_catalog() -> MemoryCatalog {
    MemoryCatalog::new()
        .table(
            "comments",
            vec![
                pk("id"),
                fk_column("post_id", false),
                fk_column("user_id", false),
                Column::new("body", "text"),
                Column::new("created_at", "datetime"),
            ],
        )
        .table(
            "posts",
            vec![
                pk("id"),
                fk_column("user_id", false),
                Column::new("title", "varchar"),
            ],
        )
        .table(
            "user_posts",
            vec![
                Column::new("user_id", "int").key(ColumnKey::Primary),
                Column::new("post_id", "int").key(ColumnKey::Primary),
            ],
        )
        .table("users", vec![pk("id"), Column::new("email", "varchar")])
        .view("recent_posts")
        .foreign_key("comments", "post_id", "posts", "id")
        .foreign_key("comments", "user_id", "users", "id")
        .foreign_key("posts", "user_id", "users", "id")
        .foreign_key("user_posts", "user_id", "users", "id")
        .foreign_key("user_posts", "post_id", "posts", "id")
}

/// employees.department_id <-> departments.manager_id
fn company_catalog() -> MemoryCatalog {
    MemoryCatalog::new()
        .table(
            "departments",
            vec![
                pk("id"),
                Column::new("name", "varchar"),
                fk_column("manager_id", true),
            ],
        )
        .table(
            "employees",
            vec![
                pk("id"),
                Column::new("name", "varchar"),
                fk_column("department_id", true),
            ],
        )
        .table("offices", vec![pk("id"), Column::new("city", "varchar")])
        .foreign_key("departments", "manager_id", "employees", "id")
        .foreign_key("employees", "department_id", "departments", "id")
}

#[test]
fn test_blog_schema_order() {
    let analysis = analyze(&blog_catalog()).unwrap();

    assert_eq!(
        analysis.ordered_tables(),
        vec!["users", "posts", "comments", "user_posts"]
    );
    assert!(analysis.circular_tables().is_empty());
    assert_eq!(analysis.many_to_many_tables(), vec!["user_posts"]);
}

#[test]
fn test_blog_schema_report() {
    let report = analyze(&blog_catalog()).unwrap().report();

    assert_eq!(report.tables.len(), 4);
    assert_eq!(report.views, vec!["recent_posts"]);
    assert_eq!(report.foreign_keys_by_table["comments"].len(), 2);
    assert_eq!(report.foreign_keys_by_table["posts"].len(), 1);
    assert!(!report.foreign_keys_by_table.contains_key("users"));
    assert_eq!(report.categories["users"], TableCategory::Standalone);
    assert_eq!(report.categories["posts"], TableCategory::Dependent);
    assert_eq!(report.categories["user_posts"], TableCategory::ManyToMany);
    assert!(report.direct_circular_pairs.is_empty());

    // One edge per referenced table, NOT NULL keys are required
    assert_eq!(report.dependencies["comments"].len(), 2);
    let posts = &report.dependencies["posts"];
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].table, "users");
    assert!(posts[0].required);
    assert!(!report.dependencies.contains_key("users"));
}

#[test]
fn test_nullable_dependency_is_optional() {
    let report = analyze(&company_catalog()).unwrap().report();

    let departments = &report.dependencies["departments"];
    assert_eq!(departments[0].table, "employees");
    assert!(!departments[0].required);
    assert_eq!(departments[0].weight, 2);
}

#[test]
fn test_not_null_dependencies_come_first() {
    let analysis = analyze(&blog_catalog()).unwrap();

    assert!(position(&analysis, "users") < position(&analysis, "posts"));
    assert!(position(&analysis, "posts") < position(&analysis, "comments"));
    assert!(position(&analysis, "users") < position(&analysis, "comments"));
}

#[test]
fn test_many_to_many_tables_are_last() {
    let analysis = analyze(&blog_catalog()).unwrap();
    let order = analysis.ordered_tables();
    assert_eq!(order.last().map(String::as_str), Some("user_posts"));
}

#[test]
fn test_two_table_cycle() {
    let analysis = analyze(&company_catalog()).unwrap();

    assert_eq!(analysis.circular_tables(), vec!["departments", "employees"]);
    assert_eq!(
        analysis.direct_circular_pairs(),
        vec![("departments".to_string(), "employees".to_string())]
    );
    // Standalone first, then circular tables by name
    assert_eq!(
        analysis.ordered_tables(),
        vec!["offices", "departments", "employees"]
    );

    let report = analysis.report();
    assert_eq!(report.categories["departments"], TableCategory::Circular);
    assert_eq!(report.categories["offices"], TableCategory::Standalone);
}

#[test]
fn test_three_table_cycle_found_by_reachability() {
    let catalog = MemoryCatalog::new()
        .table("a", vec![pk("id"), fk_column("b_id", true)])
        .table("b", vec![pk("id"), fk_column("c_id", true)])
        .table("c", vec![pk("id"), fk_column("a_id", true)])
        .table("d", vec![pk("id"), fk_column("a_id", false)])
        .foreign_key("a", "b_id", "b", "id")
        .foreign_key("b", "c_id", "c", "id")
        .foreign_key("c", "a_id", "a", "id")
        .foreign_key("d", "a_id", "a", "id");
    let analysis = analyze(&catalog).unwrap();

    assert_eq!(analysis.circular_tables(), vec!["a", "b", "c"]);
    // No table pair references each other directly
    assert!(analysis.cycles.direct_pairs.is_empty());
    assert_eq!(analysis.cycles.reachability_pairs.len(), 3);
    // A circular target does not hold back the dependent table
    assert_eq!(analysis.ordered_tables(), vec!["d", "a", "b", "c"]);
}

#[test]
fn test_self_reference_is_not_circular() {
    let catalog = MemoryCatalog::new()
        .table(
            "categories",
            vec![pk("id"), fk_column("parent_id", true)],
        )
        .foreign_key("categories", "parent_id", "categories", "id");
    let analysis = analyze(&catalog).unwrap();

    assert!(analysis.circular_tables().is_empty());
    assert_eq!(analysis.ordered_tables(), vec!["categories"]);
}

#[test]
fn test_no_foreign_keys_is_permutation() {
    let mut catalog = MemoryCatalog::new();
    let names = ["zeta", "alpha", "mid", "beta"];
    for name in names {
        catalog = catalog.table(name, vec![pk("id")]);
    }
    let analysis = analyze(&catalog).unwrap();

    let mut order = analysis.ordered_tables();
    assert!(analysis.circular_tables().is_empty());
    // Catalog order is kept for independent tables
    assert_eq!(order, names);
    order.sort();
    let mut expected: Vec<String> = names.iter().map(|s| s.to_string()).collect();
    expected.sort();
    assert_eq!(order, expected);
}

#[test]
fn test_analysis_is_deterministic() {
    let first = analyze(&company_catalog()).unwrap();
    let second = analyze(&company_catalog()).unwrap();

    assert_eq!(first.ordered_tables(), second.ordered_tables());
    assert_eq!(first.circular_tables(), second.circular_tables());
    assert_eq!(first.direct_circular_pairs(), second.direct_circular_pairs());
}

#[test]
fn test_report_serializes_to_json() {
    let report = analyze(&company_catalog()).unwrap().report();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["circular_tables"][0], "departments");
    assert_eq!(json["categories"]["employees"], "circular");
    assert_eq!(json["direct_circular_pairs"][0][1], "employees");
}
