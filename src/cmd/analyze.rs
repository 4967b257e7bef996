use super::open_database;
use crate::schema::{analyze, AnalysisReport};
use std::path::PathBuf;
use std::time::Instant;

pub fn run(database: PathBuf, schema: String, json: bool) -> anyhow::Result<()> {
    let db = open_database(&database, &schema)?;

    let start_time = Instant::now();
    let analysis = analyze(&db)?;
    let elapsed = start_time.elapsed();
    let report = analysis.report();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "Analyzed schema '{}' of {} in {:.3?}\n",
        schema,
        database.display(),
        elapsed
    );
    print_report(&report);
    Ok(())
}

/// Human-readable analysis report
pub(super) fn print_report(report: &AnalysisReport) {
    let fk_count: usize = report.foreign_keys_by_table.values().map(Vec::len).sum();

    println!("Statistics:");
    println!("  Tables:              {}", report.tables.len());
    println!("  Views:               {}", report.views.len());
    println!("  Foreign keys:        {}", fk_count);
    println!("  Many-to-many tables: {}", report.many_to_many_tables.len());
    println!("  Circular tables:     {}", report.circular_tables.len());
    println!();

    if report.tables.is_empty() {
        println!("No tables found.");
        return;
    }

    println!("{:<40} {:>16} {:>12}", "Table Name", "Category", "FKs");
    println!("{}", "─".repeat(70));
    for table in &report.tables {
        let category = report
            .categories
            .get(table)
            .map(|c| c.to_string())
            .unwrap_or_default();
        let fks = report
            .foreign_keys_by_table
            .get(table)
            .map_or(0, Vec::len);
        println!(
            "{:<40} {:>16} {:>12}",
            truncate_string(table, 40),
            category,
            fks
        );
    }
    println!();

    if !report.dependencies.is_empty() {
        println!("Dependencies:");
        for (table, edges) in &report.dependencies {
            for edge in edges {
                let kind = if edge.required { "required" } else { "optional" };
                println!("  {} -> {} ({})", table, edge.table, kind);
            }
        }
        println!();
    }

    if !report.direct_circular_pairs.is_empty() {
        println!("Circular dependencies:");
        for (a, b) in &report.direct_circular_pairs {
            println!("  {} <-> {}", a, b);
        }
        println!();
    }

    if !report.many_to_many_tables.is_empty() {
        println!("Many-to-many tables:");
        for table in &report.many_to_many_tables {
            println!("  {}", table);
        }
        println!();
    }

    println!("Insertion order:");
    for (i, table) in report.ordered_tables.iter().enumerate() {
        println!("  {:>3}. {}", i + 1, table);
    }
}

fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}
