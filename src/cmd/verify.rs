use super::{open_database, EXIT_INCOMPLETE};
use crate::catalog::CatalogReader;
use crate::verify::{verify, VerificationResult};
use std::path::PathBuf;

pub fn run(database: PathBuf, schema: String, min_records: u64, json: bool) -> anyhow::Result<()> {
    let db = open_database(&database, &schema)?;
    let tables = db.list_tables()?;
    let result = verify(&db, &tables, min_records)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_verification(&result);
    }

    if !result.success {
        std::process::exit(EXIT_INCOMPLETE);
    }
    Ok(())
}

pub(super) fn print_verification(result: &VerificationResult) {
    println!();
    if result.success {
        println!(
            "Verification: PASSED (every table has at least {} records)",
            result.min_records
        );
        return;
    }

    println!("Verification: FAILED");
    if !result.empty_tables.is_empty() {
        println!("  Empty tables:");
        for table in &result.empty_tables {
            println!("    - {}", table);
        }
    }
    if !result.partially_populated_tables.is_empty() {
        println!(
            "  Tables below {} records:",
            result.min_records
        );
        for shortfall in &result.partially_populated_tables {
            println!("    - {} ({} rows)", shortfall.table, shortfall.rows);
        }
    }
}
