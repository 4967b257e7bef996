use super::{analyze::print_report, open_database, EXIT_INCOMPLETE};
use crate::config::PopulateYamlConfig;
use crate::generator::FakeGenerator;
use crate::populate::{
    PopulateOptions, PopulationResult, Populator, DEFAULT_BATCH_SIZE, DEFAULT_RECORDS,
};
use crate::schema::{analyze, SchemaAnalysis};
use crate::storage::{MemoryStore, StorageWriter};
use crate::verify::{verify, VerificationResult};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

pub struct PopulateArgs {
    pub database: PathBuf,
    pub schema: String,
    pub records: Option<usize>,
    pub seed: Option<u64>,
    pub batch_size: Option<usize>,
    pub config: Option<PathBuf>,
    pub verify: bool,
    pub min_records: Option<u64>,
    pub analyze_only: bool,
    pub dry_run: bool,
    pub progress: bool,
    pub json: bool,
}

/// JSON output for a populate run
#[derive(Serialize)]
struct PopulateJsonOutput<'a> {
    database: String,
    dry_run: bool,
    elapsed_secs: f64,
    population: &'a PopulationResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    verification: Option<&'a VerificationResult>,
}

/// Merge CLI flags over the YAML config over built-in defaults
fn build_options(
    args: &PopulateArgs,
    config: &PopulateYamlConfig,
    analysis: &SchemaAnalysis,
) -> PopulateOptions {
    let mut options = PopulateOptions {
        records: args
            .records
            .or(config.default.records)
            .unwrap_or(DEFAULT_RECORDS),
        batch_size: args
            .batch_size
            .or(config.default.batch_size)
            .unwrap_or(DEFAULT_BATCH_SIZE),
        seed: args.seed.or(config.default.seed),
        ..Default::default()
    };

    for table in analysis.schema.iter() {
        if config.should_skip(&table.name) {
            options.skip_tables.insert(table.name.clone());
        } else if let Some(records) = config.get_records(&table.name) {
            options.table_records.insert(table.name.clone(), records);
        }
    }
    options
}

fn progress_bar(tables: usize) -> ProgressBar {
    let pb = ProgressBar::new(tables as u64);
    if let Ok(style) = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} tables {msg}",
    ) {
        pb.set_style(
            style
                .progress_chars("█▓▒░  ")
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );
    }
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

pub fn run(args: PopulateArgs) -> anyhow::Result<()> {
    let mut db = open_database(&args.database, &args.schema)?;
    let config = match &args.config {
        Some(path) => PopulateYamlConfig::load(path)?,
        None => PopulateYamlConfig::default(),
    };

    let analysis = analyze(&db)?;

    if args.analyze_only {
        if args.json {
            println!("{}", serde_json::to_string_pretty(&analysis.report())?);
        } else {
            print_report(&analysis.report());
        }
        return Ok(());
    }

    let mut options = build_options(&args, &config, &analysis);
    // One seed drives both the orchestrator and the value generator
    let seed = *options.seed.get_or_insert_with(rand::random);
    let min_records = args.min_records.or(config.default.min_records).unwrap_or(1);

    let mut memory = MemoryStore::new();
    let storage: &mut dyn StorageWriter = if args.dry_run {
        info!("Dry run: records are generated in memory only");
        &mut memory
    } else {
        &mut db
    };

    let start_time = Instant::now();
    let pb = args.progress.then(|| progress_bar(analysis.order.len()));

    let mut generator = FakeGenerator::new(seed);
    let result = {
        let mut populator = Populator::new(&analysis, storage, &mut generator, options);
        if let Some(pb) = pb.clone() {
            populator = populator.on_table(move |table| {
                pb.set_message(table.to_string());
                pb.inc(1);
            });
        }
        populator.populate()
    };

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    let verification = if args.verify {
        // Skipped tables are empty on purpose
        let tables: Vec<String> = analysis
            .ordered_tables()
            .into_iter()
            .filter(|t| !result.skipped_tables.contains(t))
            .collect();
        Some(verify(&*storage, &tables, min_records)?)
    } else {
        None
    };
    let elapsed = start_time.elapsed();

    if args.json {
        let output = PopulateJsonOutput {
            database: args.database.display().to_string(),
            dry_run: args.dry_run,
            elapsed_secs: elapsed.as_secs_f64(),
            population: &result,
            verification: verification.as_ref(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_summary(&result, args.dry_run, elapsed);
        if let Some(verification) = &verification {
            super::verify::print_verification(verification);
        }
    }

    let verified = verification.as_ref().map_or(true, |v| v.success);
    if !result.is_success() || !verified {
        std::process::exit(EXIT_INCOMPLETE);
    }
    Ok(())
}

fn print_summary(result: &PopulationResult, dry_run: bool, elapsed: std::time::Duration) {
    let verb = if dry_run { "Generated" } else { "Inserted" };
    println!(
        "{} {} records in {:.3?} (seed {})\n",
        verb, result.total_records_inserted, elapsed, result.seed
    );

    println!("{:<40} {:>12}", "Table Name", "Records");
    println!("{}", "─".repeat(53));
    for (table, count) in &result.records_per_table {
        println!("{:<40} {:>12}", table, count);
    }
    println!("{}", "─".repeat(53));
    println!("{:<40} {:>12}", "TOTAL", result.total_records_inserted);
    println!();

    println!("Successful tables: {}", result.successful_tables.len());
    if !result.skipped_tables.is_empty() {
        println!("Skipped tables:    {}", result.skipped_tables.join(", "));
    }
    if result.failed_tables.is_empty() {
        println!("Failed tables:     0");
    } else {
        println!("Failed tables:     {}", result.failed_tables.len());
        for failed in &result.failed_tables {
            println!("  ✗ {}: {}", failed.table, failed.reason);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::memory::MemoryCatalog;
    use crate::schema::{Column, ColumnKey};

    fn args() -> PopulateArgs {
        PopulateArgs {
            database: PathBuf::from("app.duckdb"),
            schema: "main".to_string(),
            records: None,
            seed: None,
            batch_size: None,
            config: None,
            verify: false,
            min_records: None,
            analyze_only: false,
            dry_run: true,
            progress: false,
            json: false,
        }
    }

    fn analysis() -> SchemaAnalysis {
        let catalog = MemoryCatalog::new()
            .table("users", vec![Column::new("id", "int").key(ColumnKey::Primary)])
            .table("audit_log", vec![Column::new("id", "int")]);
        analyze(&catalog).unwrap()
    }

    #[test]
    fn test_defaults_without_flags_or_config() {
        let options = build_options(&args(), &PopulateYamlConfig::default(), &analysis());
        assert_eq!(options.records, DEFAULT_RECORDS);
        assert_eq!(options.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(options.seed, None);
    }

    #[test]
    fn test_cli_overrides_config() {
        let config: PopulateYamlConfig = serde_yaml::from_str(
            "default:\n  records: 25\n  batch_size: 50\n  seed: 42\n\
             tables:\n  AUDIT_LOG:\n    skip: true\n  users:\n    records: 100\n",
        )
        .unwrap();
        let mut cli = args();
        cli.records = Some(5);

        let options = build_options(&cli, &config, &analysis());
        assert_eq!(options.records, 5);
        assert_eq!(options.batch_size, 50);
        assert_eq!(options.seed, Some(42));
        assert!(options.is_skipped("audit_log"));
        assert_eq!(options.records_for("users"), 100);
    }
}
