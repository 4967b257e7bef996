mod analyze;
mod populate;
mod verify;

use crate::duckdb::DuckDb;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use std::io;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Exit code when a table failed or verification fell short
pub const EXIT_INCOMPLETE: i32 = 2;

#[derive(Parser)]
#[command(name = "sql-populator")]
#[command(version)]
#[command(
    about = "Populate a database schema with synthetic records while respecting foreign keys",
    long_about = None
)]
pub struct Cli {
    /// Log verbosity on stderr
    #[arg(long, global = true, value_enum, env = "SQL_POPULATOR_LOG_LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze the schema: dependencies, cycles, junction tables and insertion order
    Analyze {
        /// DuckDB database file
        #[arg(env = "SQL_POPULATOR_DATABASE")]
        database: PathBuf,

        /// Schema to introspect
        #[arg(long, default_value = crate::duckdb::DEFAULT_SCHEMA)]
        schema: String,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Fill every table with synthetic records in dependency order
    Populate {
        /// DuckDB database file
        #[arg(env = "SQL_POPULATOR_DATABASE")]
        database: PathBuf,

        /// Schema to introspect and populate
        #[arg(long, default_value = crate::duckdb::DEFAULT_SCHEMA)]
        schema: String,

        /// Records per table (junction tables are sized from their referenced tables)
        #[arg(short, long)]
        records: Option<usize>,

        /// Random seed for reproducible runs
        #[arg(long)]
        seed: Option<u64>,

        /// Rows per insert transaction
        #[arg(long)]
        batch_size: Option<usize>,

        /// YAML config file for per-table settings
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Check row counts after populating
        #[arg(long)]
        verify: bool,

        /// Minimum rows per table for --verify
        #[arg(long)]
        min_records: Option<u64>,

        /// Print the analysis and stop
        #[arg(long)]
        analyze_only: bool,

        /// Generate records in memory without writing to the database
        #[arg(long)]
        dry_run: bool,

        /// Show progress during population
        #[arg(short, long)]
        progress: bool,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that every table holds a minimum number of rows
    Verify {
        /// DuckDB database file
        #[arg(env = "SQL_POPULATOR_DATABASE")]
        database: PathBuf,

        /// Schema to check
        #[arg(long, default_value = crate::duckdb::DEFAULT_SCHEMA)]
        schema: String,

        /// Minimum rows per table
        #[arg(long, default_value_t = 1)]
        min_records: u64,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Install the stderr log subscriber.
///
/// An explicit level wins over `RUST_LOG`; without either, `info`.
pub fn init_logging(level: Option<LogLevel>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level.as_str()),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    // A second init (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

/// Open an existing database file; never create one by accident
fn open_database(path: &Path, schema: &str) -> anyhow::Result<DuckDb> {
    if !path.exists() {
        anyhow::bail!("database file does not exist: {}", path.display());
    }
    Ok(DuckDb::open(path)?.with_schema(schema))
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    init_logging(cli.log_level);

    match cli.command {
        Commands::Analyze {
            database,
            schema,
            json,
        } => analyze::run(database, schema, json),
        Commands::Populate {
            database,
            schema,
            records,
            seed,
            batch_size,
            config,
            verify,
            min_records,
            analyze_only,
            dry_run,
            progress,
            json,
        } => populate::run(populate::PopulateArgs {
            database,
            schema,
            records,
            seed,
            batch_size,
            config,
            verify,
            min_records,
            analyze_only,
            dry_run,
            progress,
            json,
        }),
        Commands::Verify {
            database,
            schema,
            min_records,
            json,
        } => verify::run(database, schema, min_records, json),
        Commands::Completions { shell } => {
            generate(
                shell,
                &mut Cli::command(),
                "sql-populator",
                &mut io::stdout(),
            );
            Ok(())
        }
    }
}
