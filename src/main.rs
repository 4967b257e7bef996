// Allow dead code for items that are part of the public API but only used in tests
#![allow(dead_code)]

mod catalog;
mod cmd;
mod config;
mod duckdb;
mod generator;
mod populate;
mod schema;
mod storage;
mod verify;

use clap::Parser;
use cmd::Cli;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = cmd::run(cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
