//! Almanac CLI
//!
//! Command-line interface for the exposure almanac

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "almanac")]
#[command(about = "Almanac - catalog APOGEE exposures by site and night", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    query: commands::query::QueryArgs,

    /// Configuration file (default: $ALMANAC_CONFIG, then ~/.almanac/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More output; repeat for more
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Collect one unit and answer on stdout (used by --processes)
    #[command(hide = true)]
    Worker(commands::worker::WorkerArgs),
    /// Write a stored catalog out as CSV
    Dump(commands::dump::DumpArgs),
    /// Configuration
    Config(commands::config::ConfigArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let global = commands::GlobalArgs {
        config: cli.config,
        verbose: cli.verbose,
    };

    let result = match cli.command {
        Some(Commands::Worker(args)) => commands::worker::execute(args, &global),
        Some(Commands::Dump(args)) => commands::dump::execute(args, &global),
        Some(Commands::Config(args)) => commands::config::execute(args, &global),
        None => commands::query::execute(cli.query, &global),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(commands::EXIT_FAILURE)
        }
    }
}
