//! Export a stored catalog as CSV

use std::path::PathBuf;
use std::process::ExitCode;

use almanac_core::logging_facility::{init, Profile};
use almanac_store::export::{export_exposures, export_fibers};
use almanac_store::{CatalogStore, WriteOptions};
use anyhow::{bail, Context};
use clap::{Args, Subcommand};

use super::GlobalArgs;

#[derive(Debug, Args)]
pub struct DumpArgs {
    #[command(subcommand)]
    pub command: DumpCommand,
}

#[derive(Debug, Subcommand)]
pub enum DumpCommand {
    /// One row per stored exposure
    Exposures(DumpTarget),
    /// One row per stored fiber, tagged with its unit and pointing
    Fibers(DumpTarget),
}

#[derive(Debug, Args)]
pub struct DumpTarget {
    /// Catalog written by a previous query
    pub catalog: PathBuf,

    /// CSV file to write
    pub output: PathBuf,

    /// Replace the output file if it exists
    #[arg(long)]
    pub overwrite: bool,
}

pub fn execute(args: DumpArgs, global: &GlobalArgs) -> anyhow::Result<ExitCode> {
    init(if global.verbose > 0 {
        Profile::Development
    } else {
        Profile::Quiet
    });

    let (target, exposures) = match &args.command {
        DumpCommand::Exposures(target) => (target, true),
        DumpCommand::Fibers(target) => (target, false),
    };

    // opening would otherwise create an empty catalog
    if !target.catalog.is_file() {
        bail!("no catalog at {}", target.catalog.display());
    }
    let store = CatalogStore::open(&target.catalog, WriteOptions::default())
        .with_context(|| format!("opening catalog {}", target.catalog.display()))?;

    let report = if exposures {
        export_exposures(&store, &target.output, target.overwrite)?
    } else {
        export_fibers(&store, &target.output, target.overwrite)?
    };

    println!(
        "wrote {} rows from {} units to {}",
        report.rows,
        report.units,
        target.output.display()
    );
    Ok(ExitCode::SUCCESS)
}
