//! The default command: collect a date scope and merge it into a catalog

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use almanac_core::scope::ScopeOptions;
use almanac_core::time::{current_mjd, mjd_to_date};
use almanac_core::{enumerate_units, DateScope, SiteSelector, Unit, UnitCollection};
use almanac_engine::{execute as execute_run, CollectorOptions, RunRequest, RunStatus, WorkerMode};
use anyhow::Context;
use clap::Args;
use tokio_util::sync::CancellationToken;

use super::{init_logging, GlobalArgs, EXIT_CANCELLED};

#[derive(Debug, Args, Default)]
pub struct QueryArgs {
    /// Night as MJD; negative counts back from today
    #[arg(long, allow_hyphen_values = true)]
    pub mjd: Option<i32>,

    /// First night of a range (MJD; negative counts back from today)
    #[arg(long, allow_hyphen_values = true)]
    pub mjd_start: Option<i32>,

    /// Last night of a range (MJD; negative counts back from today)
    #[arg(long, allow_hyphen_values = true)]
    pub mjd_end: Option<i32>,

    /// Night as YYYY-MM-DD
    #[arg(long)]
    pub date: Option<String>,

    #[arg(long)]
    pub date_start: Option<String>,

    #[arg(long)]
    pub date_end: Option<String>,

    /// Apache Point only
    #[arg(long)]
    pub apo: bool,

    /// Las Campanas only
    #[arg(long)]
    pub lco: bool,

    /// Read fiber maps for science pointings
    #[arg(long, visible_alias = "fibres")]
    pub fibers: bool,

    /// With --fibers, skip cross-matching targets
    #[arg(long = "no-x-match")]
    pub no_x_match: bool,

    /// Catalog file to merge results into
    #[arg(short = 'O', long)]
    pub output: Option<PathBuf>,

    /// Worker processes; 0 or less uses one per CPU
    #[arg(short = 'p', long, allow_hyphen_values = true)]
    pub processes: Option<i64>,
}

impl QueryArgs {
    fn scope_options(&self) -> ScopeOptions {
        ScopeOptions {
            mjd: self.mjd,
            mjd_start: self.mjd_start,
            mjd_end: self.mjd_end,
            date: self.date.clone(),
            date_start: self.date_start.clone(),
            date_end: self.date_end.clone(),
        }
    }
}

pub fn execute(args: QueryArgs, global: &GlobalArgs) -> anyhow::Result<ExitCode> {
    let (config_path, config) = global.load_config()?;
    init_logging(&config, global.verbose);

    let scope = DateScope::from_options(&args.scope_options())?;
    let units = enumerate_units(
        SiteSelector::from_flags(args.apo, args.lco),
        &scope,
        current_mjd(),
        config.scope.earliest_mjd,
    )?;

    // without -p, a configured worker count above one means worker processes
    let processes = args.processes.or_else(|| {
        i64::try_from(config.runtime.workers)
            .ok()
            .filter(|&n| n > 1)
    });
    let request = RunRequest {
        units,
        options: CollectorOptions::new(args.fibers, !args.no_x_match),
        workers: WorkerMode::from_processes(processes),
        output: args.output,
        keep_collections: global.verbose >= 2,
        config_path: Some(config_path),
    };

    let grace = Duration::from_millis(config.runtime.cancel_grace_ms);
    let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
    let report = runtime.block_on(async {
        let cancel = CancellationToken::new();
        let interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received; abandoning outstanding units");
                interrupt.cancel();
            }
        });
        execute_run(&config, request, cancel).await
    });
    // an abandoned in-process unit may still occupy a blocking thread
    runtime.shutdown_timeout(grace);
    let report = report?;

    if global.verbose >= 2 {
        for collection in &report.collections {
            print_collection(collection);
        }
    }
    for failure in &report.summary.failed {
        eprintln!("{}: {}", failure.unit, failure.error);
    }
    println!("{}", report.summary);

    Ok(match report.status {
        RunStatus::Completed => ExitCode::SUCCESS,
        RunStatus::Cancelled => {
            eprintln!("cancelled; results not yet stored were discarded");
            ExitCode::from(EXIT_CANCELLED)
        }
    })
}

/// `apo/60000 (2023-02-25)`
fn unit_heading(unit: Unit) -> String {
    match mjd_to_date(unit.mjd) {
        Some(date) => format!("{} ({})", unit, date),
        None => unit.to_string(),
    }
}

fn print_collection(collection: &UnitCollection) {
    println!("{}", unit_heading(collection.unit));
    for sequence in &collection.sequences {
        println!("  sequence {}", sequence);
        for record in collection
            .exposures
            .iter()
            .filter(|r| sequence.contains(r.exposure))
        {
            println!(
                "    {:>4} {:<12} nread={:<3} {}{} {}",
                record.exposure,
                record.image_type.as_str(),
                record.n_read,
                record.pointing,
                if record.flagged_bad { " [bad]" } else { "" },
                record.comment
            );
        }
    }
    if let Some(maps) = &collection.fiber_maps {
        for map in maps {
            let resolved = map.rows.iter().filter(|r| r.sdss_id.is_some()).count();
            println!(
                "  fibers {}/{}: {} rows, {} cross-matched",
                map.scheme,
                map.identifier,
                map.rows.len(),
                resolved
            );
        }
    }
}
