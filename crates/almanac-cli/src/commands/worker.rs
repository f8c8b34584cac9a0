//! Hidden worker subcommand: collect one unit, answer with one JSON line

use std::process::ExitCode;

use almanac_core::errors::{ExError, ExErrorKind};
use almanac_core::logging_facility::{init, Profile};
use almanac_core::{Site, Unit};
use almanac_engine::worker::{run_worker, RUN_ID_ENV};
use almanac_engine::{CollectorOptions, WorkerReply};
use anyhow::Context;
use clap::Args;

use super::GlobalArgs;

#[derive(Debug, Args)]
pub struct WorkerArgs {
    #[arg(long)]
    pub site: Site,

    #[arg(long, allow_hyphen_values = true)]
    pub mjd: i32,

    #[arg(long, visible_alias = "fibres")]
    pub fibers: bool,

    #[arg(long = "no-x-match")]
    pub no_x_match: bool,
}

pub fn execute(args: WorkerArgs, global: &GlobalArgs) -> anyhow::Result<ExitCode> {
    init(Profile::Quiet);

    let run_id = std::env::var(RUN_ID_ENV).unwrap_or_default();
    let span = tracing::info_span!("worker", run_id = %run_id);
    let _entered = span.enter();

    let unit = Unit::new(args.site, args.mjd);
    let reply = match global.load_config() {
        Ok((_, config)) => run_worker(
            &config,
            unit,
            CollectorOptions::new(args.fibers, !args.no_x_match),
        ),
        Err(err) => WorkerReply::from_result(Err(ExError::new(ExErrorKind::Collection)
            .with_op("load_config")
            .with_unit(unit)
            .with_path(global.config_path().display().to_string())
            .with_message(format!("{:#}", err)))),
    };

    // the parent reads exactly this line
    println!("{}", reply.to_line().context("encoding worker reply")?);
    Ok(ExitCode::SUCCESS)
}
