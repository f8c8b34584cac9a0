//! One query invocation, end to end

#![allow(clippy::result_large_err)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use almanac_core::errors::{ExError, ExErrorKind};
use almanac_core::{log_op_end, log_op_error, log_op_start, AlmanacConfig, Unit, UnitCollection};
use almanac_core_types::RunId;
use almanac_store::{CatalogStore, WriteOptions};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::aggregator::Aggregator;
use crate::collector::{CollectorOptions, UnitCollector};
use crate::orchestrator::{InProcessRunner, Orchestrator, ProcessRunner, UnitRunner};
use crate::summary::{RunStatus, RunSummary};

/// Where units are collected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerMode {
    /// One unit at a time, inside this process
    InProcess,
    /// Up to `n` concurrent worker processes
    Processes(usize),
}

impl WorkerMode {
    /// `None` runs in-process; zero or a negative count means one per CPU
    pub fn from_processes(processes: Option<i64>) -> Self {
        match processes {
            None => WorkerMode::InProcess,
            Some(n) if n <= 0 => WorkerMode::Processes(
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1),
            ),
            Some(n) => WorkerMode::Processes(usize::try_from(n).unwrap_or(1)),
        }
    }

    pub fn workers(&self) -> usize {
        match self {
            WorkerMode::InProcess => 1,
            WorkerMode::Processes(n) => (*n).max(1),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunRequest {
    pub units: Vec<Unit>,
    pub options: CollectorOptions,
    pub workers: WorkerMode,
    /// Catalog to merge into; `None` collects without storing
    pub output: Option<PathBuf>,
    /// Keep collected units for presentation
    pub keep_collections: bool,
    /// Configuration file handed to worker processes
    pub config_path: Option<PathBuf>,
}

#[derive(Debug)]
pub struct RunReport {
    pub status: RunStatus,
    pub summary: RunSummary,
    pub collections: Vec<UnitCollection>,
}

/// Runner for the requested worker mode
///
/// # Errors
///
/// In-process: the collector could not be built from the configuration.
/// Processes: the path of the running executable is unknown.
pub fn build_runner(
    config: &AlmanacConfig,
    request: &RunRequest,
    run_id: &RunId,
) -> Result<Arc<dyn UnitRunner>, ExError> {
    match request.workers {
        WorkerMode::InProcess => {
            let collector = UnitCollector::from_config(config, request.options)?;
            Ok(Arc::new(InProcessRunner::new(Arc::new(collector))))
        }
        WorkerMode::Processes(_) => {
            let program = std::env::current_exe().map_err(|e| {
                ExError::new(ExErrorKind::Internal)
                    .with_op("build_runner")
                    .with_message(format!("cannot locate worker executable: {}", e))
            })?;
            Ok(Arc::new(
                ProcessRunner::new(program, request.options, grace_period(config))
                    .with_config_path(request.config_path.clone())
                    .with_run_id(run_id.clone()),
            ))
        }
    }
}

fn grace_period(config: &AlmanacConfig) -> Duration {
    Duration::from_millis(config.runtime.cancel_grace_ms)
}

/// Collect every requested unit and merge results into the output catalog
///
/// # Errors
///
/// Store failures (opening the catalog or merging a unit) and runner
/// construction failures. Per-unit collection failures are reported in the
/// summary instead.
pub async fn execute(
    config: &AlmanacConfig,
    request: RunRequest,
    cancel: CancellationToken,
) -> Result<RunReport, ExError> {
    let run_id = RunId::new();
    let runner = build_runner(config, &request, &run_id)?;
    let store = request
        .output
        .as_ref()
        .map(|path| CatalogStore::open(path, WriteOptions::from(&config.store)))
        .transpose()?;

    let orchestrator =
        Orchestrator::new(runner, request.workers.workers()).with_grace(grace_period(config));
    let aggregator = Aggregator::new(store, run_id).keep_collections(request.keep_collections);
    run_units(&orchestrator, &request.units, aggregator, cancel).await
}

/// Drive `units` through `orchestrator` into `aggregator`
pub async fn run_units(
    orchestrator: &Orchestrator,
    units: &[Unit],
    mut aggregator: Aggregator,
    cancel: CancellationToken,
) -> Result<RunReport, ExError> {
    let run_id = aggregator.summary().run_id.clone();
    let span = tracing::info_span!("run", run_id = %run_id);

    async move {
        let start = Instant::now();
        log_op_start!(
            "run",
            n_units = units.len() as u64,
            workers = orchestrator.workers() as u64
        );

        let status = match orchestrator.drive(units, &cancel, &mut aggregator).await {
            Ok(status) => status,
            Err(err) => {
                log_op_error!(
                    "run",
                    err.clone(),
                    duration_ms = start.elapsed().as_millis() as u64
                );
                return Err(err);
            }
        };

        let (summary, collections, _store) = aggregator.into_parts();
        log_op_end!(
            "run",
            duration_ms = start.elapsed().as_millis() as u64,
            status = %status,
            n_stored = summary.stored.len() as u64,
            n_failed = summary.failed.len() as u64
        );
        Ok(RunReport {
            status,
            summary,
            collections,
        })
    }
    .instrument(span)
    .await
}
