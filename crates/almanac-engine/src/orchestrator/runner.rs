//! Unit runners: where a unit's collection actually executes

#![allow(clippy::result_large_err)]

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use almanac_core::errors::{ExError, ExErrorKind};
use almanac_core::{CollectOutcome, Unit};
use almanac_core_types::RunId;
use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::collector::{CollectorOptions, UnitCollector};
use crate::worker::{worker_args, WorkerReply, RUN_ID_ENV};

/// Error returned by a runner whose unit was abandoned
pub fn cancelled(unit: Unit) -> ExError {
    ExError::new(ExErrorKind::Cancelled)
        .with_op("run_unit")
        .with_unit(unit)
        .with_message("unit abandoned on cancellation")
}

#[async_trait]
pub trait UnitRunner: Send + Sync {
    /// Collect one unit. Must return promptly once `cancel` fires.
    async fn run(&self, unit: Unit, cancel: CancellationToken) -> Result<CollectOutcome, ExError>;
}

/// Runs the collector on tokio's blocking pool inside this process
pub struct InProcessRunner {
    collector: Arc<UnitCollector>,
}

impl InProcessRunner {
    pub fn new(collector: Arc<UnitCollector>) -> Self {
        Self { collector }
    }
}

#[async_trait]
impl UnitRunner for InProcessRunner {
    async fn run(&self, unit: Unit, cancel: CancellationToken) -> Result<CollectOutcome, ExError> {
        let collector = Arc::clone(&self.collector);
        let job = tokio::task::spawn_blocking(move || collector.collect(unit));

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                // a blocking job cannot be interrupted; its result is discarded
                Err(cancelled(unit))
            }
            joined = job => joined.map_err(|e| {
                ExError::new(ExErrorKind::Internal)
                    .with_op("run_unit")
                    .with_unit(unit)
                    .with_message(format!("collector task failed: {}", e))
            })?,
        }
    }
}

/// Runs each unit in a child process of `program`
pub struct ProcessRunner {
    program: PathBuf,
    /// Arguments placed before the worker arguments
    leading_args: Vec<String>,
    config_path: Option<PathBuf>,
    run_id: Option<RunId>,
    options: CollectorOptions,
    grace: Duration,
}

impl ProcessRunner {
    pub fn new(program: impl Into<PathBuf>, options: CollectorOptions, grace: Duration) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
            config_path: None,
            run_id: None,
            options,
            grace,
        }
    }

    pub fn with_config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    /// Exported to children so their log lines carry the run id
    pub fn with_run_id(mut self, run_id: RunId) -> Self {
        self.run_id = Some(run_id);
        self
    }

    pub fn with_leading_args(mut self, args: Vec<String>) -> Self {
        self.leading_args = args;
        self
    }

    fn command(&self, unit: Unit) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.leading_args)
            .args(worker_args(unit, self.options, self.config_path.as_deref()))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        // Own process group: a terminal interrupt reaches only the parent,
        // which cancels and reaps the workers itself
        #[cfg(unix)]
        command.process_group(0);
        if let Some(run_id) = &self.run_id {
            command.env(RUN_ID_ENV, run_id.as_str());
        }
        command
    }

    fn spawn_error(&self, unit: Unit, message: String) -> ExError {
        ExError::new(ExErrorKind::Collection)
            .with_op("spawn_worker")
            .with_unit(unit)
            .with_path(self.program.display().to_string())
            .with_message(message)
    }
}

#[async_trait]
impl UnitRunner for ProcessRunner {
    async fn run(&self, unit: Unit, cancel: CancellationToken) -> Result<CollectOutcome, ExError> {
        let mut child = self
            .command(unit)
            .spawn()
            .map_err(|e| self.spawn_error(unit, e.to_string()))?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| self.spawn_error(unit, "worker stdout not captured".to_string()))?;

        let read = async {
            let mut buf = Vec::new();
            stdout.read_to_end(&mut buf).await.map(|_| buf)
        };
        let finished = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            output = read => Some(output),
        };

        let Some(output) = finished else {
            let _ = child.start_kill();
            if tokio::time::timeout(self.grace, child.wait()).await.is_err() {
                tracing::warn!(unit = %unit, "worker not reaped within grace period");
            }
            return Err(cancelled(unit));
        };

        let stdout = output.map_err(|e| self.spawn_error(unit, e.to_string()))?;
        let status = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            status = child.wait() => Some(status),
        };
        let Some(status) = status else {
            let _ = child.start_kill();
            return Err(cancelled(unit));
        };
        let status = status.map_err(|e| self.spawn_error(unit, e.to_string()))?;
        if !status.success() && cancel.is_cancelled() {
            return Err(cancelled(unit));
        }

        match WorkerReply::parse(&stdout, unit) {
            Ok(reply) => reply.into_result(unit),
            Err(err) if !status.success() => Err(ExError::new(ExErrorKind::Collection)
                .with_op("run_unit")
                .with_unit(unit)
                .with_message(format!("worker exited with {}", status))
                .with_source(err)),
            Err(err) => Err(err),
        }
    }
}
