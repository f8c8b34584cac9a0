//! Parallel fan-out of units over a runner
//!
//! Every unit becomes one task in a `JoinSet`, gated by a semaphore sized to
//! the worker budget. Finished units travel back over a channel to a single
//! [`ResultSink`] in completion order. Cancelling the caller's token
//! abandons everything still outstanding: runners are told to stop through a
//! child token (process runners kill their child at once), the tasks get the
//! grace period to unwind, and whatever is left is aborted. Results that
//! arrived but were not yet handed to the sink are dropped.

#![allow(clippy::result_large_err)]

pub mod runner;

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use almanac_core::errors::{ExError, ExErrorKind};
use almanac_core::{log_op_end, log_op_error, log_op_start, CollectOutcome, Unit};
use futures::FutureExt;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::summary::RunStatus;

pub use runner::{InProcessRunner, ProcessRunner, UnitRunner};

/// Grace period used when none is configured
pub const DEFAULT_GRACE: Duration = Duration::from_millis(2_000);

/// One finished unit
#[derive(Debug)]
pub struct UnitEvent {
    pub unit: Unit,
    pub result: Result<CollectOutcome, ExError>,
    pub elapsed: Duration,
}

/// Consumer of finished units
///
/// Called from one task only, one event at a time.
pub trait ResultSink {
    /// # Errors
    ///
    /// An error aborts the whole run: outstanding units are abandoned and
    /// the error is returned from [`Orchestrator::drive`].
    fn accept(&mut self, event: UnitEvent) -> Result<(), ExError>;
}

pub struct Orchestrator {
    runner: Arc<dyn UnitRunner>,
    workers: usize,
    grace: Duration,
}

impl Orchestrator {
    /// `workers` is clamped to at least one
    pub fn new(runner: Arc<dyn UnitRunner>, workers: usize) -> Self {
        Self {
            runner,
            workers: workers.max(1),
            grace: DEFAULT_GRACE,
        }
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run every unit and feed the results to `sink`
    ///
    /// Returns [`RunStatus::Cancelled`] if `cancel` fired before all units
    /// were delivered.
    ///
    /// # Errors
    ///
    /// Only errors returned by the sink. Per-unit failures are delivered to
    /// the sink as events.
    pub async fn drive<S>(
        &self,
        units: &[Unit],
        cancel: &CancellationToken,
        sink: &mut S,
    ) -> Result<RunStatus, ExError>
    where
        S: ResultSink + ?Sized,
    {
        let start = Instant::now();
        log_op_start!(
            "orchestrate",
            n_units = units.len() as u64,
            workers = self.workers as u64
        );

        let worker_cancel = cancel.child_token();
        let permits = Arc::new(Semaphore::new(self.workers));
        let (tx, mut rx) = mpsc::unbounded_channel::<UnitEvent>();
        let mut tasks = JoinSet::new();

        for &unit in units {
            let runner = Arc::clone(&self.runner);
            let permits = Arc::clone(&permits);
            let token = worker_cancel.clone();
            let tx = tx.clone();
            tasks.spawn(async move {
                let _permit = tokio::select! {
                    biased;
                    _ = token.cancelled() => return,
                    permit = permits.acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => return,
                    },
                };
                let started = Instant::now();
                let result = AssertUnwindSafe(runner.run(unit, token.clone()))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|_| {
                        Err(ExError::new(ExErrorKind::Internal)
                            .with_op("run_unit")
                            .with_unit(unit)
                            .with_message("runner panicked"))
                    });
                let _ = tx.send(UnitEvent {
                    unit,
                    result,
                    elapsed: started.elapsed(),
                });
            });
        }
        drop(tx);

        let mut delivered = 0u64;
        let status = loop {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => break RunStatus::Cancelled,
                event = rx.recv() => event,
            };
            let Some(event) = event else {
                break RunStatus::Completed;
            };
            tracing::debug!(
                unit = %event.unit,
                elapsed_ms = event.elapsed.as_millis() as u64,
                ok = event.result.is_ok(),
                "unit finished"
            );
            if let Err(err) = sink.accept(event) {
                self.abandon(&worker_cancel, &mut tasks).await;
                log_op_error!(
                    "orchestrate",
                    err.clone(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    n_delivered = delivered
                );
                return Err(err);
            }
            delivered += 1;
        };

        match status {
            RunStatus::Cancelled => {
                self.abandon(&worker_cancel, &mut tasks).await;
                tracing::warn!(
                    n_delivered = delivered,
                    n_abandoned = units.len() as u64 - delivered,
                    "run cancelled"
                );
            }
            RunStatus::Completed => while tasks.join_next().await.is_some() {},
        }

        log_op_end!(
            "orchestrate",
            duration_ms = start.elapsed().as_millis() as u64,
            n_delivered = delivered,
            status = %status
        );
        Ok(status)
    }

    async fn abandon(&self, worker_cancel: &CancellationToken, tasks: &mut JoinSet<()>) {
        worker_cancel.cancel();
        let drained = tokio::time::timeout(self.grace, async {
            while tasks.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            tracing::warn!(
                n_tasks = tasks.len() as u64,
                "workers still running after grace period; aborting"
            );
            tasks.abort_all();
            while tasks.join_next().await.is_some() {}
        }
    }
}
