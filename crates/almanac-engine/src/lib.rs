//! Almanac Engine - collection and orchestration layer
//!
//! Drives the per-unit collector over a set of units, optionally in
//! parallel worker processes, and merges finished units into the catalog:
//! - `collector`: header scraping, validation, fiber maps, cross-match
//! - `worker`: the one-line JSON protocol spoken by worker processes
//! - `orchestrator`: runners and the cancellable fan-out
//! - `aggregator`: the only writer of the catalog during a run
//! - `run`: wiring a whole invocation together

#![allow(clippy::result_large_err)]

pub mod aggregator;
pub mod collector;
pub mod orchestrator;
pub mod run;
pub mod summary;
pub mod worker;

pub use aggregator::Aggregator;
pub use collector::{CollectorOptions, UnitCollector};
pub use orchestrator::{
    InProcessRunner, Orchestrator, ProcessRunner, ResultSink, UnitEvent, UnitRunner,
};
pub use run::{execute, run_units, RunReport, RunRequest, WorkerMode};
pub use summary::{RunStatus, RunSummary, UnitFailure};
pub use worker::WorkerReply;
