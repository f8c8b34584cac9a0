//! Worker process protocol
//!
//! A worker collects exactly one unit and writes exactly one JSON
//! [`WorkerReply`] line to stdout. Logs go to stderr.

#![allow(clippy::result_large_err)]

use std::path::Path;

use almanac_core::errors::{ExError, ExErrorKind};
use almanac_core::{AlmanacConfig, CollectOutcome, Unit};
use serde::{Deserialize, Serialize};

use crate::collector::{CollectorOptions, UnitCollector};

/// Hidden CLI subcommand that runs a worker
pub const WORKER_SUBCOMMAND: &str = "worker";

/// Environment variable carrying the parent's run id
pub const RUN_ID_ENV: &str = "ALMANAC_RUN_ID";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WorkerReply {
    Done { outcome: CollectOutcome },
    Failed {
        code: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        op: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<String>,
        message: String,
    },
}

impl WorkerReply {
    pub fn from_result(result: Result<CollectOutcome, ExError>) -> Self {
        match result {
            Ok(outcome) => WorkerReply::Done { outcome },
            Err(err) => WorkerReply::Failed {
                code: err.code().to_string(),
                op: err.op().map(str::to_string),
                path: err.path().map(str::to_string),
                message: err.message().to_string(),
            },
        }
    }

    /// Back into the runner's result type, attributing failures to `unit`
    pub fn into_result(self, unit: Unit) -> Result<CollectOutcome, ExError> {
        match self {
            WorkerReply::Done { outcome } if outcome.unit() == unit => Ok(outcome),
            WorkerReply::Done { outcome } => Err(protocol_error(
                unit,
                format!("worker answered for {} instead", outcome.unit()),
            )),
            WorkerReply::Failed {
                code,
                op,
                path,
                message,
            } => {
                let kind = ExErrorKind::from_code(&code).unwrap_or(ExErrorKind::Collection);
                let mut err = ExError::new(kind)
                    .with_op(op.unwrap_or_else(|| "collect_unit".to_string()))
                    .with_unit(unit)
                    .with_message(message);
                if let Some(path) = path {
                    err = err.with_path(path);
                }
                Err(err)
            }
        }
    }

    pub fn to_line(&self) -> Result<String, ExError> {
        serde_json::to_string(self).map_err(|e| {
            ExError::new(ExErrorKind::Serialization)
                .with_op("worker_reply")
                .with_message(e.to_string())
        })
    }

    /// The last non-empty line of a worker's stdout
    pub fn parse(stdout: &[u8], unit: Unit) -> Result<Self, ExError> {
        let text = String::from_utf8_lossy(stdout);
        let line = text
            .lines()
            .rev()
            .find(|l| !l.trim().is_empty())
            .ok_or_else(|| protocol_error(unit, "worker wrote no reply".to_string()))?;
        serde_json::from_str(line)
            .map_err(|e| protocol_error(unit, format!("unreadable worker reply: {}", e)))
    }
}

fn protocol_error(unit: Unit, message: String) -> ExError {
    ExError::new(ExErrorKind::WorkerProtocol)
        .with_op("worker_reply")
        .with_unit(unit)
        .with_message(message)
}

/// Command-line arguments that make the binary collect `unit` as a worker
pub fn worker_args(unit: Unit, options: CollectorOptions, config_path: Option<&Path>) -> Vec<String> {
    let mut args = vec![
        WORKER_SUBCOMMAND.to_string(),
        "--site".to_string(),
        unit.site.to_string(),
        "--mjd".to_string(),
        unit.mjd.to_string(),
    ];
    if options.fibers {
        args.push("--fibers".to_string());
        if !options.cross_match {
            args.push("--no-x-match".to_string());
        }
    }
    if let Some(path) = config_path {
        args.push("--config".to_string());
        args.push(path.display().to_string());
    }
    args
}

/// Body of a worker process
pub fn run_worker(config: &AlmanacConfig, unit: Unit, options: CollectorOptions) -> WorkerReply {
    let result =
        UnitCollector::from_config(config, options).and_then(|collector| collector.collect(unit));
    WorkerReply::from_result(result)
}
