//! The single consumer of unit results and the only catalog writer of a run

#![allow(clippy::result_large_err)]

use almanac_core::errors::{ExError, ExErrorKind};
use almanac_core::{CollectOutcome, UnitCollection};
use almanac_core_types::RunId;
use almanac_store::CatalogStore;

use crate::orchestrator::{ResultSink, UnitEvent};
use crate::summary::RunSummary;

pub struct Aggregator {
    store: Option<CatalogStore>,
    summary: RunSummary,
    keep_collections: bool,
    collections: Vec<UnitCollection>,
}

impl Aggregator {
    /// Without a store, results are only counted (and kept, if asked)
    pub fn new(store: Option<CatalogStore>, run_id: RunId) -> Self {
        Self {
            store,
            summary: RunSummary::new(run_id),
            keep_collections: false,
            collections: Vec::new(),
        }
    }

    /// Keep every collected unit for presentation after the run
    pub fn keep_collections(mut self, keep: bool) -> Self {
        self.keep_collections = keep;
        self
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    pub fn store(&self) -> Option<&CatalogStore> {
        self.store.as_ref()
    }

    pub fn into_parts(self) -> (RunSummary, Vec<UnitCollection>, Option<CatalogStore>) {
        (self.summary, self.collections, self.store)
    }
}

impl ResultSink for Aggregator {
    fn accept(&mut self, event: UnitEvent) -> Result<(), ExError> {
        let unit = event.unit;
        match event.result {
            Ok(CollectOutcome::Collected(collection)) => {
                let stored = match self.store.as_mut() {
                    Some(store) => {
                        let report = store.merge_unit(&collection)?;
                        tracing::info!(
                            unit = %unit,
                            sections = report.sections_written as u64,
                            digest = %report.digest,
                            "unit stored"
                        );
                        true
                    }
                    None => false,
                };
                self.summary.record_collected(&collection, stored);
                if self.keep_collections {
                    self.collections.push(collection);
                }
            }
            Ok(CollectOutcome::NoData { .. }) => {
                tracing::info!(unit = %unit, "no exposures");
                self.summary.record_no_data(unit);
            }
            Err(err) if err.kind() == ExErrorKind::Cancelled => {
                tracing::debug!(unit = %unit, "unit abandoned");
            }
            Err(err) => {
                tracing::warn!(
                    unit = %unit,
                    err_code = err.code(),
                    error = %err,
                    "unit failed; continuing"
                );
                self.summary.record_failure(unit, err);
            }
        }
        Ok(())
    }
}
