//! Run-level accounting

use std::fmt;

use almanac_core::errors::ExError;
use almanac_core::{GapKind, Unit, UnitCollection};
use almanac_core_types::RunId;

/// How a run ended, when it did not fail outright
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    Cancelled,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UnitFailure {
    pub unit: Unit,
    pub error: ExError,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GapCounts {
    pub new_pointing: usize,
    pub missing_exposures: usize,
    pub image_type_change: usize,
}

impl GapCounts {
    pub fn add(&mut self, kind: GapKind) {
        match kind {
            GapKind::NewPointing => self.new_pointing += 1,
            GapKind::MissingExposures => self.missing_exposures += 1,
            GapKind::ImageTypeChange => self.image_type_change += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.new_pointing + self.missing_exposures + self.image_type_change
    }
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: RunId,
    /// Units with data, in completion order
    pub collected: Vec<Unit>,
    /// Subset of `collected` merged into the catalog
    pub stored: Vec<Unit>,
    pub no_data: Vec<Unit>,
    pub failed: Vec<UnitFailure>,
    pub n_exposures: usize,
    pub n_flagged_bad: usize,
    pub gaps: GapCounts,
}

impl RunSummary {
    pub fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            collected: Vec::new(),
            stored: Vec::new(),
            no_data: Vec::new(),
            failed: Vec::new(),
            n_exposures: 0,
            n_flagged_bad: 0,
            gaps: GapCounts::default(),
        }
    }

    pub fn record_collected(&mut self, collection: &UnitCollection, stored: bool) {
        self.collected.push(collection.unit);
        if stored {
            self.stored.push(collection.unit);
        }
        self.n_exposures += collection.exposures.len();
        self.n_flagged_bad += collection.n_flagged_bad();
        for gap in &collection.gaps {
            self.gaps.add(gap.kind);
        }
    }

    pub fn record_no_data(&mut self, unit: Unit) {
        self.no_data.push(unit);
    }

    pub fn record_failure(&mut self, unit: Unit, error: ExError) {
        self.failed.push(UnitFailure { unit, error });
    }

    /// Units that reached a final state
    pub fn n_units(&self) -> usize {
        self.collected.len() + self.no_data.len() + self.failed.len()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} units: {} collected ({} stored), {} without data, {} failed; \
             {} exposures ({} flagged bad); gaps: {} new pointing, {} missing exposures, {} image type",
            self.n_units(),
            self.collected.len(),
            self.stored.len(),
            self.no_data.len(),
            self.failed.len(),
            self.n_exposures,
            self.n_flagged_bad,
            self.gaps.new_pointing,
            self.gaps.missing_exposures,
            self.gaps.image_type_change,
        )
    }
}
