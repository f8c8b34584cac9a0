use serde::{Deserialize, Serialize};

use super::exposure::ExposureRecord;
use super::fiber::FiberMap;
use super::site::Unit;
use crate::sequence::{GapEvent, Sequence};

/// Everything collected for one unit, ready to be merged into the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitCollection {
    pub unit: Unit,
    /// Sorted ascending by exposure number, numbers unique
    pub exposures: Vec<ExposureRecord>,
    pub sequences: Vec<Sequence>,
    pub gaps: Vec<GapEvent>,
    /// `None` when fiber mapping was not requested; existing fiber
    /// sections for the unit are then left as they are
    pub fiber_maps: Option<Vec<FiberMap>>,
}

impl UnitCollection {
    /// An empty result for a unit; stores as zero-row tables
    pub fn empty(unit: Unit) -> Self {
        Self {
            unit,
            exposures: Vec::new(),
            sequences: Vec::new(),
            gaps: Vec::new(),
            fiber_maps: None,
        }
    }

    pub fn n_flagged_bad(&self) -> usize {
        self.exposures.iter().filter(|e| e.flagged_bad).count()
    }
}

/// Result of collecting one unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CollectOutcome {
    Collected(UnitCollection),
    /// Zero exposures found for the unit; not an error
    NoData { unit: Unit },
}

impl CollectOutcome {
    pub fn unit(&self) -> Unit {
        match self {
            CollectOutcome::Collected(c) => c.unit,
            CollectOutcome::NoData { unit } => *unit,
        }
    }
}
