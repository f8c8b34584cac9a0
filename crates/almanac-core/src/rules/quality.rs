//! Known-bad exposure lookup
//!
//! The table is a CSV with header `observatory,mjd,exposure,image_type,notes`
//! (extra columns are ignored). A blank or negative `exposure` flags every
//! exposure of that night.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::errors::{CoreError, Result};
use crate::model::{Site, Unit};

/// Annotation carried for a flagged exposure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadExposureNote {
    pub image_type: String,
    pub notes: String,
}

#[derive(Debug, Deserialize)]
struct BadExposureRow {
    observatory: String,
    mjd: i32,
    #[serde(default)]
    exposure: Option<i64>,
    #[serde(default)]
    image_type: String,
    #[serde(default)]
    notes: String,
}

#[derive(Debug, Clone, Default)]
pub struct BadExposureList {
    /// Keyed by unit; `None` exposure flags the whole night
    entries: HashMap<Unit, HashMap<Option<u32>, BadExposureNote>>,
}

impl BadExposureList {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load from a CSV file
    pub fn load(path: &Path) -> Result<Self> {
        let table_error = |reason: String| CoreError::Table {
            path: path.display().to_string(),
            reason,
        };
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| table_error(e.to_string()))?;

        let mut list = Self::default();
        for row in reader.deserialize::<BadExposureRow>() {
            let row = row.map_err(|e| table_error(e.to_string()))?;
            let site: Site = row.observatory.parse()?;
            let exposure = row
                .exposure
                .filter(|e| *e >= 0)
                .and_then(|e| u32::try_from(e).ok());
            list.insert(
                Unit::new(site, row.mjd),
                exposure,
                BadExposureNote {
                    image_type: row.image_type,
                    notes: row.notes,
                },
            );
        }
        Ok(list)
    }

    pub fn insert(&mut self, unit: Unit, exposure: Option<u32>, note: BadExposureNote) {
        self.entries.entry(unit).or_default().insert(exposure, note);
    }

    pub fn note(&self, unit: Unit, exposure: u32) -> Option<&BadExposureNote> {
        let night = self.entries.get(&unit)?;
        night.get(&Some(exposure)).or_else(|| night.get(&None))
    }

    pub fn is_bad(&self, unit: Unit, exposure: u32) -> bool {
        self.note(unit, exposure).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
