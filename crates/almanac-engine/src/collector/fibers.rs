//! Fiber maps read from parameter files on disk
//!
//! Robotic-era pointings read `confSummaryFS-<id>.par` (falling back to
//! `confSummary-<id>.par`) below `<sdsscore_dir>/<site>/summary_files/`;
//! plate-era pointings read `plateHoles-<pppppp>.par` below the plate list.

#![allow(clippy::result_large_err)]

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use almanac_core::errors::{ExError, ExErrorKind};
use almanac_core::{FiberMap, FiberRow, FiberScheme, Site, Unit};

use super::crossmatch::normalize_designation;
use super::yanny::{self, YannyTable};
use super::FiberMapSource;

const FPS_TABLE: &str = "FIBERMAP";
const PLATE_TABLE: &str = "STRUCT1";
const PLATE_APOGEE_HOLES: [&str; 3] = ["APOGEE", "APOGEE_SHARED", "APOGEE_SOUTH"];

/// Map plate-era target categories onto the robotic-era vocabulary
pub fn normalize_category(category: &str) -> String {
    match category.to_ascii_lowercase().as_str() {
        "sky" => "sky_apogee".to_string(),
        "standard" => "standard_apogee".to_string(),
        "na" => String::new(),
        _ => category.to_string(),
    }
}

fn parse_float(value: Option<&str>) -> f64 {
    value
        .and_then(|v| v.trim().parse::<f64>().ok())
        .unwrap_or(f64::NAN)
}

fn parse_int(value: Option<&str>) -> Option<i64> {
    value.and_then(|v| v.trim().parse::<i64>().ok())
}

pub struct FsFiberMapSource {
    sdsscore_dir: PathBuf,
    platelist_dir: PathBuf,
}

impl FsFiberMapSource {
    pub fn new(sdsscore_dir: impl Into<PathBuf>, platelist_dir: impl Into<PathBuf>) -> Self {
        Self {
            sdsscore_dir: sdsscore_dir.into(),
            platelist_dir: platelist_dir.into(),
        }
    }

    /// `.../summary_files/010XXX/0102XX` for configuration 10234
    pub fn config_summary_dir(&self, site: Site, config_id: i64) -> PathBuf {
        self.sdsscore_dir
            .join(site.as_str())
            .join("summary_files")
            .join(format!("{:03}XXX", config_id / 1000))
            .join(format!("{:04}XX", config_id / 100))
    }

    /// Candidate summary files, preferred first
    pub fn config_summary_paths(&self, site: Site, config_id: i64) -> [PathBuf; 2] {
        let dir = self.config_summary_dir(site, config_id);
        [
            dir.join(format!("confSummaryFS-{}.par", config_id)),
            dir.join(format!("confSummary-{}.par", config_id)),
        ]
    }

    /// `.../0056XX/005678/plateHoles-005678.par` for plate 5678
    pub fn plate_holes_path(&self, plate_id: i64) -> PathBuf {
        self.platelist_dir
            .join(format!("{:04}XX", plate_id / 100))
            .join(format!("{:06}", plate_id))
            .join(format!("plateHoles-{:06}.par", plate_id))
    }

    fn read_table(
        &self,
        unit: Unit,
        path: &Path,
        table: &str,
    ) -> Result<Option<YannyTable>, ExError> {
        let failure = |message: String| {
            ExError::new(ExErrorKind::Collection)
                .with_op("read_fiber_map")
                .with_unit(unit)
                .with_path(path.display().to_string())
                .with_message(message)
        };

        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(failure(e.to_string())),
        };
        let mut file = yanny::parse(&text).map_err(failure)?;
        let index = file
            .tables
            .iter()
            .position(|t| t.name.eq_ignore_ascii_case(table))
            .ok_or_else(|| failure(format!("no {} table", table)))?;
        Ok(Some(file.tables.swap_remove(index)))
    }

    fn fps_rows(table: &YannyTable) -> Vec<FiberRow> {
        (0..table.len())
            .filter(|&i| {
                table
                    .value(i, "fiberType")
                    .is_some_and(|t| t.eq_ignore_ascii_case("APOGEE"))
            })
            .map(|i| FiberRow {
                fiber_id: parse_int(table.value(i, "fiberId")).unwrap_or(-1),
                hole_type: table.value(i, "holeId").unwrap_or_default().to_string(),
                category: table.value(i, "category").unwrap_or_default().to_string(),
                ra: parse_float(table.value(i, "ra").or_else(|| table.value(i, "racat"))),
                dec: parse_float(table.value(i, "dec").or_else(|| table.value(i, "deccat"))),
                catalogid: parse_int(table.value(i, "catalogid")).filter(|id| *id > 0),
                designation: None,
                sdss_id: None,
            })
            .collect()
    }

    fn plate_rows(table: &YannyTable) -> Vec<FiberRow> {
        (0..table.len())
            .filter(|&i| {
                table.value(i, "holetype").is_some_and(|t| {
                    PLATE_APOGEE_HOLES
                        .iter()
                        .any(|h| h.eq_ignore_ascii_case(t))
                })
            })
            .map(|i| FiberRow {
                fiber_id: parse_int(table.value(i, "fiberid")).unwrap_or(-1),
                hole_type: table
                    .value(i, "holetype")
                    .unwrap_or_default()
                    .to_ascii_lowercase(),
                category: normalize_category(table.value(i, "targettype").unwrap_or_default()),
                ra: parse_float(table.value(i, "target_ra")),
                dec: parse_float(table.value(i, "target_dec")),
                catalogid: None,
                designation: table
                    .value(i, "targetids")
                    .map(normalize_designation)
                    .filter(|d| !d.is_empty()),
                sdss_id: None,
            })
            .collect()
    }
}

impl FiberMapSource for FsFiberMapSource {
    fn fiber_map(
        &self,
        unit: Unit,
        scheme: FiberScheme,
        identifier: i64,
    ) -> Result<Option<FiberMap>, ExError> {
        let rows = match scheme {
            FiberScheme::Fps => {
                let mut found = None;
                for path in self.config_summary_paths(unit.site, identifier) {
                    if let Some(table) = self.read_table(unit, &path, FPS_TABLE)? {
                        found = Some(Self::fps_rows(&table));
                        break;
                    }
                }
                found
            }
            FiberScheme::Plates => self
                .read_table(unit, &self.plate_holes_path(identifier), PLATE_TABLE)?
                .map(|table| Self::plate_rows(&table)),
        };

        Ok(rows.map(|rows| FiberMap {
            scheme,
            identifier,
            rows,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_directories() {
        let source = FsFiberMapSource::new("/core", "/plates");
        assert_eq!(
            source.config_summary_dir(Site::Apo, 10234),
            PathBuf::from("/core/apo/summary_files/010XXX/0102XX")
        );
        assert_eq!(
            source.config_summary_dir(Site::Lco, 5),
            PathBuf::from("/core/lco/summary_files/000XXX/0000XX")
        );
        assert_eq!(
            source.plate_holes_path(5678),
            PathBuf::from("/plates/0056XX/005678/plateHoles-005678.par")
        );
    }

    #[test]
    fn test_category_vocabulary() {
        assert_eq!(normalize_category("SKY"), "sky_apogee");
        assert_eq!(normalize_category("standard"), "standard_apogee");
        assert_eq!(normalize_category("na"), "");
        assert_eq!(normalize_category("science"), "science");
    }
}
