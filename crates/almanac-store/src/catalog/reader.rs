//! Catalog read-back

#![allow(clippy::result_large_err)]

use std::collections::BTreeMap;

use almanac_core::errors::{ExError, ExErrorKind};
use almanac_core::{ExposureRecord, FiberMap, Sequence, Site, Unit};
use rusqlite::{params, OptionalExtension};

use super::codec::{decode_bytes, Encoding};
use super::path::{SectionKind, SectionPath};
use super::tables::{exposures_from_table, fiber_rows_from_table, sequences_from_table, ColumnTable};
use super::CatalogStore;
use crate::errors::{checksum_mismatch, codec_error, from_rusqlite, Result};
use crate::migrations::compute_checksum;

/// Summary row of a stored unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitRow {
    pub unit: Unit,
    pub n_exposures: i64,
    pub n_sequences: i64,
    pub n_fiber_maps: i64,
    pub digest: String,
}

/// A section with its payload decoded to JSON
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionRecord {
    pub path: SectionPath,
    pub schema_version: u32,
    pub encoding: Encoding,
    pub n_rows: i64,
    pub checksum: String,
    pub json: Vec<u8>,
}

impl SectionRecord {
    pub fn table(&self) -> Result<ColumnTable> {
        let path = self.path.to_string();
        serde_json::from_slice(&self.json).map_err(|e| codec_error(&path, e.to_string()))
    }
}

/// Everything stored for one unit
#[derive(Debug, Clone, PartialEq)]
pub struct StoredUnit {
    pub unit: Unit,
    pub exposures: Vec<ExposureRecord>,
    pub sequences: Vec<Sequence>,
    pub fiber_maps: Vec<FiberMap>,
}

fn parse_unit(site: &str, mjd: i32) -> Result<Unit> {
    let site: Site = site.parse().map_err(ExError::from)?;
    Ok(Unit::new(site, mjd))
}

impl CatalogStore {
    /// Stored units, site-major then date
    pub fn list_units(&self) -> Result<Vec<UnitRow>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT site, mjd, n_exposures, n_sequences, n_fiber_maps, digest
                 FROM units ORDER BY site, mjd",
            )
            .map_err(from_rusqlite)?;
        let rows: Vec<(String, i32, i64, i64, i64, String)> = stmt
            .query_map([], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            })
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;

        rows.into_iter()
            .map(|(site, mjd, n_exposures, n_sequences, n_fiber_maps, digest)| {
                Ok(UnitRow {
                    unit: parse_unit(&site, mjd)?,
                    n_exposures,
                    n_sequences,
                    n_fiber_maps,
                    digest,
                })
            })
            .collect()
    }

    /// Section paths, optionally restricted to a prefix such as `apo/60000/`
    pub fn list_paths(&self, prefix: Option<&str>) -> Result<Vec<String>> {
        let prefix = prefix.unwrap_or("");
        let mut stmt = self
            .conn
            .prepare(
                "SELECT path FROM sections
                 WHERE substr(path, 1, length(?1)) = ?1
                 ORDER BY path",
            )
            .map_err(from_rusqlite)?;
        let paths = stmt
            .query_map([prefix], |row| row.get(0))
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<String>, _>>()
            .map_err(from_rusqlite)?;
        Ok(paths)
    }

    /// Read one section, verifying its checksum
    pub fn section(&self, path: &SectionPath) -> Result<Option<SectionRecord>> {
        let key = path.to_string();
        let row: Option<(u32, String, i64, String, Vec<u8>)> = self
            .conn
            .query_row(
                "SELECT schema_version, encoding, n_rows, checksum, payload
                 FROM sections WHERE path = ?1",
                [&key],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                    ))
                },
            )
            .optional()
            .map_err(from_rusqlite)?;

        let Some((schema_version, encoding, n_rows, checksum, payload)) = row else {
            return Ok(None);
        };
        let encoding = Encoding::parse(&encoding)
            .ok_or_else(|| codec_error(&key, format!("unknown encoding '{}'", encoding)))?;
        let json = decode_bytes(&key, encoding, &payload)?;
        let actual = compute_checksum(&json);
        if actual != checksum {
            return Err(checksum_mismatch(&key, &checksum, &actual));
        }

        Ok(Some(SectionRecord {
            path: *path,
            schema_version,
            encoding,
            n_rows,
            checksum,
            json,
        }))
    }

    /// Decode everything stored for a unit; `None` if it was never stored
    pub fn read_unit(&self, unit: Unit) -> Result<Option<StoredUnit>> {
        let known: bool = self
            .conn
            .query_row(
                "SELECT 1 FROM units WHERE site = ?1 AND mjd = ?2",
                params![unit.site.as_str(), unit.mjd],
                |_| Ok(true),
            )
            .optional()
            .map_err(from_rusqlite)?
            .unwrap_or(false);
        if !known {
            return Ok(None);
        }

        let mut stored = StoredUnit {
            unit,
            exposures: Vec::new(),
            sequences: Vec::new(),
            fiber_maps: Vec::new(),
        };

        for path in self.list_paths(Some(&format!("{}/", unit)))? {
            let path: SectionPath = path.parse().map_err(ExError::from)?;
            let Some(section) = self.section(&path)? else {
                continue;
            };
            let key = path.to_string();
            match path.kind {
                SectionKind::Exposures => {
                    stored.exposures =
                        exposures_from_table(&section.table()?).map_err(|e| codec_error(&key, e))?;
                }
                SectionKind::Sequences => {
                    let ranges: Vec<[u32; 2]> = serde_json::from_slice(&section.json)
                        .map_err(|e| codec_error(&key, e.to_string()))?;
                    stored.sequences = sequences_from_table(&ranges);
                }
                SectionKind::Fibers { scheme, identifier } => {
                    let rows = fiber_rows_from_table(&section.table()?)
                        .map_err(|e| codec_error(&key, e))?;
                    stored.fiber_maps.push(FiberMap {
                        scheme,
                        identifier,
                        rows,
                    });
                }
            }
        }
        Ok(Some(stored))
    }

    /// Path to checksum for every section in the catalog
    pub fn fingerprint(&self) -> Result<BTreeMap<String, String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT path, checksum FROM sections ORDER BY path")
            .map_err(from_rusqlite)?;
        let entries = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<BTreeMap<String, String>, _>>()
            .map_err(from_rusqlite)?;
        Ok(entries)
    }

    /// Fail if the unit is unknown
    pub fn require_unit(&self, unit: Unit) -> Result<StoredUnit> {
        self.read_unit(unit)?.ok_or_else(|| {
            ExError::new(ExErrorKind::NotFound)
                .with_op("read_unit")
                .with_unit(unit)
                .with_message("unit not in catalog")
        })
    }
}
