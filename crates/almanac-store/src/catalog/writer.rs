//! Unit-scoped merge-write
//!
//! A unit's sections are fully built and encoded before the catalog is
//! touched, then replaced inside one transaction. Sections of other units
//! are never read or written.

#![allow(clippy::result_large_err)]

use std::collections::BTreeMap;
use std::time::Instant;

use almanac_core::{log_op_end, log_op_start, Unit, UnitCollection};
use rusqlite::{params, Transaction};

use super::codec::{encode, EncodedPayload};
use super::path::SectionPath;
use super::tables::{
    exposures_table, fiber_table, sequences_table, EXPOSURES_SCHEMA_VERSION,
    FIBERS_SCHEMA_VERSION, SEQUENCES_SCHEMA_VERSION,
};
use super::{CatalogStore, WriteOptions};
use crate::errors::{from_rusqlite, store_write_failure, Result};
use crate::migrations::compute_checksum;

/// One encoded section awaiting write
#[derive(Debug, Clone)]
pub struct PreparedSection {
    pub path: SectionPath,
    pub schema_version: u32,
    pub n_rows: usize,
    pub payload: EncodedPayload,
}

/// Every section of one unit, encoded in memory
#[derive(Debug, Clone)]
pub struct PreparedUnit {
    pub unit: Unit,
    pub sections: Vec<PreparedSection>,
    /// Whether the unit's existing fiber sections are replaced
    pub replace_fibers: bool,
    pub n_exposures: usize,
    pub n_sequences: usize,
}

impl PreparedUnit {
    pub fn build(collection: &UnitCollection, options: WriteOptions) -> Result<Self> {
        let unit = collection.unit;
        let level = options.compression_level;
        let mut sections = Vec::new();

        let path = SectionPath::exposures(unit);
        let table = exposures_table(&collection.exposures, &collection.sequences);
        sections.push(PreparedSection {
            path,
            schema_version: EXPOSURES_SCHEMA_VERSION,
            n_rows: table.n_rows,
            payload: encode(&path.to_string(), &table, level)?,
        });

        let path = SectionPath::sequences(unit);
        let ranges = sequences_table(&collection.sequences);
        sections.push(PreparedSection {
            path,
            schema_version: SEQUENCES_SCHEMA_VERSION,
            n_rows: ranges.len(),
            payload: encode(&path.to_string(), &ranges, level)?,
        });

        if let Some(maps) = &collection.fiber_maps {
            // first map wins if a pointing was listed twice
            let mut by_path = BTreeMap::new();
            for map in maps {
                by_path
                    .entry(SectionPath::fibers(unit, map.scheme, map.identifier))
                    .or_insert(map);
            }
            for (path, map) in by_path {
                let table = fiber_table(map);
                sections.push(PreparedSection {
                    path,
                    schema_version: FIBERS_SCHEMA_VERSION,
                    n_rows: table.n_rows,
                    payload: encode(&path.to_string(), &table, level)?,
                });
            }
        }

        Ok(Self {
            unit,
            sections,
            replace_fibers: collection.fiber_maps.is_some(),
            n_exposures: collection.exposures.len(),
            n_sequences: collection.sequences.len(),
        })
    }
}

/// What a merge did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeReport {
    pub unit: Unit,
    pub sections_written: usize,
    pub fiber_sections_removed: usize,
    /// Digest over every section checksum now stored for the unit
    pub digest: String,
}

impl CatalogStore {
    pub fn prepare_unit(&self, collection: &UnitCollection) -> Result<PreparedUnit> {
        PreparedUnit::build(collection, self.options)
    }

    /// Replace the unit's sections with the collection's content
    ///
    /// # Errors
    ///
    /// Any failure is reported as `StoreWrite` naming the unit; the unit's
    /// previously stored sections are then unchanged.
    pub fn merge_unit(&mut self, collection: &UnitCollection) -> Result<MergeReport> {
        let unit = collection.unit;
        let prepared = self
            .prepare_unit(collection)
            .map_err(|e| store_write_failure(unit, e))?;
        self.write_prepared(&prepared)
            .map_err(|e| store_write_failure(unit, e))
    }

    pub fn write_prepared(&mut self, prepared: &PreparedUnit) -> Result<MergeReport> {
        let start = Instant::now();
        let unit = prepared.unit;
        log_op_start!("merge_unit", unit = %unit);

        let tx = self.conn.transaction().map_err(from_rusqlite)?;
        let site = unit.site.as_str();

        tx.execute(
            "INSERT INTO units (site, mjd, n_exposures, n_sequences, n_fiber_maps, digest)
             VALUES (?1, ?2, 0, 0, 0, '')
             ON CONFLICT(site, mjd) DO NOTHING",
            params![site, unit.mjd],
        )
        .map_err(from_rusqlite)?;

        tx.execute(
            "DELETE FROM sections WHERE path IN (?1, ?2)",
            params![
                SectionPath::exposures(unit).to_string(),
                SectionPath::sequences(unit).to_string()
            ],
        )
        .map_err(from_rusqlite)?;

        let fiber_sections_removed = if prepared.replace_fibers {
            tx.execute(
                "DELETE FROM sections WHERE site = ?1 AND mjd = ?2 AND kind = 'fibers'",
                params![site, unit.mjd],
            )
            .map_err(from_rusqlite)?
        } else {
            0
        };

        for section in &prepared.sections {
            insert_section(&tx, section)?;
        }

        let (digest, n_fiber_maps) = unit_digest(&tx, unit)?;
        tx.execute(
            "UPDATE units SET n_exposures = ?3, n_sequences = ?4, n_fiber_maps = ?5, digest = ?6
             WHERE site = ?1 AND mjd = ?2",
            params![
                site,
                unit.mjd,
                prepared.n_exposures as i64,
                prepared.n_sequences as i64,
                n_fiber_maps,
                digest
            ],
        )
        .map_err(from_rusqlite)?;

        tx.commit().map_err(from_rusqlite)?;

        log_op_end!(
            "merge_unit",
            duration_ms = start.elapsed().as_millis() as u64,
            unit = %unit,
            sections = prepared.sections.len()
        );

        Ok(MergeReport {
            unit,
            sections_written: prepared.sections.len(),
            fiber_sections_removed,
            digest,
        })
    }
}

fn insert_section(tx: &Transaction<'_>, section: &PreparedSection) -> Result<()> {
    let (scheme, identifier) = match section.path.kind {
        super::SectionKind::Fibers { scheme, identifier } => {
            (Some(scheme.as_str()), Some(identifier))
        }
        _ => (None, None),
    };
    tx.execute(
        "INSERT INTO sections
            (path, site, mjd, kind, scheme, identifier, schema_version, encoding, n_rows, checksum, payload)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            section.path.to_string(),
            section.path.unit.site.as_str(),
            section.path.unit.mjd,
            section.path.kind.as_str(),
            scheme,
            identifier,
            section.schema_version,
            section.payload.encoding.as_str(),
            section.n_rows as i64,
            section.payload.checksum,
            section.payload.bytes,
        ],
    )
    .map_err(from_rusqlite)?;
    Ok(())
}

/// Digest of `path:checksum` lines for every section of the unit, and the
/// number of fiber sections
fn unit_digest(tx: &Transaction<'_>, unit: Unit) -> Result<(String, i64)> {
    let mut stmt = tx
        .prepare("SELECT path, kind, checksum FROM sections WHERE site = ?1 AND mjd = ?2 ORDER BY path")
        .map_err(from_rusqlite)?;
    let rows: Vec<(String, String, String)> = stmt
        .query_map(params![unit.site.as_str(), unit.mjd], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(from_rusqlite)?;

    let mut listing = String::new();
    let mut n_fibers = 0;
    for (path, kind, checksum) in &rows {
        listing.push_str(path);
        listing.push(':');
        listing.push_str(checksum);
        listing.push('\n');
        if kind == "fibers" {
            n_fibers += 1;
        }
    }
    Ok((compute_checksum(listing), n_fibers))
}
