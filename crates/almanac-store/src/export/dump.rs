//! CSV dumps of every stored unit

#![allow(clippy::result_large_err)]

use std::path::Path;

use almanac_core::errors::{ExError, ExErrorKind};
use almanac_core::Unit;

use super::atomic::atomic_write;
use crate::catalog::tables::{ColumnTable, EXPOSURE_COLUMNS, FIBER_COLUMNS};
use crate::catalog::{CatalogStore, SectionKind, SectionPath};
use crate::errors::{codec_error, io_error, Result};

/// What an export wrote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub units: usize,
    pub rows: usize,
}

fn refuse_existing(target: &Path, overwrite: bool) -> Result<()> {
    if target.exists() && !overwrite {
        return Err(ExError::new(ExErrorKind::AlreadyExists)
            .with_op("export")
            .with_path(target.display().to_string())
            .with_message("output exists; pass --overwrite to replace it"));
    }
    Ok(())
}

fn csv_error(target: &Path, e: csv::Error) -> ExError {
    codec_error(&target.display().to_string(), e.to_string())
}

fn write_rows(
    out: &mut csv::Writer<Vec<u8>>,
    target: &Path,
    prefix: &[String],
    table: &ColumnTable,
    columns: &[&str],
) -> Result<()> {
    let path = target.display().to_string();
    let data = columns
        .iter()
        .map(|name| table.column(name).map_err(|e| codec_error(&path, e)))
        .collect::<Result<Vec<_>>>()?;
    for row in 0..table.n_rows {
        let mut record = prefix.to_vec();
        record.extend(data.iter().map(|column| column.cell(row)));
        out.write_record(&record).map_err(|e| csv_error(target, e))?;
    }
    Ok(())
}

fn finish(out: csv::Writer<Vec<u8>>, target: &Path) -> Result<()> {
    let bytes = out
        .into_inner()
        .map_err(|e| io_error("export", e.into_error()))?;
    atomic_write(target, &bytes)
}

/// Every stored exposure, one row each, in unit order
pub fn export_exposures(store: &CatalogStore, target: &Path, overwrite: bool) -> Result<ExportReport> {
    refuse_existing(target, overwrite)?;

    let mut out = csv::Writer::from_writer(Vec::new());
    out.write_record(EXPOSURE_COLUMNS)
        .map_err(|e| csv_error(target, e))?;

    let mut report = ExportReport { units: 0, rows: 0 };
    for row in store.list_units()? {
        let Some(section) = store.section(&SectionPath::exposures(row.unit))? else {
            continue;
        };
        let table = section.table()?;
        write_rows(&mut out, target, &[], &table, &EXPOSURE_COLUMNS)?;
        report.units += 1;
        report.rows += table.n_rows;
    }

    finish(out, target)?;
    Ok(report)
}

/// Every stored fiber row, prefixed by its unit and pointing
pub fn export_fibers(store: &CatalogStore, target: &Path, overwrite: bool) -> Result<ExportReport> {
    refuse_existing(target, overwrite)?;

    let mut out = csv::Writer::from_writer(Vec::new());
    let mut header = vec!["site", "mjd", "scheme", "identifier"];
    header.extend(FIBER_COLUMNS);
    out.write_record(&header).map_err(|e| csv_error(target, e))?;

    let mut report = ExportReport { units: 0, rows: 0 };
    for row in store.list_units()? {
        let unit: Unit = row.unit;
        let mut any = false;
        for path in store.list_paths(Some(&SectionPath::fibers_prefix(unit)))? {
            let path: SectionPath = path.parse().map_err(ExError::from)?;
            let SectionKind::Fibers { scheme, identifier } = path.kind else {
                continue;
            };
            let Some(section) = store.section(&path)? else {
                continue;
            };
            let table = section.table()?;
            let prefix = [
                unit.site.to_string(),
                unit.mjd.to_string(),
                scheme.to_string(),
                identifier.to_string(),
            ];
            write_rows(&mut out, target, &prefix, &table, &FIBER_COLUMNS)?;
            report.rows += table.n_rows;
            any = true;
        }
        if any {
            report.units += 1;
        }
    }

    finish(out, target)?;
    Ok(report)
}
