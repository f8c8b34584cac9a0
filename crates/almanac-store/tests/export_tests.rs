#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use almanac_store::export::{export_exposures, export_fibers};
use almanac_store::{CatalogStore, WriteOptions};
use common::{apo, collection, fiber_map, lco};
use std::fs;
use tempfile::TempDir;

fn populated() -> CatalogStore {
    let mut store = CatalogStore::open_in_memory(WriteOptions::default()).unwrap();
    let mut a = collection(apo(60000), &[(1, 1), (2, 1)]);
    a.fiber_maps = Some(vec![fiber_map(1, 3)]);
    store.merge_unit(&a).unwrap();
    store.merge_unit(&collection(lco(60000), &[(5, 9)])).unwrap();
    store
}

#[test]
fn test_exposure_export_has_one_row_per_exposure() {
    // GIVEN a catalog with three exposures across two units
    let store = populated();
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("exposures.csv");

    // WHEN exported
    let report = export_exposures(&store, &out, false).unwrap();

    // THEN the CSV has a header and three rows
    assert_eq!(report.units, 2);
    assert_eq!(report.rows, 3);
    let mut reader = csv::Reader::from_path(&out).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(&headers[0], "site");
    assert_eq!(&headers[2], "exposure");
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 3);
    assert_eq!(&rows[0][0], "apo");
    assert_eq!(&rows[2][0], "lco");
    assert_eq!(&rows[2][2], "5");
}

#[test]
fn test_fiber_export_prefixes_pointing() {
    let store = populated();
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("fibers.csv");

    let report = export_fibers(&store, &out, false).unwrap();

    assert_eq!(report.units, 1);
    assert_eq!(report.rows, 3);
    let text = fs::read_to_string(&out).unwrap();
    let mut lines = text.lines();
    assert!(lines.next().unwrap().starts_with("site,mjd,scheme,identifier,fiber_id"));
    assert!(lines.next().unwrap().starts_with("apo,60000,fps,1,1,APOGEE"));
}

#[test]
fn test_export_refuses_to_overwrite() {
    // GIVEN an existing output file
    let store = populated();
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("exposures.csv");
    fs::write(&out, "keep me").unwrap();

    // WHEN exported without the overwrite flag
    let err = export_exposures(&store, &out, false).unwrap_err();

    // THEN the file is untouched
    assert_eq!(err.code(), "ERR_ALREADY_EXISTS");
    assert_eq!(fs::read_to_string(&out).unwrap(), "keep me");

    // AND with the flag it is replaced
    export_exposures(&store, &out, true).unwrap();
    assert!(fs::read_to_string(&out).unwrap().starts_with("site,mjd,exposure"));
}
