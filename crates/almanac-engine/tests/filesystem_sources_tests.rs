#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::fs;
use std::path::Path;

use almanac_core::{FiberScheme, Site, Unit};
use almanac_engine::collector::{FiberMapSource, FitsHeaderScraper, FsFiberMapSource, HeaderSource};
use common::apo;

fn header(cards: &[&str]) -> Vec<u8> {
    let mut bytes: Vec<u8> = cards
        .iter()
        .chain(std::iter::once(&"END"))
        .flat_map(|c| format!("{:<80}", c).into_bytes())
        .collect();
    // binary payload after the header
    bytes.extend_from_slice(&[0u8; 160]);
    bytes
}

fn write_exposure(root: &Path, unit: Unit, exposure: u32, chip: char, cards: &[&str]) {
    let dir = root.join(unit.site.as_str()).join(unit.mjd.to_string());
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join(FitsHeaderScraper::file_name(unit, exposure, chip)),
        header(cards),
    )
    .unwrap();
}

#[test]
fn test_scraper_reads_first_chip_headers() {
    // GIVEN exposure 1 on chips a and c, exposure 2 on chip b only
    let root = tempfile::tempdir().unwrap();
    let unit = apo(60000);
    let cards = [
        "SIMPLE  =                    T",
        "IMAGETYP= 'Object  '",
        "NREAD   =                   47",
        "CONFIGID=                10234 / configuration",
        "LAMPQRTZ=                    F",
        "OBSCMNT = 'clear'",
    ];
    write_exposure(root.path(), unit, 1, 'a', &cards);
    write_exposure(root.path(), unit, 1, 'c', &cards);
    write_exposure(root.path(), unit, 2, 'b', &["IMAGETYP= 'Dark'"]);

    // WHEN scraped
    let scraper = FitsHeaderScraper::new(root.path(), 20_000);
    let raw = scraper.scrape(unit).unwrap();

    // THEN one dictionary per exposure, ascending, with the chip mask
    assert_eq!(raw.len(), 2);
    assert_eq!(raw[0].exposure, 1);
    assert_eq!(raw[0].chip_flags, 0b101);
    assert_eq!(raw[0].header("imagetyp"), Some("Object"));
    assert_eq!(raw[0].header("configid"), Some("10234"));
    assert_eq!(raw[0].header("obscmnt"), Some("clear"));
    assert_eq!(raw[0].header("simple"), None);
    assert_eq!(raw[1].exposure, 2);
    assert_eq!(raw[1].chip_flags, 0b010);
}

#[test]
fn test_scraper_ignores_other_files() {
    let root = tempfile::tempdir().unwrap();
    let unit = apo(60000);
    write_exposure(root.path(), unit, 3, 'a', &["IMAGETYP= 'Object'"]);
    let dir = root.path().join("apo").join("60000");
    // another night's numbering, the other site's prefix, and a stray file
    fs::write(dir.join(FitsHeaderScraper::file_name(apo(59999), 1, 'a')), b"").unwrap();
    fs::write(
        dir.join(FitsHeaderScraper::file_name(Unit::new(Site::Lco, 60000), 4, 'a')),
        b"",
    )
    .unwrap();
    fs::write(dir.join("notes.txt"), b"hello").unwrap();

    let raw = FitsHeaderScraper::new(root.path(), 20_000).scrape(unit).unwrap();

    let numbers: Vec<u32> = raw.iter().map(|r| r.exposure).collect();
    assert_eq!(numbers, vec![3]);
}

#[test]
fn test_scraper_missing_night_is_empty() {
    let root = tempfile::tempdir().unwrap();
    let raw = FitsHeaderScraper::new(root.path(), 20_000)
        .scrape(apo(60000))
        .unwrap();
    assert!(raw.is_empty());
}

const CONF_SUMMARY: &str = r#"
configuration_id 7
typedef struct {
  int positionerId;
  char holeId[10];
  char fiberType[10];
  char category[20];
  int fiberId;
  double ra;
  double dec;
  long catalogid;
} FIBERMAP;

FIBERMAP 1 R+1C3 APOGEE science 12 120.5 -5.25 27021597842000001
FIBERMAP 1 R+1C3 BOSS science 12 120.5 -5.25 27021597842000001
FIBERMAP 2 R+1C4 APOGEE sky_apogee 13 121.0 -5.0 -999
"#;

#[test]
fn test_fps_fiber_map_keeps_apogee_rows() {
    // GIVEN only the plain summary file for configuration 7
    let root = tempfile::tempdir().unwrap();
    let source = FsFiberMapSource::new(root.path().join("sdsscore"), root.path().join("plates"));
    let dir = source.config_summary_dir(Site::Apo, 7);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("confSummary-7.par"), CONF_SUMMARY).unwrap();

    // WHEN the map is read
    let map = source
        .fiber_map(apo(60000), FiberScheme::Fps, 7)
        .unwrap()
        .unwrap();

    // THEN BOSS fibers are dropped and placeholder catalog ids unset
    assert_eq!(map.identifier, 7);
    assert_eq!(map.rows.len(), 2);
    assert_eq!(map.rows[0].fiber_id, 12);
    assert_eq!(map.rows[0].hole_type, "R+1C3");
    assert_eq!(map.rows[0].catalogid, Some(27021597842000001));
    assert_eq!(map.rows[1].category, "sky_apogee");
    assert_eq!(map.rows[1].catalogid, None);
    assert!((map.rows[1].ra - 121.0).abs() < 1e-9);
}

#[test]
fn test_plate_fiber_map_normalizes_rows() {
    let root = tempfile::tempdir().unwrap();
    let source = FsFiberMapSource::new(root.path().join("sdsscore"), root.path().join("plates"));
    let path = source.plate_holes_path(5678);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(
        &path,
        r#"
typedef struct {
  char holetype[20];
  char targettype[20];
  int fiberid;
  double target_ra;
  double target_dec;
  char targetids[30];
} STRUCT1;

STRUCT1 APOGEE SKY 1 10.5 20.5 "na"
STRUCT1 APOGEE_SHARED science 2 11.0 21.0 "2MASS-J05354012-0524040"
STRUCT1 BOSS science 3 12.0 22.0 "x"
"#,
    )
    .unwrap();

    let map = source
        .fiber_map(apo(55600), FiberScheme::Plates, 5678)
        .unwrap()
        .unwrap();

    assert_eq!(map.rows.len(), 2);
    assert_eq!(map.rows[0].hole_type, "apogee");
    assert_eq!(map.rows[0].category, "sky_apogee");
    assert_eq!(map.rows[1].hole_type, "apogee_shared");
    assert_eq!(map.rows[1].designation.as_deref(), Some("05354012-0524040"));
}

#[test]
fn test_absent_fiber_file_is_none() {
    let root = tempfile::tempdir().unwrap();
    let source = FsFiberMapSource::new(root.path(), root.path());

    assert!(source
        .fiber_map(apo(60000), FiberScheme::Fps, 99)
        .unwrap()
        .is_none());
    assert!(source
        .fiber_map(apo(55600), FiberScheme::Plates, 99)
        .unwrap()
        .is_none());
}

#[test]
fn test_corrupt_fiber_file_is_collection_error() {
    let root = tempfile::tempdir().unwrap();
    let source = FsFiberMapSource::new(root.path(), root.path());
    let dir = source.config_summary_dir(Site::Lco, 8);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("confSummaryFS-8.par"), "typedef struct {\n int a;\n").unwrap();

    let err = source
        .fiber_map(Unit::new(Site::Lco, 60000), FiberScheme::Fps, 8)
        .unwrap_err();

    assert_eq!(err.code(), "ERR_COLLECTION");
    assert!(err.path().unwrap().ends_with("confSummaryFS-8.par"));
}
