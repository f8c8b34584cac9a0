#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::collections::HashSet;
use std::sync::Arc;

use almanac_core::logging_facility::test_capture::init_test_capture;
use almanac_core::rules::{BadExposureList, BadExposureNote};
use almanac_core::{CollectOutcome, DetectorPolicy, FiberScheme, GapKind, Sequence, UnitCollection};
use almanac_engine::{CollectorOptions, UnitCollector};
use common::{
    apo, calibration, collector, object, DownMatcher, EchoMatcher, FakeFibers, FakeHeaders,
    FPS_START_MJD,
};

fn collected(outcome: CollectOutcome) -> UnitCollection {
    match outcome {
        CollectOutcome::Collected(collection) => collection,
        other => panic!("expected a collection, got {:?}", other),
    }
}

#[test]
fn test_missing_exposures_split_sequences() {
    // GIVEN exposures 10,11,12,15,16 at one pointing
    let unit = apo(60000);
    let headers = FakeHeaders::default().with_night(
        unit,
        [10, 11, 12, 15, 16].iter().map(|&e| object(e, 7)).collect(),
    );

    // WHEN collected
    let result = collected(collector(headers, CollectorOptions::default()).collect(unit).unwrap());

    // THEN two sequences and one missing-exposure gap
    assert_eq!(result.sequences, vec![Sequence::new(10, 12), Sequence::new(15, 16)]);
    assert_eq!(result.gaps.len(), 1);
    assert_eq!(result.gaps[0].kind, GapKind::MissingExposures);
    assert_eq!((result.gaps[0].after, result.gaps[0].before), (12, 15));
    assert!(result.fiber_maps.is_none());
}

#[test]
fn test_empty_night_is_no_data() {
    let unit = apo(60001);
    let outcome = collector(FakeHeaders::default(), CollectorOptions::default())
        .collect(unit)
        .unwrap();
    assert_eq!(outcome, CollectOutcome::NoData { unit });
}

#[test]
fn test_night_of_rejected_records_is_no_data() {
    // GIVEN a night whose only file carries exposure number 0
    let unit = apo(60002);
    let headers = FakeHeaders::default().with_night(unit, vec![object(0, 7)]);

    let outcome = collector(headers, CollectorOptions::default()).collect(unit).unwrap();

    assert_eq!(outcome, CollectOutcome::NoData { unit });
}

#[test]
fn test_scrape_failure_is_collection_error() {
    let unit = apo(60003);
    let headers = FakeHeaders::default().with_broken(unit);

    let err = collector(headers, CollectorOptions::default())
        .collect(unit)
        .unwrap_err();

    assert_eq!(err.code(), "ERR_COLLECTION");
    assert_eq!(err.unit(), Some("apo/60003"));
}

#[test]
fn test_records_sorted_and_deduplicated() {
    // GIVEN headers out of order with a repeated exposure number
    let unit = apo(60004);
    let headers = FakeHeaders::default().with_night(
        unit,
        vec![object(3, 7), object(1, 7), object(2, 7), object(2, 8)],
    );

    // WHEN collected
    let result = collected(collector(headers, CollectorOptions::default()).collect(unit).unwrap());

    // THEN records are ascending and the first copy of exposure 2 wins
    let numbers: Vec<u32> = result.exposures.iter().map(|r| r.exposure).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
    assert_eq!(result.exposures[1].pointing.config_id, Some(7));
    assert_eq!(result.sequences, vec![Sequence::new(1, 3)]);
}

#[test]
fn test_records_are_normalized() {
    let unit = apo(60005);
    let headers = FakeHeaders::default().with_night(unit, vec![object(1, 7)]);

    let result = collected(collector(headers, CollectorOptions::default()).collect(unit).unwrap());
    let record = &result.exposures[0];

    assert_eq!(record.n_read, 47);
    assert_eq!(record.lamp_quartz.code(), 0);
    assert_eq!(record.lamp_thar.code(), -1);
    assert!(record.fps);
    assert!(record.seeing.is_nan());
}

#[test]
fn test_known_bad_exposures_are_flagged() {
    let unit = apo(60006);
    let headers = FakeHeaders::default().with_night(unit, vec![object(1, 7), object(2, 7)]);
    let mut bad = BadExposureList::empty();
    bad.insert(
        unit,
        Some(2),
        BadExposureNote {
            image_type: "object".to_string(),
            notes: "dome closed".to_string(),
        },
    );

    let result = collected(
        collector(headers, CollectorOptions::default())
            .with_bad_exposures(bad)
            .collect(unit)
            .unwrap(),
    );

    assert!(!result.exposures[0].flagged_bad);
    assert!(result.exposures[1].flagged_bad);
    assert_eq!(result.n_flagged_bad(), 1);
}

#[test]
fn test_one_fiber_map_per_science_pointing() {
    // GIVEN science at configurations 7 and 9 plus a calibration with no pointing
    let unit = apo(60007);
    let headers = FakeHeaders::default().with_night(
        unit,
        vec![
            calibration(1, "Dark"),
            object(2, 7),
            object(3, 7),
            object(4, 9),
        ],
    );

    // WHEN collected with fiber mapping
    let result = collected(
        collector(headers, CollectorOptions::new(true, false))
            .collect(unit)
            .unwrap(),
    );

    // THEN one FPS map per configuration
    let maps = result.fiber_maps.unwrap();
    let keys: Vec<(FiberScheme, i64)> = maps.iter().map(|m| (m.scheme, m.identifier)).collect();
    assert_eq!(keys, vec![(FiberScheme::Fps, 7), (FiberScheme::Fps, 9)]);
    assert!(maps.iter().all(|m| m.rows.len() == 3));
}

#[test]
fn test_missing_fiber_map_is_omitted() {
    let unit = apo(60008);
    let headers = FakeHeaders::default().with_night(unit, vec![object(1, 7), object(2, 9)]);
    let fibers = FakeFibers {
        rows: 2,
        missing: HashSet::from([9]),
    };
    let collector = UnitCollector::new(
        Arc::new(headers),
        Arc::new(fibers),
        DetectorPolicy::default(),
        FPS_START_MJD,
        CollectorOptions::new(true, true),
    );

    let result = collected(collector.collect(unit).unwrap());

    let maps = result.fiber_maps.unwrap();
    assert_eq!(maps.len(), 1);
    assert_eq!(maps[0].identifier, 7);
}

#[test]
fn test_cross_match_attaches_identifiers() {
    let unit = apo(60009);
    let headers = FakeHeaders::default().with_night(unit, vec![object(1, 7)]);

    let result = collected(
        collector(headers, CollectorOptions::new(true, true))
            .with_cross_matcher(Arc::new(EchoMatcher))
            .collect(unit)
            .unwrap(),
    );

    let rows = &result.fiber_maps.unwrap()[0].rows;
    assert_eq!(rows[0].sdss_id, Some(-7001));
    assert!(rows.iter().all(|r| r.sdss_id == r.catalogid.map(|c| -c)));
}

#[test]
fn test_cross_match_disabled_leaves_identifiers_unset() {
    // GIVEN a working matcher but cross-matching switched off
    let unit = apo(60010);
    let headers = FakeHeaders::default().with_night(unit, vec![object(1, 7), object(2, 8)]);

    // WHEN collected with fibers only
    let result = collected(
        collector(headers, CollectorOptions::new(true, false))
            .with_cross_matcher(Arc::new(EchoMatcher))
            .collect(unit)
            .unwrap(),
    );

    // THEN every row is present and unresolved
    let maps = result.fiber_maps.unwrap();
    assert_eq!(maps.len(), 2);
    assert!(maps
        .iter()
        .flat_map(|m| m.rows.iter())
        .all(|r| r.sdss_id.is_none()));
}

#[test]
fn test_cross_match_failure_is_logged_not_fatal() {
    let capture = init_test_capture();
    let unit = apo(60011);
    let headers = FakeHeaders::default().with_night(unit, vec![object(1, 7)]);

    let result = collected(
        collector(headers, CollectorOptions::new(true, true))
            .with_cross_matcher(Arc::new(DownMatcher))
            .collect(unit)
            .unwrap(),
    );

    assert!(result.fiber_maps.unwrap()[0]
        .rows
        .iter()
        .all(|r| r.sdss_id.is_none()));
    let warnings: Vec<_> = capture
        .events_for_unit("apo/60011")
        .into_iter()
        .filter(|e| e.op.as_deref() == Some("cross_match"))
        .collect();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].field("err_code"), Some("ERR_CROSS_MATCH"));
}

#[test]
fn test_collect_logs_start_and_end() {
    let capture = init_test_capture();
    let unit = apo(60012);
    let headers = FakeHeaders::default().with_night(unit, vec![object(1, 7)]);

    collector(headers, CollectorOptions::default()).collect(unit).unwrap();

    let events: Vec<_> = capture
        .events_for_unit("apo/60012")
        .into_iter()
        .filter(|e| e.op.as_deref() == Some("collect_unit"))
        .collect();
    assert!(events.iter().any(|e| e.event.as_deref() == Some("start")));
    assert!(events
        .iter()
        .any(|e| e.event.as_deref() == Some("end") && e.field("n_exposures") == Some("1")));
}
