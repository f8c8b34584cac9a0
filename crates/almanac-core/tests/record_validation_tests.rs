#![allow(clippy::unwrap_used, clippy::expect_used)]

use almanac_core::rules::{BadExposureList, BadExposureNote, RecordValidator, ValidationOutcome};
use almanac_core::{ImageType, LampState, RawExposure, Site, Unit};

fn science_headers(exposure: u32) -> RawExposure {
    RawExposure::new(exposure)
        .with_header("IMAGETYP", "Object")
        .with_header("NREAD", "47")
        .with_header("LAMPQRTZ", "F")
        .with_header("LAMPTHAR", "F")
        .with_header("LAMPUNE", "F")
        .with_header("FIELDID", "100993")
        .with_header("CONFIGID", "10234")
        .with_header("DESIGNID", "20111")
        .with_header("PLATEID", "")
        .with_header("CARTID", "FPS")
        .with_header("SEEING", "1.3")
        .with_header("OBSCMNT", "clouds near end")
}

#[test]
fn test_science_exposure_accepted_without_issues() {
    // GIVEN a clean robotic-era science header at apo
    let unit = Unit::new(Site::Apo, 60000);
    let bad = BadExposureList::empty();
    let validator = RecordValidator::new(unit, 59550, &bad);

    // WHEN validating
    let outcome = validator.validate(&science_headers(12));

    // THEN every field is typed and derived properties are set
    let ValidationOutcome::Accepted { record, issues } = outcome else {
        panic!("expected accepted record");
    };
    assert!(issues.is_empty(), "unexpected issues: {issues:?}");
    assert_eq!(record.image_type, ImageType::Object);
    assert_eq!(record.n_read, 47);
    assert_eq!(record.lamp_une, LampState::Off);
    assert_eq!(record.pointing.config_id, Some(10234));
    assert_eq!(record.pointing.plate_id, None);
    assert_eq!(record.cart_id, Some(0));
    assert!(record.fps);
    assert!(!record.flagged_bad);
    assert_eq!(record.comment, "clouds near end");
}

#[test]
fn test_malformed_fields_are_defaulted_and_reported() {
    let unit = Unit::new(Site::Lco, 58000);
    let bad = BadExposureList::empty();
    let validator = RecordValidator::new(unit, 59550, &bad);

    let raw = RawExposure::new(3)
        .with_header("IMAGETYP", "Guider")
        .with_header("NREAD", "-2")
        .with_header("LAMPTHAR", "maybe")
        .with_header("PLATEID", "abc")
        .with_header("SEEING", "NaN-ish")
        .with_header("NAME", "8100-57832-01");

    let ValidationOutcome::Accepted { record, issues } = validator.validate(&raw) else {
        panic!("expected accepted record");
    };

    let fields: Vec<&str> = issues.iter().map(|i| i.field).collect();
    assert_eq!(fields, vec!["plateid", "imagetyp", "nread", "lampthar", "seeing"]);
    assert_eq!(record.image_type, ImageType::Unknown);
    assert_eq!(record.n_read, 0);
    assert_eq!(record.lamp_thar, LampState::Unknown);
    assert!(record.seeing.is_nan());
    assert!(!record.fps);
    assert_eq!(record.plugged_mjd, Some(57832));
    assert_eq!(record.plugged_iteration, Some(1));
}

#[test]
fn test_exposure_zero_is_rejected() {
    let bad = BadExposureList::empty();
    let validator = RecordValidator::new(Unit::new(Site::Apo, 60000), 59550, &bad);
    assert!(matches!(
        validator.validate(&science_headers(0)),
        ValidationOutcome::Rejected { exposure: 0, .. }
    ));
}

#[test]
fn test_known_bad_exposure_is_flagged() {
    let unit = Unit::new(Site::Apo, 60000);
    let mut bad = BadExposureList::empty();
    bad.insert(
        unit,
        Some(12),
        BadExposureNote {
            image_type: "Object".to_string(),
            notes: "shutter stuck".to_string(),
        },
    );
    let validator = RecordValidator::new(unit, 59550, &bad);

    let flagged = validator.validate(&science_headers(12));
    let clean = validator.validate(&science_headers(13));

    assert!(matches!(flagged, ValidationOutcome::Accepted { ref record, .. } if record.flagged_bad));
    assert!(matches!(clean, ValidationOutcome::Accepted { ref record, .. } if !record.flagged_bad));
}
