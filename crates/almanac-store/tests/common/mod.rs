use almanac_core::{
    detect_sequences, DetectorPolicy, ExposureRecord, FiberMap, FiberRow, FiberScheme, ImageType,
    Pointing, Site, Unit, UnitCollection,
};

#[allow(dead_code)]
pub fn apo(mjd: i32) -> Unit {
    Unit::new(Site::Apo, mjd)
}

#[allow(dead_code)]
pub fn lco(mjd: i32) -> Unit {
    Unit::new(Site::Lco, mjd)
}

/// Science exposures at the given (exposure, config_id) pairs, with
/// sequences detected under the default policy
#[allow(dead_code)]
pub fn collection(unit: Unit, exposures: &[(u32, i64)]) -> UnitCollection {
    let records: Vec<ExposureRecord> = exposures
        .iter()
        .map(|&(exposure, config_id)| {
            let mut record = ExposureRecord::blank(unit, exposure, ImageType::Object)
                .with_pointing(Pointing {
                    field_id: Some(100),
                    config_id: Some(config_id),
                    ..Pointing::default()
                });
            record.n_read = 47;
            record.seeing = 1.25;
            record.comment = format!("exposure {}", exposure);
            record.fps = true;
            record
        })
        .collect();
    let detection = detect_sequences(&records, &DetectorPolicy::default());
    UnitCollection {
        unit,
        exposures: records,
        sequences: detection.sequences,
        gaps: detection.gaps,
        fiber_maps: None,
    }
}

#[allow(dead_code)]
pub fn fiber_map(config_id: i64, n_rows: i64) -> FiberMap {
    FiberMap {
        scheme: FiberScheme::Fps,
        identifier: config_id,
        rows: (1..=n_rows)
            .map(|fiber_id| FiberRow {
                fiber_id,
                hole_type: "APOGEE".to_string(),
                category: "science".to_string(),
                ra: 10.0 + fiber_id as f64,
                dec: -5.0,
                catalogid: Some(27021597842000000 + fiber_id),
                designation: None,
                sdss_id: None,
            })
            .collect(),
    }
}
