use almanac_core::{ExposureRecord, ImageType, Pointing, Site, Unit};

/// Unit used by most detector tests
#[allow(dead_code)]
pub fn test_unit() -> Unit {
    Unit::new(Site::Apo, 60000)
}

/// Science exposure at a configuration
#[allow(dead_code)]
pub fn object_at(exposure: u32, config_id: i64) -> ExposureRecord {
    ExposureRecord::blank(test_unit(), exposure, ImageType::Object).with_pointing(Pointing {
        field_id: Some(100),
        config_id: Some(config_id),
        ..Pointing::default()
    })
}

/// Exposure with no pointing identity
#[allow(dead_code)]
pub fn calibration(exposure: u32, image_type: ImageType) -> ExposureRecord {
    ExposureRecord::blank(test_unit(), exposure, image_type)
}
