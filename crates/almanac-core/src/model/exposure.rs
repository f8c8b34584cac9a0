use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::site::{Site, Unit};

/// Raw per-exposure header dictionary as produced by a header scraper
///
/// Keys are lower-cased FITS keywords (`imagetyp`, `configid`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawExposure {
    /// Exposure number within the night (prefix removed)
    pub exposure: u32,
    /// Bit mask of chips with a file on disk (bit 0 = a, 1 = b, 2 = c)
    pub chip_flags: u8,
    pub headers: BTreeMap<String, String>,
}

impl RawExposure {
    pub fn new(exposure: u32) -> Self {
        Self {
            exposure,
            chip_flags: 0,
            headers: BTreeMap::new(),
        }
    }

    /// Builder used by tests and fakes
    pub fn with_header(mut self, key: &str, value: impl Into<String>) -> Self {
        self.headers.insert(key.to_ascii_lowercase(), value.into());
        self
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(String::as_str)
    }
}

/// Closed set of image types recorded in `IMAGETYP`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageType {
    Object,
    Dark,
    DomeFlat,
    QuartzFlat,
    InternalFlat,
    ArcLamp,
    Blackbody,
    Unknown,
}

impl ImageType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "object" => Some(ImageType::Object),
            "dark" => Some(ImageType::Dark),
            "domeflat" => Some(ImageType::DomeFlat),
            "quartzflat" => Some(ImageType::QuartzFlat),
            "internalflat" => Some(ImageType::InternalFlat),
            "arclamp" => Some(ImageType::ArcLamp),
            "blackbody" => Some(ImageType::Blackbody),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageType::Object => "object",
            ImageType::Dark => "dark",
            ImageType::DomeFlat => "domeflat",
            ImageType::QuartzFlat => "quartzflat",
            ImageType::InternalFlat => "internalflat",
            ImageType::ArcLamp => "arclamp",
            ImageType::Blackbody => "blackbody",
            ImageType::Unknown => "unknown",
        }
    }

    /// Science exposures taken on sky
    pub fn is_science(&self) -> bool {
        matches!(self, ImageType::Object)
    }
}

impl fmt::Display for ImageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Calibration lamp state normalised to a fixed integer domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(into = "i8", from = "i8")]
pub enum LampState {
    #[default]
    Unknown,
    Off,
    On,
}

impl LampState {
    pub fn code(&self) -> i8 {
        match self {
            LampState::Unknown => -1,
            LampState::Off => 0,
            LampState::On => 1,
        }
    }
}

impl From<LampState> for i8 {
    fn from(state: LampState) -> Self {
        state.code()
    }
}

impl From<i8> for LampState {
    fn from(code: i8) -> Self {
        match code {
            0 => LampState::Off,
            1 => LampState::On,
            _ => LampState::Unknown,
        }
    }
}

/// The configuration/plate/field reference an exposure was taken under
///
/// A pointing with every identifier unset is "null": it carries no identity
/// and never forces a sequence break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Pointing {
    pub field_id: Option<i64>,
    pub plate_id: Option<i64>,
    pub config_id: Option<i64>,
}

impl Pointing {
    pub fn is_null(&self) -> bool {
        self.field_id.is_none() && self.plate_id.is_none() && self.config_id.is_none()
    }
}

impl fmt::Display for Pointing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn show(v: Option<i64>) -> String {
            v.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
        }
        write!(
            f,
            "field={} plate={} config={}",
            show(self.field_id),
            show(self.plate_id),
            show(self.config_id)
        )
    }
}

/// Validated metadata for one exposure within a unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExposureRecord {
    pub site: Site,
    pub mjd: i32,
    /// Exposure number, unique within the unit
    pub exposure: u32,
    pub image_type: ImageType,
    pub n_read: u32,
    pub lamp_quartz: LampState,
    pub lamp_thar: LampState,
    pub lamp_une: LampState,
    pub pointing: Pointing,
    pub design_id: Option<i64>,
    pub map_id: Option<i64>,
    /// Cartridge id; 0 for the robotic focal plane
    pub cart_id: Option<i64>,
    #[serde(with = "super::serde_nan")]
    pub seeing: f64,
    #[serde(with = "super::serde_nan")]
    pub focus: f64,
    #[serde(with = "super::serde_nan")]
    pub collpist: f64,
    #[serde(with = "super::serde_nan")]
    pub colpitch: f64,
    #[serde(with = "super::serde_nan")]
    pub dithpix: f64,
    pub name: String,
    pub plate_type: String,
    pub date_obs: String,
    pub tcammid: String,
    pub tlsdetb: String,
    /// Free-text observer comment
    pub comment: String,

    // Derived properties
    /// Taken with the robotic fiber positioner rather than plug plates
    pub fps: bool,
    pub plugged_mjd: Option<i32>,
    pub plugged_iteration: Option<i32>,
    /// Listed in the known-bad exposure table
    pub flagged_bad: bool,
    pub chip_flags: u8,
}

impl ExposureRecord {
    /// A record with every optional field unset; used by fakes and tests
    pub fn blank(unit: Unit, exposure: u32, image_type: ImageType) -> Self {
        Self {
            site: unit.site,
            mjd: unit.mjd,
            exposure,
            image_type,
            n_read: 0,
            lamp_quartz: LampState::Unknown,
            lamp_thar: LampState::Unknown,
            lamp_une: LampState::Unknown,
            pointing: Pointing::default(),
            design_id: None,
            map_id: None,
            cart_id: None,
            seeing: f64::NAN,
            focus: f64::NAN,
            collpist: f64::NAN,
            colpitch: f64::NAN,
            dithpix: f64::NAN,
            name: String::new(),
            plate_type: String::new(),
            date_obs: String::new(),
            tcammid: String::new(),
            tlsdetb: String::new(),
            comment: String::new(),
            fps: false,
            plugged_mjd: None,
            plugged_iteration: None,
            flagged_bad: false,
            chip_flags: 0,
        }
    }

    pub fn unit(&self) -> Unit {
        Unit::new(self.site, self.mjd)
    }

    pub fn with_pointing(mut self, pointing: Pointing) -> Self {
        self.pointing = pointing;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lamp_state_codes() {
        assert_eq!(LampState::Unknown.code(), -1);
        assert_eq!(LampState::from(1), LampState::On);
        assert_eq!(LampState::from(7), LampState::Unknown);
    }

    #[test]
    fn test_image_type_parse_is_case_insensitive() {
        assert_eq!(ImageType::parse("ArcLamp"), Some(ImageType::ArcLamp));
        assert_eq!(ImageType::parse(" Object "), Some(ImageType::Object));
        assert_eq!(ImageType::parse("Guider"), None);
    }

    #[test]
    fn test_nan_fields_survive_json() {
        let unit = Unit::new(Site::Apo, 60000);
        let mut rec = ExposureRecord::blank(unit, 3, ImageType::Dark);
        rec.seeing = 1.25;
        let json = serde_json::to_string(&rec).unwrap();
        assert!(json.contains("\"focus\":null"));
        let back: ExposureRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.seeing, 1.25);
        assert!(back.focus.is_nan());
    }

    #[test]
    fn test_null_pointing() {
        assert!(Pointing::default().is_null());
        let p = Pointing {
            config_id: Some(7),
            ..Pointing::default()
        };
        assert!(!p.is_null());
    }
}
