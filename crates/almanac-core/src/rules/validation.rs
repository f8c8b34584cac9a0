//! Header validation
//!
//! Each header field has its own parser returning a [`FieldOutcome`]: either
//! the value was parsed as-is, or a default was substituted and the reason
//! recorded. A record is only rejected outright when it cannot be placed
//! in a sequence at all.

use crate::model::{ExposureRecord, ImageType, LampState, Pointing, RawExposure, Unit};
use crate::rules::quality::BadExposureList;

/// A field that had to be defaulted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub field: &'static str,
    pub raw: String,
    pub reason: &'static str,
}

/// Result of parsing one header field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOutcome<T> {
    Parsed(T),
    Defaulted { value: T, issue: FieldIssue },
}

impl<T> FieldOutcome<T> {
    fn defaulted(value: T, field: &'static str, raw: &str, reason: &'static str) -> Self {
        FieldOutcome::Defaulted {
            value,
            issue: FieldIssue {
                field,
                raw: raw.to_string(),
                reason,
            },
        }
    }

    pub fn value(&self) -> &T {
        match self {
            FieldOutcome::Parsed(v) => v,
            FieldOutcome::Defaulted { value, .. } => value,
        }
    }

    /// Take the value, moving any issue into `issues`
    pub fn collect(self, issues: &mut Vec<FieldIssue>) -> T {
        match self {
            FieldOutcome::Parsed(v) => v,
            FieldOutcome::Defaulted { value, issue } => {
                issues.push(issue);
                value
            }
        }
    }
}

fn present(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

/// Identifiers (`fieldid`, `plateid`, `configid`, ...): blank or
/// non-positive means unset
pub fn parse_identifier(field: &'static str, raw: Option<&str>) -> FieldOutcome<Option<i64>> {
    let Some(s) = present(raw) else {
        return FieldOutcome::Parsed(None);
    };
    match s.parse::<i64>() {
        Ok(v) if v > 0 => FieldOutcome::Parsed(Some(v)),
        Ok(_) => FieldOutcome::Parsed(None),
        Err(_) => FieldOutcome::defaulted(None, field, s, "not an integer"),
    }
}

/// `cartid`: `FPS` is the robotic positioner, recorded as 0
pub fn parse_cart_id(raw: Option<&str>) -> FieldOutcome<Option<i64>> {
    let Some(s) = present(raw) else {
        return FieldOutcome::Parsed(None);
    };
    if s.eq_ignore_ascii_case("fps") {
        return FieldOutcome::Parsed(Some(0));
    }
    match s.parse::<i64>() {
        Ok(v) => FieldOutcome::Parsed(Some(v)),
        Err(_) => FieldOutcome::defaulted(None, "cartid", s, "not an integer or FPS"),
    }
}

/// Floating point values default to NaN
pub fn parse_float(field: &'static str, raw: Option<&str>) -> FieldOutcome<f64> {
    let Some(s) = present(raw) else {
        return FieldOutcome::Parsed(f64::NAN);
    };
    match s.parse::<f64>() {
        Ok(v) => FieldOutcome::Parsed(v),
        Err(_) => FieldOutcome::defaulted(f64::NAN, field, s, "not a number"),
    }
}

/// FITS logicals: `T` on, `F` off
pub fn parse_lamp(field: &'static str, raw: Option<&str>) -> FieldOutcome<LampState> {
    match present(raw) {
        None => FieldOutcome::Parsed(LampState::Unknown),
        Some("T") => FieldOutcome::Parsed(LampState::On),
        Some("F") => FieldOutcome::Parsed(LampState::Off),
        Some(s) => FieldOutcome::defaulted(LampState::Unknown, field, s, "not a FITS logical"),
    }
}

pub fn parse_count(field: &'static str, raw: Option<&str>) -> FieldOutcome<u32> {
    let Some(s) = present(raw) else {
        return FieldOutcome::Parsed(0);
    };
    match s.parse::<u32>() {
        Ok(v) => FieldOutcome::Parsed(v),
        Err(_) => FieldOutcome::defaulted(0, field, s, "not a non-negative integer"),
    }
}

pub fn parse_image_type(raw: Option<&str>) -> FieldOutcome<ImageType> {
    match present(raw) {
        None => FieldOutcome::defaulted(ImageType::Unknown, "imagetyp", "", "missing"),
        Some(s) => match ImageType::parse(s) {
            Some(t) => FieldOutcome::Parsed(t),
            None => FieldOutcome::defaulted(ImageType::Unknown, "imagetyp", s, "unknown type"),
        },
    }
}

/// Plug-plate name `<plate>-<mjd>-<iteration>` gives the plugging night
/// and iteration
pub fn parse_plugged(name: &str) -> (Option<i32>, Option<i32>) {
    let mut parts = name.trim().split('-').skip(1);
    let mjd = parts.next().and_then(|s| s.trim().parse().ok());
    let iteration = parts.next().and_then(|s| s.trim().parse().ok());
    (mjd, iteration)
}

/// Outcome of validating one raw exposure
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    Accepted {
        record: Box<ExposureRecord>,
        issues: Vec<FieldIssue>,
    },
    Rejected {
        exposure: u32,
        reason: String,
    },
}

/// Turns raw header dictionaries into exposure records for one unit
pub struct RecordValidator<'a> {
    unit: Unit,
    fps_start_mjd: i32,
    bad_exposures: &'a BadExposureList,
}

impl<'a> RecordValidator<'a> {
    pub fn new(unit: Unit, fps_start_mjd: i32, bad_exposures: &'a BadExposureList) -> Self {
        Self {
            unit,
            fps_start_mjd,
            bad_exposures,
        }
    }

    pub fn validate(&self, raw: &RawExposure) -> ValidationOutcome {
        if raw.exposure == 0 {
            return ValidationOutcome::Rejected {
                exposure: 0,
                reason: "exposure number 0 is not a valid exposure".to_string(),
            };
        }

        let h = |key: &str| raw.header(key);
        let text = |key: &str| h(key).map(|s| s.trim().to_string()).unwrap_or_default();
        let mut issues = Vec::new();

        let pointing = Pointing {
            field_id: parse_identifier("fieldid", h("fieldid")).collect(&mut issues),
            plate_id: parse_identifier("plateid", h("plateid")).collect(&mut issues),
            config_id: parse_identifier("configid", h("configid")).collect(&mut issues),
        };
        let name = text("name");
        let (plugged_mjd, plugged_iteration) = parse_plugged(&name);

        let record = ExposureRecord {
            site: self.unit.site,
            mjd: self.unit.mjd,
            exposure: raw.exposure,
            image_type: parse_image_type(h("imagetyp")).collect(&mut issues),
            n_read: parse_count("nread", h("nread")).collect(&mut issues),
            lamp_quartz: parse_lamp("lampqrtz", h("lampqrtz")).collect(&mut issues),
            lamp_thar: parse_lamp("lampthar", h("lampthar")).collect(&mut issues),
            lamp_une: parse_lamp("lampune", h("lampune")).collect(&mut issues),
            pointing,
            design_id: parse_identifier("designid", h("designid")).collect(&mut issues),
            map_id: parse_identifier("mapid", h("mapid")).collect(&mut issues),
            cart_id: parse_cart_id(h("cartid")).collect(&mut issues),
            seeing: parse_float("seeing", h("seeing")).collect(&mut issues),
            focus: parse_float("focus", h("focus")).collect(&mut issues),
            collpist: parse_float("collpist", h("collpist")).collect(&mut issues),
            colpitch: parse_float("colpitch", h("colpitch")).collect(&mut issues),
            dithpix: parse_float("dithpix", h("dithpix")).collect(&mut issues),
            name,
            plate_type: text("platetyp"),
            date_obs: text("date-obs"),
            tcammid: text("tcammid"),
            tlsdetb: text("tlsdetb"),
            comment: text("obscmnt"),
            fps: self.unit.mjd >= self.fps_start_mjd,
            plugged_mjd,
            plugged_iteration,
            flagged_bad: self.bad_exposures.is_bad(self.unit, raw.exposure),
            chip_flags: raw.chip_flags,
        };

        ValidationOutcome::Accepted {
            record: Box::new(record),
            issues,
        }
    }
}
