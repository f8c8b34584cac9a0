use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::CoreError;
use crate::model::{ExposureRecord, ImageType, Pointing};

/// Inclusive range of exposure numbers forming one observing block
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Sequence {
    pub start: u32,
    pub end: u32,
}

impl Sequence {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Never zero: a sequence holds at least its start exposure
    pub fn n_exposures(&self) -> u32 {
        self.end - self.start + 1
    }

    pub fn contains(&self, exposure: u32) -> bool {
        (self.start..=self.end).contains(&exposure)
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Why a sequence was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapKind {
    /// Pointing identity changed, whether or not numbering is consecutive
    NewPointing,
    /// Numbering skipped within an otherwise continuing pointing
    MissingExposures,
    /// The boundary rule forced a break between image types
    ImageTypeChange,
}

/// A break between two adjacent exposures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GapEvent {
    pub kind: GapKind,
    /// Last exposure of the closed sequence
    pub after: u32,
    /// First exposure of the new sequence
    pub before: u32,
}

impl GapEvent {
    /// Exposure numbers absent between the two sides
    pub fn missing(&self) -> u32 {
        self.before.saturating_sub(self.after + 1)
    }
}

impl fmt::Display for GapEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            GapKind::NewPointing => write!(f, "new pointing at {}", self.before),
            GapKind::MissingExposures => write!(
                f,
                "{} missing exposure(s) between {} and {}",
                self.missing(),
                self.after,
                self.before
            ),
            GapKind::ImageTypeChange => write!(f, "image type change at {}", self.before),
        }
    }
}

/// Which image-type transitions force a sequence break
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryRule {
    /// Image type never breaks a sequence
    Never,
    /// Any change of image type breaks
    #[default]
    OnTypeChange,
    /// Only transitions between science and calibration frames break
    ScienceEdges,
}

impl BoundaryRule {
    pub fn breaks(&self, from: ImageType, to: ImageType) -> bool {
        match self {
            BoundaryRule::Never => false,
            BoundaryRule::OnTypeChange => from != to,
            BoundaryRule::ScienceEdges => from.is_science() != to.is_science(),
        }
    }
}

impl FromStr for BoundaryRule {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "never" => Ok(BoundaryRule::Never),
            "on_type_change" => Ok(BoundaryRule::OnTypeChange),
            "science_edges" => Ok(BoundaryRule::ScienceEdges),
            other => Err(CoreError::Config {
                path: "collector.boundary_rule".to_string(),
                reason: format!("unknown boundary rule '{}'", other),
            }),
        }
    }
}

/// Detector configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DetectorPolicy {
    pub boundary: BoundaryRule,
}

/// Output of [`detect_sequences`]
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Detection {
    pub sequences: Vec<Sequence>,
    pub gaps: Vec<GapEvent>,
}

struct Open {
    start: u32,
    end: u32,
    image_type: ImageType,
    /// First non-null pointing seen in this sequence
    pointing: Option<Pointing>,
}

/// Partition a unit's exposures into sequences
///
/// Records are visited in ascending exposure order; repeated numbers are
/// ignored after their first occurrence. A sequence is extended while the
/// next number is consecutive, the pointing is unchanged (a null pointing
/// always continues) and the boundary rule allows the image-type
/// transition. Every break emits one gap event; when several causes apply
/// the pointing change wins, then missing numbers.
pub fn detect_sequences(records: &[ExposureRecord], policy: &DetectorPolicy) -> Detection {
    let mut ordered: Vec<&ExposureRecord> = records.iter().collect();
    ordered.sort_by_key(|r| r.exposure);

    let mut detection = Detection::default();
    let mut current: Option<Open> = None;

    for record in ordered {
        let pointing = (!record.pointing.is_null()).then_some(record.pointing);

        let open = match current.as_mut() {
            Some(open) => open,
            None => {
                current = Some(Open {
                    start: record.exposure,
                    end: record.exposure,
                    image_type: record.image_type,
                    pointing,
                });
                continue;
            }
        };

        if record.exposure == open.end {
            continue;
        }

        let pointing_changed = matches!(
            (open.pointing, pointing),
            (Some(a), Some(b)) if a != b
        );
        let consecutive = record.exposure == open.end + 1;
        let type_break = policy.boundary.breaks(open.image_type, record.image_type);

        let kind = if pointing_changed {
            Some(GapKind::NewPointing)
        } else if !consecutive {
            Some(GapKind::MissingExposures)
        } else if type_break {
            Some(GapKind::ImageTypeChange)
        } else {
            None
        };

        match kind {
            None => {
                open.end = record.exposure;
                open.image_type = record.image_type;
                if open.pointing.is_none() {
                    open.pointing = pointing;
                }
            }
            Some(kind) => {
                detection.gaps.push(GapEvent {
                    kind,
                    after: open.end,
                    before: record.exposure,
                });
                detection.sequences.push(Sequence::new(open.start, open.end));
                *open = Open {
                    start: record.exposure,
                    end: record.exposure,
                    image_type: record.image_type,
                    pointing: pointing.or(open.pointing),
                };
            }
        }
    }

    if let Some(open) = current {
        detection.sequences.push(Sequence::new(open.start, open.end));
    }
    detection
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Site, Unit};

    fn rec(exposure: u32, image_type: ImageType, config: Option<i64>) -> ExposureRecord {
        ExposureRecord::blank(Unit::new(Site::Apo, 60000), exposure, image_type).with_pointing(
            Pointing {
                config_id: config,
                ..Pointing::default()
            },
        )
    }

    #[test]
    fn test_boundary_rules() {
        use ImageType::*;
        assert!(!BoundaryRule::Never.breaks(Object, Dark));
        assert!(BoundaryRule::OnTypeChange.breaks(Object, Dark));
        assert!(!BoundaryRule::OnTypeChange.breaks(Dark, Dark));
        assert!(BoundaryRule::ScienceEdges.breaks(ArcLamp, Object));
        assert!(!BoundaryRule::ScienceEdges.breaks(ArcLamp, QuartzFlat));
    }

    #[test]
    fn test_type_change_ignored_under_never() {
        let records = vec![
            rec(1, ImageType::Dark, None),
            rec(2, ImageType::Object, None),
        ];
        let policy = DetectorPolicy {
            boundary: BoundaryRule::Never,
        };
        let d = detect_sequences(&records, &policy);
        assert_eq!(d.sequences, vec![Sequence::new(1, 2)]);
        assert!(d.gaps.is_empty());
    }

    #[test]
    fn test_null_pointing_does_not_reset_identity() {
        // 1 (cfg 5), 2 (null), 3 (cfg 5) stays one sequence
        let records = vec![
            rec(1, ImageType::Object, Some(5)),
            rec(2, ImageType::Object, None),
            rec(3, ImageType::Object, Some(5)),
        ];
        let d = detect_sequences(&records, &DetectorPolicy::default());
        assert_eq!(d.sequences, vec![Sequence::new(1, 3)]);
    }

    #[test]
    fn test_missing_gap_keeps_pointing_identity() {
        // 1 (cfg 5), 3 (null), 4 (cfg 6): 3 inherits cfg 5, so 4 is a new pointing
        let records = vec![
            rec(1, ImageType::Object, Some(5)),
            rec(3, ImageType::Object, None),
            rec(4, ImageType::Object, Some(6)),
        ];
        let d = detect_sequences(&records, &DetectorPolicy::default());
        assert_eq!(
            d.sequences,
            vec![Sequence::new(1, 1), Sequence::new(3, 3), Sequence::new(4, 4)]
        );
        assert_eq!(d.gaps[0].kind, GapKind::MissingExposures);
        assert_eq!(d.gaps[1].kind, GapKind::NewPointing);
    }

    #[test]
    fn test_gap_display() {
        let gap = GapEvent {
            kind: GapKind::MissingExposures,
            after: 12,
            before: 15,
        };
        assert_eq!(gap.missing(), 2);
        assert_eq!(gap.to_string(), "2 missing exposure(s) between 12 and 15");
    }
}
