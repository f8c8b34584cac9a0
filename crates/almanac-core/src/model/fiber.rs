use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::CoreError;

/// How fibers were positioned for a pointing
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FiberScheme {
    /// Robotic fiber positioner, keyed by configuration id
    Fps,
    /// Plug plates, keyed by plate id
    Plates,
}

impl FiberScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            FiberScheme::Fps => "fps",
            FiberScheme::Plates => "plates",
        }
    }
}

impl fmt::Display for FiberScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FiberScheme {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fps" => Ok(FiberScheme::Fps),
            "plates" => Ok(FiberScheme::Plates),
            other => Err(CoreError::InvalidSectionPath {
                path: other.to_string(),
            }),
        }
    }
}

/// Key handed to the cross-match collaborator for one fiber row
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CrossMatchKey {
    CatalogId(i64),
    /// 2MASS designation without survey prefix, e.g. `J05353358-0521346`
    TwoMass(String),
}

/// One fiber-to-target association
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiberRow {
    pub fiber_id: i64,
    pub hole_type: String,
    pub category: String,
    #[serde(with = "super::serde_nan")]
    pub ra: f64,
    #[serde(with = "super::serde_nan")]
    pub dec: f64,
    /// Targeting catalog id (robotic era)
    pub catalogid: Option<i64>,
    /// 2MASS designation (plate era)
    pub designation: Option<String>,
    /// Stable catalog identifier attached by cross-match
    pub sdss_id: Option<i64>,
}

impl FiberRow {
    /// The key this row is cross-matched on, if it has one
    pub fn cross_match_key(&self) -> Option<CrossMatchKey> {
        if let Some(id) = self.catalogid.filter(|id| *id > 0) {
            return Some(CrossMatchKey::CatalogId(id));
        }
        self.designation
            .as_deref()
            .filter(|d| !d.is_empty())
            .map(|d| CrossMatchKey::TwoMass(d.to_string()))
    }
}

/// Fiber table for one scheme/identifier within a unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiberMap {
    pub scheme: FiberScheme,
    pub identifier: i64,
    pub rows: Vec<FiberRow>,
}

impl FiberMap {
    /// Path segment below the unit, e.g. `fibers/fps/10234`
    pub fn section_suffix(&self) -> String {
        format!("fibers/{}/{}", self.scheme, self.identifier)
    }
}
