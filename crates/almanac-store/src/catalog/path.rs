//! Hierarchical section addressing

use almanac_core::errors::CoreError;
use almanac_core::{FiberScheme, Site, Unit};
use std::fmt;
use std::str::FromStr;

/// What a section holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SectionKind {
    Exposures,
    Sequences,
    Fibers { scheme: FiberScheme, identifier: i64 },
}

impl SectionKind {
    /// Value of the `kind` column
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKind::Exposures => "exposures",
            SectionKind::Sequences => "sequences",
            SectionKind::Fibers { .. } => "fibers",
        }
    }
}

/// `<site>/<mjd>/exposures`, `<site>/<mjd>/sequences` or
/// `<site>/<mjd>/fibers/<scheme>/<identifier>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SectionPath {
    pub unit: Unit,
    pub kind: SectionKind,
}

impl SectionPath {
    pub fn exposures(unit: Unit) -> Self {
        Self {
            unit,
            kind: SectionKind::Exposures,
        }
    }

    pub fn sequences(unit: Unit) -> Self {
        Self {
            unit,
            kind: SectionKind::Sequences,
        }
    }

    pub fn fibers(unit: Unit, scheme: FiberScheme, identifier: i64) -> Self {
        Self {
            unit,
            kind: SectionKind::Fibers { scheme, identifier },
        }
    }

    /// Prefix matching every fiber section of a unit
    pub fn fibers_prefix(unit: Unit) -> String {
        format!("{}/fibers/", unit)
    }
}

impl fmt::Display for SectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            SectionKind::Fibers { scheme, identifier } => {
                write!(f, "{}/fibers/{}/{}", self.unit, scheme, identifier)
            }
            kind => write!(f, "{}/{}", self.unit, kind.as_str()),
        }
    }
}

impl FromStr for SectionPath {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::InvalidSectionPath {
            path: s.to_string(),
        };
        let parts: Vec<&str> = s.split('/').collect();
        let (site, mjd, rest) = match parts.as_slice() {
            [site, mjd, rest @ ..] if !rest.is_empty() => (*site, *mjd, rest),
            _ => return Err(invalid()),
        };
        let site: Site = site.parse().map_err(|_| invalid())?;
        let mjd: i32 = mjd.parse().map_err(|_| invalid())?;
        let unit = Unit::new(site, mjd);

        let kind = match rest {
            ["exposures"] => SectionKind::Exposures,
            ["sequences"] => SectionKind::Sequences,
            ["fibers", scheme, identifier] => SectionKind::Fibers {
                scheme: scheme.parse().map_err(|_| invalid())?,
                identifier: identifier.parse().map_err(|_| invalid())?,
            },
            _ => return Err(invalid()),
        };
        Ok(Self { unit, kind })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_parse() {
        let unit = Unit::new(Site::Lco, 60123);
        let path = SectionPath::fibers(unit, FiberScheme::Fps, 10234);
        assert_eq!(path.to_string(), "lco/60123/fibers/fps/10234");
        assert_eq!("lco/60123/fibers/fps/10234".parse::<SectionPath>().unwrap(), path);
        assert_eq!(
            "apo/60000/sequences".parse::<SectionPath>().unwrap(),
            SectionPath::sequences(Unit::new(Site::Apo, 60000))
        );
    }

    #[test]
    fn test_rejects_malformed_paths() {
        for bad in [
            "apo/60000",
            "apo/x/exposures",
            "mars/60000/exposures",
            "apo/60000/fibers/fps",
            "apo/60000/fibers/robots/1",
            "apo/60000/headers",
        ] {
            assert!(bad.parse::<SectionPath>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn test_fibers_prefix() {
        let unit = Unit::new(Site::Apo, 60000);
        let path = SectionPath::fibers(unit, FiberScheme::Plates, 8100).to_string();
        assert!(path.starts_with(&SectionPath::fibers_prefix(unit)));
    }
}
