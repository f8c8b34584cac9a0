use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::CoreError;

/// One of the two fixed observing locations
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Site {
    /// Apache Point Observatory
    Apo,
    /// Las Campanas Observatory
    Lco,
}

impl Site {
    pub const ALL: [Site; 2] = [Site::Apo, Site::Lco];

    pub fn as_str(&self) -> &'static str {
        match self {
            Site::Apo => "apo",
            Site::Lco => "lco",
        }
    }

    /// Raw exposure file prefix written by the site's spectrograph
    pub fn file_prefix(&self) -> &'static str {
        match self {
            Site::Apo => "apR",
            Site::Lco => "asR",
        }
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Site {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "apo" => Ok(Site::Apo),
            "lco" => Ok(Site::Lco),
            _ => Err(CoreError::UnknownSite {
                value: s.to_string(),
            }),
        }
    }
}

/// Which sites a query covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SiteSelector {
    Apo,
    Lco,
    #[default]
    Both,
}

impl SiteSelector {
    /// Exactly one flag selects that site; none or both select both
    pub fn from_flags(apo: bool, lco: bool) -> Self {
        match (apo, lco) {
            (true, false) => SiteSelector::Apo,
            (false, true) => SiteSelector::Lco,
            _ => SiteSelector::Both,
        }
    }

    pub fn sites(&self) -> Vec<Site> {
        match self {
            SiteSelector::Apo => vec![Site::Apo],
            SiteSelector::Lco => vec![Site::Lco],
            SiteSelector::Both => Site::ALL.to_vec(),
        }
    }
}

/// The (site, date-index) granule of collection and of catalog merge
///
/// Ordering is site-major, date-minor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Unit {
    pub site: Site,
    pub mjd: i32,
}

impl Unit {
    pub fn new(site: Site, mjd: i32) -> Self {
        Self { site, mjd }
    }

    /// Catalog key prefix, e.g. `apo/60000`
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.site, self.mjd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_order_is_site_major() {
        let mut units = vec![
            Unit::new(Site::Lco, 10),
            Unit::new(Site::Apo, 12),
            Unit::new(Site::Apo, 11),
        ];
        units.sort();
        let keys: Vec<String> = units.iter().map(Unit::key).collect();
        assert_eq!(keys, vec!["apo/11", "apo/12", "lco/10"]);
    }

    #[test]
    fn test_site_parse() {
        assert_eq!("LCO".parse::<Site>().unwrap(), Site::Lco);
        assert!("ctio".parse::<Site>().is_err());
    }

    #[test]
    fn test_selector_flags() {
        assert_eq!(SiteSelector::from_flags(true, false).sites(), vec![Site::Apo]);
        assert_eq!(SiteSelector::from_flags(false, true).sites(), vec![Site::Lco]);
        assert_eq!(SiteSelector::from_flags(true, true).sites().len(), 2);
        assert_eq!(SiteSelector::from_flags(false, false).sites().len(), 2);
    }
}
