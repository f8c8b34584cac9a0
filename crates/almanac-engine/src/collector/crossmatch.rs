//! Cross-matching fiber targets to stable catalog identifiers

#![allow(clippy::result_large_err)]

use std::collections::HashMap;
use std::path::Path;

use almanac_core::errors::{ExError, ExErrorKind};
use almanac_core::model::CrossMatchKey;
use serde::Deserialize;

use super::CrossMatcher;

/// Strip `2MASS`, `-`, `J` and similar prefixes from a target id
///
/// `2MASS-J05354012-0524040` and `J05354012-0524040` both become
/// `05354012-0524040`.
pub fn normalize_designation(target_id: &str) -> String {
    let trimmed = target_id.trim();
    let rest = trimmed.strip_prefix("2MASS").unwrap_or(trimmed);
    rest.trim_start_matches(['-', 'J', 'd', 'b', '_']).to_string()
}

#[derive(Debug, Deserialize)]
struct LookupRow {
    #[serde(default)]
    catalogid: Option<i64>,
    #[serde(default)]
    designation: Option<String>,
    sdss_id: Option<i64>,
}

/// Lookup table loaded from CSV with columns `catalogid`, `designation`,
/// `sdss_id` (either key column may be absent)
#[derive(Debug, Clone, Default)]
pub struct TableCrossMatcher {
    by_catalogid: HashMap<i64, i64>,
    by_designation: HashMap<String, i64>,
}

impl TableCrossMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: CrossMatchKey, sdss_id: i64) {
        match key {
            CrossMatchKey::CatalogId(id) => {
                self.by_catalogid.insert(id, sdss_id);
            }
            CrossMatchKey::TwoMass(designation) => {
                self.by_designation
                    .insert(normalize_designation(&designation), sdss_id);
            }
        }
    }

    /// # Errors
    ///
    /// `CrossMatch` if the file cannot be read or a row is malformed.
    pub fn load(path: &Path) -> Result<Self, ExError> {
        let failure = |message: String| {
            ExError::new(ExErrorKind::CrossMatch)
                .with_op("load_cross_match")
                .with_path(path.display().to_string())
                .with_message(message)
        };

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| failure(e.to_string()))?;

        let mut matcher = Self::new();
        for row in reader.deserialize::<LookupRow>() {
            let row = row.map_err(|e| failure(e.to_string()))?;
            let Some(sdss_id) = row.sdss_id else {
                continue;
            };
            if let Some(id) = row.catalogid.filter(|id| *id > 0) {
                matcher.insert(CrossMatchKey::CatalogId(id), sdss_id);
            }
            if let Some(designation) = row.designation.filter(|d| !d.is_empty()) {
                matcher.insert(CrossMatchKey::TwoMass(designation), sdss_id);
            }
        }
        Ok(matcher)
    }

    pub fn len(&self) -> usize {
        self.by_catalogid.len() + self.by_designation.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CrossMatcher for TableCrossMatcher {
    fn resolve(&self, keys: &[CrossMatchKey]) -> Result<HashMap<CrossMatchKey, i64>, ExError> {
        Ok(keys
            .iter()
            .filter_map(|key| {
                let found = match key {
                    CrossMatchKey::CatalogId(id) => self.by_catalogid.get(id),
                    CrossMatchKey::TwoMass(d) => self.by_designation.get(&normalize_designation(d)),
                };
                found.map(|sdss_id| (key.clone(), *sdss_id))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_designation_prefixes() {
        assert_eq!(normalize_designation("2MASS-J05354012-0524040"), "05354012-0524040");
        assert_eq!(normalize_designation(" J05354012-0524040 "), "05354012-0524040");
        assert_eq!(normalize_designation("05354012-0524040"), "05354012-0524040");
    }

    #[test]
    fn test_load_and_resolve() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "catalogid,designation,sdss_id").unwrap();
        writeln!(file, "27021597842000001,,101").unwrap();
        writeln!(file, ",2MASS-J05354012-0524040,102").unwrap();
        writeln!(file, "27021597842000003,,").unwrap();

        let matcher = TableCrossMatcher::load(file.path()).unwrap();
        let resolved = matcher
            .resolve(&[
                CrossMatchKey::CatalogId(27021597842000001),
                CrossMatchKey::TwoMass("J05354012-0524040".to_string()),
                CrossMatchKey::CatalogId(27021597842000003),
            ])
            .unwrap();

        assert_eq!(matcher.len(), 2);
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[&CrossMatchKey::CatalogId(27021597842000001)], 101);
        assert_eq!(
            resolved[&CrossMatchKey::TwoMass("J05354012-0524040".to_string())],
            102
        );
    }

    #[test]
    fn test_missing_table_is_cross_match_error() {
        let err = TableCrossMatcher::load(Path::new("/nonexistent/xmatch.csv")).unwrap_err();
        assert_eq!(err.code(), "ERR_CROSS_MATCH");
    }
}
