//! Configuration
//!
//! Loaded once at startup from a TOML file and handed to each component by
//! value. Every section and field has a default, so a missing file or a
//! partial file is fine.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::{CoreError, Result};
use crate::sequence::{BoundaryRule, DetectorPolicy};
use crate::time::EXPOSURE_PREFIX_EPOCH_MJD;

/// Environment variable naming the configuration file
pub const CONFIG_ENV: &str = "ALMANAC_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Raw exposures: `<apogee_dir>/<site>/<mjd>/*.apz`
    pub apogee_dir: PathBuf,
    /// Robotic-era configuration summaries
    pub sdsscore_dir: PathBuf,
    /// Plate-era hole tables
    pub platelist_dir: PathBuf,
    /// Known-bad exposure CSV
    pub bad_exposures: Option<PathBuf>,
    /// Cross-match CSV (`catalogid`/`designation` to `sdss_id`)
    pub cross_match_table: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            apogee_dir: PathBuf::from("data/apogee"),
            sdsscore_dir: PathBuf::from("data/sdsscore"),
            platelist_dir: PathBuf::from("data/platelist"),
            bad_exposures: None,
            cross_match_table: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Bytes read from the start of each raw file when scraping headers
    pub header_bytes: usize,
    /// First night of the robotic fiber positioner era
    pub fps_start_mjd: i32,
    pub boundary_rule: BoundaryRule,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            header_bytes: 20_000,
            fps_start_mjd: 59_550,
            boundary_rule: BoundaryRule::default(),
        }
    }
}

impl CollectorConfig {
    pub fn detector_policy(&self) -> DetectorPolicy {
        DetectorPolicy {
            boundary: self.boundary_rule,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Worker processes when none are requested; 1 collects in-process
    pub workers: usize,
    /// How long cancelled workers get to exit after being killed
    pub cancel_grace_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            cancel_grace_ms: 2_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub compression: bool,
    pub compression_level: i32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            compression: false,
            compression_level: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeConfig {
    /// Start of an open-ended range
    pub earliest_mjd: i32,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            earliest_mjd: EXPOSURE_PREFIX_EPOCH_MJD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// JSON log lines instead of human-readable ones
    pub json: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AlmanacConfig {
    pub paths: PathsConfig,
    pub collector: CollectorConfig,
    pub runtime: RuntimeConfig,
    pub store: StoreConfig,
    pub scope: ScopeConfig,
    pub logging: LoggingConfig,
}

impl AlmanacConfig {
    /// Where the configuration is read from: the explicit path, else
    /// `$ALMANAC_CONFIG`, else `~/.almanac/config.toml`
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        if let Some(path) = explicit {
            return path.to_path_buf();
        }
        if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()) {
            return PathBuf::from(path);
        }
        dirs::home_dir()
            .unwrap_or_default()
            .join(".almanac")
            .join("config.toml")
    }

    /// Load from a file; a missing file yields defaults
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml_str(&text).map_err(|e| match e {
                CoreError::Config { reason, .. } => CoreError::Config {
                    path: path.display().to_string(),
                    reason,
                },
                other => other,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(CoreError::Config {
                path: path.display().to_string(),
                reason: e.to_string(),
            }),
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| CoreError::Config {
            path: "<inline>".to_string(),
            reason: e.to_string(),
        })
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| CoreError::Serialization {
            message: e.to_string(),
        })
    }
}
