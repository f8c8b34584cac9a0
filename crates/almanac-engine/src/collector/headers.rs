//! Raw header scraping from instrument files
//!
//! A night's files live at `<apogee_dir>/<site>/<mjd>/<prefix>-<chip>-<NNNNNNNN>.apz`.
//! Only the plain-text FITS header at the start of each file is read.

#![allow(clippy::result_large_err)]

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use almanac_core::errors::{ExError, ExErrorKind};
use almanac_core::time::exposure_prefix;
use almanac_core::{RawExposure, Unit};
use regex::Regex;

use super::HeaderSource;

/// Header keys kept from each file, as written in the header
pub const HEADER_KEYS: [&str; 23] = [
    "DATE-OBS", "FIELDID", "DESIGNID", "CONFIGID", "SEEING", "EXPTYPE", "NREAD", "IMAGETYP",
    "LAMPQRTZ", "LAMPTHAR", "LAMPUNE", "FOCUS", "NAME", "PLATEID", "CARTID", "MAPID", "PLATETYP",
    "OBSCMNT", "COLLPIST", "COLPITCH", "DITHPIX", "TCAMMID", "TLSDETB",
];

const CARD_LEN: usize = 80;
const CHIPS: [char; 3] = ['a', 'b', 'c'];

fn file_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^(a[sp]R)-([abc])-(\d{8})\.apz$").ok())
        .as_ref()
}

/// Exposure files of one exposure, by chip
#[derive(Debug, Default)]
struct ChipFiles {
    paths: [Option<PathBuf>; 3],
}

impl ChipFiles {
    fn mask(&self) -> u8 {
        self.paths
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_some())
            .fold(0, |mask, (i, _)| mask | (1 << i))
    }

    fn first(&self) -> Option<&Path> {
        self.paths.iter().flatten().next().map(PathBuf::as_path)
    }
}

pub struct FitsHeaderScraper {
    apogee_dir: PathBuf,
    header_bytes: usize,
}

impl FitsHeaderScraper {
    pub fn new(apogee_dir: impl Into<PathBuf>, header_bytes: usize) -> Self {
        Self {
            apogee_dir: apogee_dir.into(),
            header_bytes,
        }
    }

    pub fn night_dir(&self, unit: Unit) -> PathBuf {
        self.apogee_dir
            .join(unit.site.as_str())
            .join(unit.mjd.to_string())
    }

    /// File name of one chip of one exposure
    pub fn file_name(unit: Unit, exposure: u32, chip: char) -> String {
        format!(
            "{}-{}-{:08}.apz",
            unit.site.file_prefix(),
            chip,
            exposure_prefix(unit.mjd) + u64::from(exposure)
        )
    }

    fn list_exposures(&self, unit: Unit, dir: &Path) -> Result<BTreeMap<u32, ChipFiles>, ExError> {
        let failure = |e: std::io::Error| {
            ExError::new(ExErrorKind::Collection)
                .with_op("scrape_headers")
                .with_unit(unit)
                .with_path(dir.display().to_string())
                .with_message(e.to_string())
        };

        let pattern = file_pattern().ok_or_else(|| {
            ExError::new(ExErrorKind::Internal)
                .with_op("scrape_headers")
                .with_message("exposure file pattern failed to compile")
        })?;
        let prefix = exposure_prefix(unit.mjd);
        let mut exposures: BTreeMap<u32, ChipFiles> = BTreeMap::new();
        for entry in fs::read_dir(dir).map_err(failure)? {
            let entry = entry.map_err(failure)?;
            let name = entry.file_name();
            let Some(caps) = name.to_str().and_then(|n| pattern.captures(n)) else {
                continue;
            };
            if &caps[1] != unit.site.file_prefix() {
                continue;
            }
            let chip = caps[2].chars().next().and_then(|c| CHIPS.iter().position(|&x| x == c));
            let number: u64 = caps[3].parse().unwrap_or(0);
            let (Some(chip), Some(exposure)) = (
                chip,
                number
                    .checked_sub(prefix)
                    .and_then(|n| u32::try_from(n).ok()),
            ) else {
                tracing::debug!(unit = %unit, file = ?name, "file does not belong to this night");
                continue;
            };
            exposures.entry(exposure).or_default().paths[chip] = Some(entry.path());
        }
        Ok(exposures)
    }
}

impl HeaderSource for FitsHeaderScraper {
    fn scrape(&self, unit: Unit) -> Result<Vec<RawExposure>, ExError> {
        let dir = self.night_dir(unit);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut raw = Vec::new();
        for (exposure, files) in self.list_exposures(unit, &dir)? {
            let Some(path) = files.first() else {
                continue;
            };
            let cards = read_header(path, self.header_bytes).map_err(|e| {
                ExError::new(ExErrorKind::Collection)
                    .with_op("scrape_headers")
                    .with_unit(unit)
                    .with_path(path.display().to_string())
                    .with_message(e.to_string())
            })?;

            let mut record = RawExposure::new(exposure);
            record.chip_flags = files.mask();
            for key in HEADER_KEYS {
                if let Some(value) = cards.get(key) {
                    record = record.with_header(key, value.clone());
                }
            }
            raw.push(record);
        }
        Ok(raw)
    }
}

/// Read up to `limit` bytes of header cards
pub fn read_header(path: &Path, limit: usize) -> std::io::Result<BTreeMap<String, String>> {
    let mut bytes = Vec::with_capacity(limit);
    File::open(path)?.take(limit as u64).read_to_end(&mut bytes)?;
    Ok(parse_cards(&bytes))
}

/// Parse 80-byte `KEY     = value / comment` cards until `END`
pub fn parse_cards(bytes: &[u8]) -> BTreeMap<String, String> {
    let mut cards = BTreeMap::new();
    for chunk in bytes.chunks(CARD_LEN) {
        let card = String::from_utf8_lossy(chunk);
        let key = card.get(..8).unwrap_or(&card).trim();
        if key == "END" {
            break;
        }
        if key.is_empty() || card.get(8..10) != Some("= ") {
            continue;
        }
        let value = card.get(10..).map(card_value).unwrap_or_default();
        cards.entry(key.to_string()).or_insert(value);
    }
    cards
}

fn card_value(raw: &str) -> String {
    let raw = raw.trim_start();
    if let Some(quoted) = raw.strip_prefix('\'') {
        let mut value = String::new();
        let mut chars = quoted.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '\'' {
                if chars.peek() == Some(&'\'') {
                    value.push('\'');
                    chars.next();
                    continue;
                }
                break;
            }
            value.push(c);
        }
        return value.trim().to_string();
    }
    raw.split('/').next().unwrap_or_default().trim().to_string()
}
