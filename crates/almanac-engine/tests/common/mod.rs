use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use almanac_core::errors::{ExError, ExErrorKind};
use almanac_core::model::CrossMatchKey;
use almanac_core::{
    CollectOutcome, DetectorPolicy, ExposureRecord, FiberMap, FiberRow, FiberScheme, ImageType,
    Pointing, RawExposure, Site, Unit, UnitCollection,
};
use almanac_engine::collector::{CrossMatcher, FiberMapSource, HeaderSource};
use almanac_engine::{CollectorOptions, UnitCollector, UnitRunner};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

#[allow(dead_code)]
pub const FPS_START_MJD: i32 = 59550;

#[allow(dead_code)]
pub fn apo(mjd: i32) -> Unit {
    Unit::new(Site::Apo, mjd)
}

/// Science exposure header at a configuration
#[allow(dead_code)]
pub fn object(exposure: u32, config_id: i64) -> RawExposure {
    RawExposure::new(exposure)
        .with_header("IMAGETYP", "Object")
        .with_header("NREAD", "47")
        .with_header("FIELDID", "100")
        .with_header("CONFIGID", config_id.to_string())
        .with_header("LAMPQRTZ", "F")
}

/// Calibration header with no pointing
#[allow(dead_code)]
pub fn calibration(exposure: u32, image_type: &str) -> RawExposure {
    RawExposure::new(exposure)
        .with_header("IMAGETYP", image_type)
        .with_header("NREAD", "3")
}

/// Header source serving fixed nights
#[allow(dead_code)]
#[derive(Default)]
pub struct FakeHeaders {
    pub nights: HashMap<Unit, Vec<RawExposure>>,
    pub broken: HashSet<Unit>,
}

#[allow(dead_code)]
impl FakeHeaders {
    pub fn with_night(mut self, unit: Unit, raw: Vec<RawExposure>) -> Self {
        self.nights.insert(unit, raw);
        self
    }

    pub fn with_broken(mut self, unit: Unit) -> Self {
        self.broken.insert(unit);
        self
    }
}

impl HeaderSource for FakeHeaders {
    fn scrape(&self, unit: Unit) -> Result<Vec<RawExposure>, ExError> {
        if self.broken.contains(&unit) {
            return Err(ExError::new(ExErrorKind::Collection)
                .with_op("scrape_headers")
                .with_unit(unit)
                .with_message("permission denied"));
        }
        Ok(self.nights.get(&unit).cloned().unwrap_or_default())
    }
}

/// Fiber source with `rows` APOGEE fibers for every FPS configuration
/// except those listed as missing
#[allow(dead_code)]
#[derive(Default)]
pub struct FakeFibers {
    pub rows: i64,
    pub missing: HashSet<i64>,
}

impl FiberMapSource for FakeFibers {
    fn fiber_map(
        &self,
        _unit: Unit,
        scheme: FiberScheme,
        identifier: i64,
    ) -> Result<Option<FiberMap>, ExError> {
        if self.missing.contains(&identifier) {
            return Ok(None);
        }
        Ok(Some(FiberMap {
            scheme,
            identifier,
            rows: (1..=self.rows)
                .map(|fiber_id| FiberRow {
                    fiber_id,
                    hole_type: "R+1C3".to_string(),
                    category: "science".to_string(),
                    ra: 120.0,
                    dec: -5.0,
                    catalogid: Some(identifier * 1000 + fiber_id),
                    designation: None,
                    sdss_id: None,
                })
                .collect(),
        }))
    }
}

/// Resolves every catalog id to its negation
#[allow(dead_code)]
pub struct EchoMatcher;

impl CrossMatcher for EchoMatcher {
    fn resolve(&self, keys: &[CrossMatchKey]) -> Result<HashMap<CrossMatchKey, i64>, ExError> {
        Ok(keys
            .iter()
            .filter_map(|key| match key {
                CrossMatchKey::CatalogId(id) => Some((key.clone(), -id)),
                CrossMatchKey::TwoMass(_) => None,
            })
            .collect())
    }
}

/// Cross-match service that is always down
#[allow(dead_code)]
pub struct DownMatcher;

impl CrossMatcher for DownMatcher {
    fn resolve(&self, _keys: &[CrossMatchKey]) -> Result<HashMap<CrossMatchKey, i64>, ExError> {
        Err(ExError::new(ExErrorKind::CrossMatch)
            .with_op("resolve")
            .with_message("connection refused"))
    }
}

#[allow(dead_code)]
pub fn collector(headers: FakeHeaders, options: CollectorOptions) -> UnitCollector {
    UnitCollector::new(
        Arc::new(headers),
        Arc::new(FakeFibers {
            rows: 3,
            missing: HashSet::new(),
        }),
        DetectorPolicy::default(),
        FPS_START_MJD,
        options,
    )
}

/// A collected unit with `n` consecutive science exposures at one pointing
#[allow(dead_code)]
pub fn collection(unit: Unit, n: u32) -> UnitCollection {
    let exposures: Vec<ExposureRecord> = (1..=n)
        .map(|exposure| {
            ExposureRecord::blank(unit, exposure, ImageType::Object).with_pointing(Pointing {
                config_id: Some(7),
                ..Pointing::default()
            })
        })
        .collect();
    let detection = almanac_core::detect_sequences(&exposures, &DetectorPolicy::default());
    UnitCollection {
        unit,
        exposures,
        sequences: detection.sequences,
        gaps: detection.gaps,
        fiber_maps: None,
    }
}

/// What a scripted unit does when run
#[allow(dead_code)]
#[derive(Clone)]
pub enum Script {
    /// Collect `n` exposures after `delay`
    Collect { n: u32, delay: Duration },
    NoData,
    Fail,
    /// Never finish and ignore cancellation
    Hang,
}

/// Runner driven by a per-unit script, recording peak concurrency
#[allow(dead_code)]
pub struct ScriptedRunner {
    scripts: HashMap<Unit, Script>,
    running: AtomicUsize,
    pub peak: AtomicUsize,
    pub started: AtomicUsize,
}

#[allow(dead_code)]
impl ScriptedRunner {
    pub fn new(scripts: impl IntoIterator<Item = (Unit, Script)>) -> Self {
        Self {
            scripts: scripts.into_iter().collect(),
            running: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            started: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl UnitRunner for ScriptedRunner {
    async fn run(&self, unit: Unit, _cancel: CancellationToken) -> Result<CollectOutcome, ExError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let script = self.scripts.get(&unit).cloned().unwrap_or(Script::NoData);
        let result = match script {
            Script::Collect { n, delay } => {
                tokio::time::sleep(delay).await;
                Ok(CollectOutcome::Collected(collection(unit, n)))
            }
            Script::NoData => Ok(CollectOutcome::NoData { unit }),
            Script::Fail => Err(ExError::new(ExErrorKind::Collection)
                .with_op("collect_unit")
                .with_unit(unit)
                .with_message("scripted failure")),
            Script::Hang => std::future::pending().await,
        };

        self.running.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
