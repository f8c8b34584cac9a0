//! Per-unit collection
//!
//! For one unit the collector scrapes raw headers, validates them into
//! exposure records, optionally reads fiber maps for each science pointing
//! (cross-matching their targets), and runs sequence detection. It never
//! touches the catalog.

#![allow(clippy::result_large_err)]

pub mod crossmatch;
pub mod fibers;
pub mod headers;
pub mod yanny;

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Instant;

use almanac_core::errors::{ExError, ExErrorKind};
use almanac_core::model::CrossMatchKey;
use almanac_core::rules::{BadExposureList, RecordValidator, ValidationOutcome};
use almanac_core::{
    detect_sequences, log_op_end, log_op_error, log_op_start, AlmanacConfig, CollectOutcome,
    DetectorPolicy, ExposureRecord, FiberMap, FiberScheme, RawExposure, Unit, UnitCollection,
};

pub use crossmatch::{normalize_designation, TableCrossMatcher};
pub use fibers::FsFiberMapSource;
pub use headers::FitsHeaderScraper;

/// Supplies raw per-exposure header dictionaries for a unit
pub trait HeaderSource: Send + Sync {
    /// Headers for every exposure of the unit; empty when nothing was taken
    fn scrape(&self, unit: Unit) -> Result<Vec<RawExposure>, ExError>;
}

/// Supplies the fiber table observed under one pointing
pub trait FiberMapSource: Send + Sync {
    /// `Ok(None)` when no map exists for the pointing
    fn fiber_map(
        &self,
        unit: Unit,
        scheme: FiberScheme,
        identifier: i64,
    ) -> Result<Option<FiberMap>, ExError>;
}

/// Resolves target keys to stable catalog identifiers
pub trait CrossMatcher: Send + Sync {
    /// Keys that could not be resolved are simply absent from the result
    fn resolve(&self, keys: &[CrossMatchKey]) -> Result<HashMap<CrossMatchKey, i64>, ExError>;
}

/// What the caller asked to be collected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CollectorOptions {
    pub fibers: bool,
    /// Only meaningful with `fibers`
    pub cross_match: bool,
}

impl CollectorOptions {
    pub fn new(fibers: bool, cross_match: bool) -> Self {
        Self {
            fibers,
            cross_match: fibers && cross_match,
        }
    }
}

pub struct UnitCollector {
    headers: Arc<dyn HeaderSource>,
    fibers: Arc<dyn FiberMapSource>,
    cross_matcher: Option<Arc<dyn CrossMatcher>>,
    bad_exposures: BadExposureList,
    policy: DetectorPolicy,
    fps_start_mjd: i32,
    options: CollectorOptions,
}

impl UnitCollector {
    pub fn new(
        headers: Arc<dyn HeaderSource>,
        fibers: Arc<dyn FiberMapSource>,
        policy: DetectorPolicy,
        fps_start_mjd: i32,
        options: CollectorOptions,
    ) -> Self {
        Self {
            headers,
            fibers,
            cross_matcher: None,
            bad_exposures: BadExposureList::empty(),
            policy,
            fps_start_mjd,
            options,
        }
    }

    pub fn with_bad_exposures(mut self, bad_exposures: BadExposureList) -> Self {
        self.bad_exposures = bad_exposures;
        self
    }

    pub fn with_cross_matcher(mut self, matcher: Arc<dyn CrossMatcher>) -> Self {
        self.cross_matcher = Some(matcher);
        self
    }

    /// Filesystem-backed collector described by the configuration
    ///
    /// # Errors
    ///
    /// Fails if the configured bad-exposure table cannot be read. An
    /// unreadable cross-match table only disables cross-matching.
    pub fn from_config(config: &AlmanacConfig, options: CollectorOptions) -> Result<Self, ExError> {
        let headers = Arc::new(FitsHeaderScraper::new(
            &config.paths.apogee_dir,
            config.collector.header_bytes,
        ));
        let fibers = Arc::new(FsFiberMapSource::new(
            &config.paths.sdsscore_dir,
            &config.paths.platelist_dir,
        ));
        let mut collector = Self::new(
            headers,
            fibers,
            config.collector.detector_policy(),
            config.collector.fps_start_mjd,
            options,
        );

        if let Some(path) = &config.paths.bad_exposures {
            collector = collector.with_bad_exposures(BadExposureList::load(path)?);
        }

        if options.cross_match {
            if let Some(path) = &config.paths.cross_match_table {
                match TableCrossMatcher::load(path) {
                    Ok(matcher) => collector = collector.with_cross_matcher(Arc::new(matcher)),
                    Err(err) => tracing::warn!(
                        err_code = err.code(),
                        error = %err,
                        "cross-match table unavailable; identifiers will be left unset"
                    ),
                }
            }
        }
        Ok(collector)
    }

    pub fn options(&self) -> CollectorOptions {
        self.options
    }

    /// Collect one unit
    ///
    /// # Errors
    ///
    /// `Collection` when the unit's headers cannot be read. Fiber-map and
    /// cross-match problems are logged and never fail the unit.
    pub fn collect(&self, unit: Unit) -> Result<CollectOutcome, ExError> {
        let start = Instant::now();
        log_op_start!("collect_unit", unit = %unit);

        let raw = match self.headers.scrape(unit) {
            Ok(raw) => raw,
            Err(source) => {
                let err = if source.kind() == ExErrorKind::Collection {
                    source
                } else {
                    ExError::new(ExErrorKind::Collection)
                        .with_op("collect_unit")
                        .with_unit(unit)
                        .with_message("header scrape failed")
                        .with_source(source)
                };
                log_op_error!(
                    "collect_unit",
                    err.clone(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    unit = %unit
                );
                return Err(err);
            }
        };

        let records = self.validate(unit, raw);
        if records.is_empty() {
            log_op_end!(
                "collect_unit",
                duration_ms = start.elapsed().as_millis() as u64,
                unit = %unit,
                n_exposures = 0u64
            );
            return Ok(CollectOutcome::NoData { unit });
        }

        let detection = detect_sequences(&records, &self.policy);
        for gap in &detection.gaps {
            tracing::debug!(unit = %unit, gap = %gap, "sequence break");
        }

        let fiber_maps = self.options.fibers.then(|| self.fiber_maps(unit, &records));

        log_op_end!(
            "collect_unit",
            duration_ms = start.elapsed().as_millis() as u64,
            unit = %unit,
            n_exposures = records.len() as u64,
            n_sequences = detection.sequences.len() as u64
        );

        Ok(CollectOutcome::Collected(UnitCollection {
            unit,
            exposures: records,
            sequences: detection.sequences,
            gaps: detection.gaps,
            fiber_maps,
        }))
    }

    /// Sorted, de-duplicated, validated records
    fn validate(&self, unit: Unit, mut raw: Vec<RawExposure>) -> Vec<ExposureRecord> {
        raw.sort_by_key(|r| r.exposure);
        let validator = RecordValidator::new(unit, self.fps_start_mjd, &self.bad_exposures);
        let mut records: Vec<ExposureRecord> = Vec::with_capacity(raw.len());

        for exposure in &raw {
            if records.last().map(|r| r.exposure) == Some(exposure.exposure) {
                tracing::warn!(unit = %unit, exposure = exposure.exposure, "duplicate exposure dropped");
                continue;
            }
            match validator.validate(exposure) {
                ValidationOutcome::Accepted { record, issues } => {
                    for issue in &issues {
                        tracing::debug!(
                            unit = %unit,
                            exposure = exposure.exposure,
                            field = issue.field,
                            raw = %issue.raw,
                            reason = issue.reason,
                            "header value defaulted"
                        );
                    }
                    records.push(*record);
                }
                ValidationOutcome::Rejected { exposure, reason } => {
                    tracing::warn!(unit = %unit, exposure, reason = %reason, "exposure skipped");
                }
            }
        }
        records
    }

    /// Distinct pointings of the unit's science exposures
    fn pointings(records: &[ExposureRecord]) -> BTreeSet<(FiberScheme, i64)> {
        records
            .iter()
            .filter(|r| r.image_type.is_science())
            .filter_map(|r| {
                if r.fps {
                    r.pointing.config_id.map(|id| (FiberScheme::Fps, id))
                } else {
                    r.pointing.plate_id.map(|id| (FiberScheme::Plates, id))
                }
            })
            .collect()
    }

    fn fiber_maps(&self, unit: Unit, records: &[ExposureRecord]) -> Vec<FiberMap> {
        let mut maps = Vec::new();
        for (scheme, identifier) in Self::pointings(records) {
            match self.fibers.fiber_map(unit, scheme, identifier) {
                Ok(Some(map)) => maps.push(map),
                Ok(None) => tracing::warn!(
                    unit = %unit,
                    scheme = %scheme,
                    identifier,
                    "no fiber map found"
                ),
                Err(err) => tracing::warn!(
                    unit = %unit,
                    scheme = %scheme,
                    identifier,
                    err_code = err.code(),
                    error = %err,
                    "fiber map unreadable; omitted"
                ),
            }
        }

        if self.options.cross_match {
            if let Some(matcher) = &self.cross_matcher {
                self.cross_match(unit, matcher.as_ref(), &mut maps);
            }
        }
        maps
    }

    fn cross_match(&self, unit: Unit, matcher: &dyn CrossMatcher, maps: &mut [FiberMap]) {
        let keys: Vec<CrossMatchKey> = maps
            .iter()
            .flat_map(|m| m.rows.iter())
            .filter_map(|row| row.cross_match_key())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if keys.is_empty() {
            return;
        }

        match matcher.resolve(&keys) {
            Ok(resolved) => {
                for row in maps.iter_mut().flat_map(|m| m.rows.iter_mut()) {
                    row.sdss_id = row
                        .cross_match_key()
                        .and_then(|key| resolved.get(&key).copied());
                }
                tracing::debug!(
                    unit = %unit,
                    n_keys = keys.len() as u64,
                    n_resolved = resolved.len() as u64,
                    "cross-match complete"
                );
            }
            Err(err) => {
                tracing::warn!(
                    component = module_path!(),
                    op = "cross_match",
                    unit = %unit,
                    err_kind = ?ExErrorKind::CrossMatch,
                    err_code = ExErrorKind::CrossMatch.code(),
                    error = %err,
                    "cross-match failed; identifiers left unset"
                );
            }
        }
    }
}
