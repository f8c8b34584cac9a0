//! Almanac Core - domain kernel for the exposure almanac
//!
//! This crate provides the data model and pure logic shared by the store,
//! the collection engine and the command line:
//! - Sites, units and the exposure/fiber record model
//! - Per-field header validation with explicit outcomes
//! - Unit enumeration from a date scope crossed with a site selector
//! - Sequence detection with a configurable boundary rule
//! - The error facility, logging facility and configuration

pub mod config;
pub mod errors;
pub mod logging_facility;
pub mod model;
pub mod rules;
pub mod scope;
pub mod sequence;
pub mod time;

#[doc(hidden)]
pub use almanac_core_types::schema as __schema;

// Re-export commonly used types
pub use config::AlmanacConfig;
pub use errors::{CoreError, ExError, ExErrorKind, Result};
pub use model::{
    CollectOutcome, ExposureRecord, FiberMap, FiberRow, FiberScheme, ImageType, LampState,
    Pointing, RawExposure, Site, SiteSelector, Unit, UnitCollection,
};
pub use scope::{enumerate_units, DateScope};
pub use sequence::{detect_sequences, BoundaryRule, Detection, DetectorPolicy, GapEvent, GapKind, Sequence};
