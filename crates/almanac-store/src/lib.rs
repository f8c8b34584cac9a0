//! Almanac Store - the persistent exposure catalog
//!
//! Provides:
//! - SQLite schema with a checksummed migrations framework
//! - Path-addressed catalog sections (`site/mjd/{exposures,sequences,fibers/..}`)
//! - Unit-scoped, all-or-nothing merge-writes and read-back
//! - CSV export of stored exposures and fiber tables

pub mod catalog;
pub mod db;
pub mod errors;
pub mod export;
pub mod migrations;

// Re-export key types
pub use catalog::{CatalogStore, MergeReport, SectionPath, StoredUnit, WriteOptions};
pub use errors::Result;
