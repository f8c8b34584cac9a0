//! The persistent exposure catalog
//!
//! A catalog is a SQLite file holding path-addressed sections:
//!
//! ```text
//! <site>/<mjd>/exposures
//! <site>/<mjd>/sequences
//! <site>/<mjd>/fibers/<scheme>/<identifier>
//! ```
//!
//! Sections are only ever mutated one unit at a time through
//! [`CatalogStore::merge_unit`]. A catalog assumes a single writer.

#![allow(clippy::result_large_err)]

pub mod codec;
pub mod path;
mod reader;
pub mod tables;
mod writer;

use crate::db;
use crate::errors::Result;
use crate::migrations::apply_migrations;
use almanac_core::config::StoreConfig;
use rusqlite::Connection;
use std::path::Path;

pub use path::{SectionKind, SectionPath};
pub use reader::{SectionRecord, StoredUnit, UnitRow};
pub use writer::{MergeReport, PreparedUnit};

/// Writer settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteOptions {
    /// zstd level for section payloads; `None` stores plain JSON
    pub compression_level: Option<i32>,
}

impl From<&StoreConfig> for WriteOptions {
    fn from(config: &StoreConfig) -> Self {
        Self {
            compression_level: config.compression.then_some(config.compression_level),
        }
    }
}

pub struct CatalogStore {
    conn: Connection,
    options: WriteOptions,
}

impl CatalogStore {
    /// Open (creating if needed) a catalog file and bring its schema up to date
    pub fn open<P: AsRef<Path>>(path: P, options: WriteOptions) -> Result<Self> {
        let mut conn = db::open(path)?;
        db::configure(&conn)?;
        apply_migrations(&mut conn)?;
        Ok(Self { conn, options })
    }

    /// In-memory catalog (for testing)
    pub fn open_in_memory(options: WriteOptions) -> Result<Self> {
        let mut conn = db::open_in_memory()?;
        db::configure(&conn)?;
        apply_migrations(&mut conn)?;
        Ok(Self { conn, options })
    }

    pub fn options(&self) -> WriteOptions {
        self.options
    }

    /// Underlying connection, for inspection
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}
