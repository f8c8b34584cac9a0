//! SQLite connections for catalog files

#![allow(clippy::result_large_err)]

use std::path::Path;
use std::time::Duration;

use rusqlite::Connection;

use crate::errors::{from_rusqlite, io_error, Result};

/// How long a statement waits on a lock held by a reader before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open a catalog file, creating it and its parent directory when missing
pub fn open<P: AsRef<Path>>(path: P) -> Result<Connection> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            io_error("open_catalog", e).with_path(parent.display().to_string())
        })?;
    }
    Connection::open(path)
        .map_err(|e| from_rusqlite(e).with_path(path.display().to_string()))
}

pub fn open_in_memory() -> Result<Connection> {
    Connection::open_in_memory().map_err(from_rusqlite)
}

pub fn configure(conn: &Connection) -> Result<()> {
    conn.busy_timeout(BUSY_TIMEOUT).map_err(from_rusqlite)?;

    // journal_mode answers with a row, so it cannot go through execute()
    conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))
        .map_err(from_rusqlite)?;
    conn.execute_batch("PRAGMA synchronous = NORMAL;")
        .map_err(from_rusqlite)?;

    Ok(())
}
