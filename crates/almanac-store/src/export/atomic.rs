//! Whole-file writes that never leave a partial target behind

#![allow(clippy::result_large_err)]

use crate::errors::{io_error, Result};
use std::fs;
use std::path::{Path, PathBuf};

fn staging_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".partial");
    target.with_file_name(name)
}

/// Write `content` beside the target, then rename over it
pub fn atomic_write(target: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| io_error("create_export_dir", e))?;
    }

    let staging = staging_path(target);
    if let Err(e) = fs::write(&staging, content) {
        let _ = fs::remove_file(&staging);
        return Err(io_error("write_export", e).with_path(staging.display().to_string()));
    }
    fs::rename(&staging, target).map_err(|e| {
        let _ = fs::remove_file(&staging);
        io_error("rename_export", e).with_path(target.display().to_string())
    })
}
