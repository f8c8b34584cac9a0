//! Error handling for almanac-store
//!
//! Wraps almanac-core ExError with store-specific helpers

use almanac_core::errors::{ExError, ExErrorKind};
use almanac_core::Unit;

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

/// Create a migration error
pub fn migration_error(migration_id: &str, reason: &str) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("migration")
        .with_message(format!("Migration {} failed: {}", migration_id, reason))
}

/// Create a checksum mismatch error
pub fn checksum_mismatch(subject: &str, expected: &str, actual: &str) -> ExError {
    ExError::new(ExErrorKind::ChecksumMismatch)
        .with_op("verify_checksum")
        .with_path(subject)
        .with_message(format!("expected {}, got {}", expected, actual))
}

/// Wrap any failure during a unit merge; the run aborts on these
pub fn store_write_failure(unit: Unit, source: ExError) -> ExError {
    ExError::new(ExErrorKind::StoreWrite)
        .with_op("merge_unit")
        .with_unit(unit)
        .with_message(format!("failed to merge unit {}", unit))
        .with_source(source)
}

/// Create a payload encoding/decoding error
pub fn codec_error(path: &str, reason: impl Into<String>) -> ExError {
    ExError::new(ExErrorKind::Serialization)
        .with_op("section_codec")
        .with_path(path)
        .with_message(reason)
}

/// Create a database error from rusqlite::Error
pub fn from_rusqlite(err: rusqlite::Error) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("sqlite")
        .with_message(err.to_string())
}

/// Create an IO error
pub fn io_error(operation: &str, err: std::io::Error) -> ExError {
    ExError::new(ExErrorKind::Io)
        .with_op(operation.to_string())
        .with_message(err.to_string())
}
