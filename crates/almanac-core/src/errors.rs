use thiserror::Error;

/// Result type alias using CoreError
pub type Result<T> = std::result::Result<T, CoreError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// This taxonomy provides a stable, structured classification of all errors
/// raised while collecting and cataloguing exposures. Each kind maps to a
/// stable error code used for programmatic handling, for tests, and for the
/// reply line a worker process sends back to its supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Structural/Validation
    InvalidInput,
    InvalidScope,
    InvalidDate,
    UnknownSite,
    NotFound,
    AlreadyExists,
    ChecksumMismatch,

    // Collection
    /// Header scraping or filesystem access failed for one unit
    Collection,
    /// Cross-match collaborator unavailable or degraded (never fatal)
    CrossMatch,
    /// A worker process produced no usable reply
    WorkerProtocol,

    // Persistence
    /// Merge-write of a unit into the catalog failed (fatal for the run)
    StoreWrite,
    Persistence,

    // Integration/IO
    Io,
    Serialization,
    Config,

    // Run control
    Cancelled,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::InvalidScope => "ERR_INVALID_SCOPE",
            ExErrorKind::InvalidDate => "ERR_INVALID_DATE",
            ExErrorKind::UnknownSite => "ERR_UNKNOWN_SITE",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::AlreadyExists => "ERR_ALREADY_EXISTS",
            ExErrorKind::ChecksumMismatch => "ERR_CHECKSUM_MISMATCH",
            ExErrorKind::Collection => "ERR_COLLECTION",
            ExErrorKind::CrossMatch => "ERR_CROSS_MATCH",
            ExErrorKind::WorkerProtocol => "ERR_WORKER_PROTOCOL",
            ExErrorKind::StoreWrite => "ERR_STORE_WRITE",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Config => "ERR_CONFIG",
            ExErrorKind::Cancelled => "ERR_CANCELLED",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }

    /// Look up a kind by its stable code
    ///
    /// Used to rebuild errors reported by worker processes.
    pub fn from_code(code: &str) -> Option<Self> {
        const ALL: [ExErrorKind; 17] = [
            ExErrorKind::InvalidInput,
            ExErrorKind::InvalidScope,
            ExErrorKind::InvalidDate,
            ExErrorKind::UnknownSite,
            ExErrorKind::NotFound,
            ExErrorKind::AlreadyExists,
            ExErrorKind::ChecksumMismatch,
            ExErrorKind::Collection,
            ExErrorKind::CrossMatch,
            ExErrorKind::WorkerProtocol,
            ExErrorKind::StoreWrite,
            ExErrorKind::Persistence,
            ExErrorKind::Io,
            ExErrorKind::Serialization,
            ExErrorKind::Config,
            ExErrorKind::Cancelled,
            ExErrorKind::Internal,
        ];
        ALL.into_iter().find(|kind| kind.code() == code)
    }
}

/// Canonical structured error type
///
/// This error type provides a structured representation of errors with
/// classification fields for programmatic handling and rich context for debugging.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    unit: Option<String>,
    path: Option<String>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            unit: None,
            path: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add unit context (`site/mjd`)
    pub fn with_unit(mut self, unit: impl ToString) -> Self {
        self.unit = Some(unit.to_string());
        self
    }

    /// Add filesystem or catalog path context
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the unit context, if any
    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    /// Get the path context, if any
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the source error, if any
    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(unit) = &self.unit {
            write!(f, " (unit: {})", unit)?;
        }
        if let Some(path) = &self.path {
            write!(f, " (path: {})", path)?;
        }
        if let Some(source) = &self.source {
            write!(f, " <- {}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Error taxonomy for core domain operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    // ===== Scope Errors =====
    /// More than one kind of date scope was given
    #[error("Ambiguous date scope: only one of {given:?} may be given")]
    AmbiguousScope { given: Vec<String> },

    /// The resolved scope contains no dates
    #[error("Empty date scope: start {start} is after end {end}")]
    EmptyScope { start: i32, end: i32 },

    /// A calendar date could not be parsed
    #[error("Invalid date '{value}': {reason}")]
    InvalidDate { value: String, reason: String },

    /// A site name is not one of the known observatories
    #[error("Unknown site: {value}")]
    UnknownSite { value: String },

    // ===== Catalog Errors =====
    /// A catalog section path could not be parsed
    #[error("Invalid section path: {path}")]
    InvalidSectionPath { path: String },

    // ===== Configuration Errors =====
    /// Configuration file could not be read or parsed
    #[error("Configuration error in {path}: {reason}")]
    Config { path: String, reason: String },

    /// Reference table (bad exposures, cross-match) could not be loaded
    #[error("Failed to load table {path}: {reason}")]
    Table { path: String, reason: String },

    // ===== Serialization =====
    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl From<CoreError> for ExError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::AmbiguousScope { given } => ExError::new(ExErrorKind::InvalidScope)
                .with_op("resolve_scope")
                .with_message(format!("only one of {} may be given", given.join(", "))),

            CoreError::EmptyScope { start, end } => ExError::new(ExErrorKind::InvalidScope)
                .with_op("resolve_scope")
                .with_message(format!("start {} is after end {}", start, end)),

            CoreError::InvalidDate { value, reason } => ExError::new(ExErrorKind::InvalidDate)
                .with_op("parse_date")
                .with_message(format!("'{}': {}", value, reason)),

            CoreError::UnknownSite { value } => ExError::new(ExErrorKind::UnknownSite)
                .with_op("parse_site")
                .with_message(format!("unknown site '{}'", value)),

            CoreError::InvalidSectionPath { path } => ExError::new(ExErrorKind::InvalidInput)
                .with_op("parse_section_path")
                .with_path(path)
                .with_message("Invalid section path"),

            CoreError::Config { path, reason } => ExError::new(ExErrorKind::Config)
                .with_op("load_config")
                .with_path(path)
                .with_message(reason),

            CoreError::Table { path, reason } => ExError::new(ExErrorKind::Io)
                .with_op("load_table")
                .with_path(path)
                .with_message(reason),

            CoreError::Serialization { message } => {
                ExError::new(ExErrorKind::Serialization).with_message(message)
            }
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Serialization {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_round_trip_through_lookup() {
        for kind in [
            ExErrorKind::InvalidScope,
            ExErrorKind::Collection,
            ExErrorKind::StoreWrite,
            ExErrorKind::Cancelled,
        ] {
            assert_eq!(ExErrorKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(ExErrorKind::from_code("ERR_NOPE"), None);
    }

    #[test]
    fn test_store_write_display_names_unit() {
        let err = ExError::new(ExErrorKind::StoreWrite)
            .with_op("merge_unit")
            .with_unit("lco/60123")
            .with_message("disk full");
        let s = err.to_string();
        assert!(s.starts_with("[ERR_STORE_WRITE]"));
        assert!(s.contains("'merge_unit'"));
        assert!(s.contains("lco/60123"));
    }
}
