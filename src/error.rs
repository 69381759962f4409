//! Error types for the lineage engine.
//!
//! Only run-level failures surface as [`LineageError`]; per-record problems are
//! counted as skips and lineage-write problems are logged (see `lineage`).

use thiserror::Error;

/// Failure reported by a storage port (entity store or snapshot source).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("record {0} not found")]
    NotFound(String),

    #[error("write rejected for {entity_id}: {reason}")]
    WriteRejected { entity_id: String, reason: String },
}

/// Failure reported by a lineage sink.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("lineage sink unavailable: {0}")]
    Unavailable(String),
}

/// Why a field-selection request could not be parsed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("selection request must be a JSON object")]
    NotAnObject,

    #[error("request has no 'fields'")]
    MissingFields,

    #[error("'fields' must be an array of strings")]
    FieldsNotArray,

    #[error("'fields' is empty")]
    Empty,

    #[error("unknown field '{0}'")]
    UnknownField(String),
}

#[derive(Debug, Error)]
pub enum LineageError {
    #[error("cannot fetch mapping list: {0}")]
    MappingsUnavailable(#[source] StoreError),

    #[error("cannot fetch snapshots: {0}")]
    SnapshotsUnavailable(#[source] StoreError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LineageError {
    /// Stable error code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MappingsUnavailable(_) => "MAPPINGS_UNAVAILABLE",
            Self::SnapshotsUnavailable(_) => "SNAPSHOTS_UNAVAILABLE",
            Self::Serialization(_) => "SERIALIZATION",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            Self::MappingsUnavailable(_) | Self::SnapshotsUnavailable(_) => 503,
            Self::Serialization(_) => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, LineageError>;
