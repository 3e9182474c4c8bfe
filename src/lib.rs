//! # gtfsdb - GTFS feeds in SQLite
//!
//! Loads standardized transit-schedule feeds into a relational store and
//! serves them back out.
//!
//! gtfsdb provides:
//! - A declarative schema registry for every GTFS (and a few non-standard) files
//! - An import pipeline: download or local path, archive extraction, streaming
//!   CSV parsing with schema-driven coercion, chunked transactional loading
//! - Parameterized queries, including filters through related entities
//!   ("routes serving stop X", "stops on trip Y")
//! - CSV re-export and GeoJSON rendering with shape consolidation

pub mod value;
pub mod schema;
pub mod storage;
pub mod query;
pub mod geometry;
pub mod import;
pub mod export;
pub mod config;
pub mod output;
pub mod ui;
pub mod server;

// Re-exports for convenient access
pub use value::{Record, Row, Value};
pub use schema::{Column, ColumnType, EntitySchema};
pub use storage::GtfsStore;
pub use query::{Filters, OrderBy, OrderDirection, QueryEngine};

/// Result type alias for gtfsdb operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for gtfsdb operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Acquisition error: {0}")]
    Acquisition(String),

    #[error("Invalid {field} in {file} on line {line}: {reason}")]
    Validation {
        file: String,
        field: String,
        line: u64,
        reason: String,
    },

    #[error("Unknown entity: {0}")]
    UnknownEntity(String),

    #[error("{agency_key}: {source}")]
    Agency {
        agency_key: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Attach the agency key to an error raised while processing that agency
    pub fn for_agency(self, agency_key: &str) -> Self {
        match self {
            Self::Agency { .. } => self,
            other => Self::Agency {
                agency_key: agency_key.to_string(),
                source: Box::new(other),
            },
        }
    }
}
