// ❗ Error Taxonomy
// Every fatal condition aborts the run; non-fatal exclusions are counted, not raised.

use std::path::PathBuf;
use thiserror::Error;

use crate::schema::ValidationError;

#[derive(Error, Debug)]
pub enum ReconError {
    #[error("Unparsable identifier: {identifier:?} does not match <FundName>.<DateToken>")]
    UnparsableIdentifier { identifier: String },

    #[error("Unparsable date: token {token:?} in {identifier:?} matches no known date format")]
    UnparsableDate { identifier: String, token: String },

    #[error("Schema violation in {record}: {}", join_violations(.violations))]
    SchemaViolation {
        record: String,
        violations: Vec<ValidationError>,
    },

    #[error("Missing columns in {}: {}", .file.display(), .columns.join(", "))]
    MissingColumns { file: PathBuf, columns: Vec<String> },

    #[error("CSV error in {}: {source}", .file.display())]
    Csv {
        file: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot open reference store {}: {source}", .path.display())]
    OpenStore {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Invalid reference date {value:?} for symbol {symbol} (expected MM/DD/YYYY)")]
    InvalidReferenceDate { symbol: String, value: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Worker pool error: {0}")]
    WorkerPool(String),
}

pub type Result<T> = std::result::Result<T, ReconError>;

impl ReconError {
    pub fn schema(record: impl Into<String>, violations: Vec<ValidationError>) -> Self {
        ReconError::SchemaViolation {
            record: record.into(),
            violations,
        }
    }
}

fn join_violations(violations: &[ValidationError]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
