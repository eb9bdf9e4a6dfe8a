//! Error types for bodytrend

use thiserror::Error;

/// Errors that can occur while loading, processing or querying measurements.
///
/// Row-level data problems never surface here: the cleaner drops those rows and
/// counts them in its report. Everything in this enum is fatal for the call that
/// produced it.
#[derive(Debug, Error)]
pub enum TrendError {
    #[error("Failed to load source table: {0}")]
    LoadError(String),

    #[error("Schema mismatch: {0}")]
    SchemaError(String),

    #[error("No measurements for person: {0}")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl TrendError {
    /// True for query-level absence, as opposed to a broken source or schema.
    pub fn is_not_found(&self) -> bool {
        matches!(self, TrendError::NotFound(_))
    }

    /// True for failures that mean the table itself is unusable.
    pub fn is_table_level(&self) -> bool {
        matches!(self, TrendError::LoadError(_) | TrendError::SchemaError(_))
    }
}
