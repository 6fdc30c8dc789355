//! Error taxonomy for trace preparation
//!
//! Every failure happens while turning a raw trace into the canonical event
//! table (or while loading the adapters around it). Once an `EventTable`
//! exists, the analytics never fail: degenerate inputs produce empty results.

use thiserror::Error;

/// Errors raised while loading, validating or parameterizing a trace analysis
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("Schema error: missing required column(s): {}", missing.join(", "))]
    Schema { missing: Vec<String> },

    #[error("Data integrity error at row {row}: {reason}")]
    DataIntegrity { row: usize, reason: String },

    #[error("Empty input: trace contains no data rows")]
    EmptyInput,

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid config: {0}")]
    Config(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TraceError {
    pub(crate) fn integrity(row: usize, reason: impl Into<String>) -> Self {
        TraceError::DataIntegrity {
            row,
            reason: reason.into(),
        }
    }
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, TraceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_lists_all_columns() {
        let err = TraceError::Schema {
            missing: vec!["mem".to_string(), "host".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Schema error: missing required column(s): mem, host"
        );
    }

    #[test]
    fn test_integrity_error_mentions_row() {
        let err = TraceError::integrity(7, "submit_time_ms > start_time_ms");
        let msg = err.to_string();
        assert!(msg.contains("row 7"));
        assert!(msg.contains("submit_time_ms > start_time_ms"));
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: TraceError = io.into();
        assert!(matches!(err, TraceError::Io(_)));
    }
}
