//! Error types for the metabar-summary library.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum MetabarError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Invalid threshold: {0}")]
    InvalidThreshold(String),

    #[error("Invalid read count '{value}' at row {row}, column '{column}'")]
    InvalidCount {
        value: String,
        row: usize,
        column: String,
    },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Empty data: {0}")]
    EmptyData(String),

    #[error("Pipeline is busy with a previous submission")]
    Busy,

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse classification of a failure, reported to callers of the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    Schema,
    InvalidThreshold,
    InvalidInput,
    Io,
    Busy,
    Pipeline,
}

impl MetabarError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MetabarError::Schema(_) => ErrorKind::Schema,
            MetabarError::InvalidThreshold(_) => ErrorKind::InvalidThreshold,
            MetabarError::InvalidCount { .. }
            | MetabarError::InvalidParameter(_)
            | MetabarError::EmptyData(_)
            | MetabarError::Csv(_)
            | MetabarError::Yaml(_)
            | MetabarError::Json(_) => ErrorKind::InvalidInput,
            MetabarError::Io(_) => ErrorKind::Io,
            MetabarError::Busy => ErrorKind::Busy,
            MetabarError::Pipeline(_) => ErrorKind::Pipeline,
        }
    }
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, MetabarError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind() {
        assert_eq!(MetabarError::Schema("x".into()).kind(), ErrorKind::Schema);
        assert_eq!(
            MetabarError::InvalidThreshold("-1".into()).kind(),
            ErrorKind::InvalidThreshold
        );
        assert_eq!(MetabarError::Busy.kind(), ErrorKind::Busy);
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        assert_eq!(MetabarError::from(io).kind(), ErrorKind::Io);
    }
}
