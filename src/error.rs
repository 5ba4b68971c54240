//! Ошибки пайплайна

use polars::prelude::PolarsError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Data error: {0}")]
    Polars(#[from] PolarsError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing columns in input data: {0:?}")]
    MissingColumns(Vec<String>),

    #[error("Duplicate columns in input data: {0:?}")]
    DuplicateColumns(Vec<String>),

    #[error("Variable '{0}' not found in the dataset")]
    ColumnNotFound(String),

    #[error("Incorrect data type for column '{column}'. Expected {expected}, got {found}")]
    DTypeMismatch {
        column: String,
        expected: String,
        found: String,
    },

    #[error("{0} is not fitted")]
    NotFitted(&'static str),

    #[error("Unknown category '{value}' in column '{column}'")]
    UnknownCategory { column: String, value: String },

    #[error("Column '{column}' contains {count} missing values")]
    MissingValues { column: String, count: usize },

    #[error("Feature mismatch: expected {expected:?}, got {got:?}")]
    FeatureMismatch {
        expected: Vec<String>,
        got: Vec<String>,
    },

    #[error("Column '{column}' has {got} rows, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        got: usize,
    },

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Empty data: {0}")]
    EmptyData(String),

    #[error("Metrics error: {0}")]
    Metrics(String),
}

impl From<linfa::Error> for PipelineError {
    fn from(err: linfa::Error) -> Self {
        PipelineError::Metrics(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_columns_message_lists_all() {
        let err = PipelineError::MissingColumns(vec!["Age".to_string(), "Fare".to_string()]);
        let msg = err.to_string();
        assert!(msg.contains("Age"));
        assert!(msg.contains("Fare"));
    }

    #[test]
    fn test_io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: PipelineError = io_err.into();
        assert!(matches!(err, PipelineError::Io(_)));
    }
}
