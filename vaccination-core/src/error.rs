//! Error types for the vaccination-core crate.

use thiserror::Error;

/// Top-level error type for ingestion runs.
///
/// Row-level variants (`Format`, `Type`, `MissingValue`) identify the offending
/// row and field. Every other variant aborts the whole run.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Format error at row {row} (location {location:?}): field `{field}` = {value:?} is not a YYYY-MM-DD date")]
    Format {
        row: usize,
        location: String,
        field: String,
        value: String,
    },

    #[error("Type error at row {row} (location {location:?}): field `{field}` = {value:?} is not a non-negative integer")]
    Type {
        row: usize,
        location: String,
        field: String,
        value: String,
    },

    #[error("Missing value at row {row} (location {location:?}): required field `{field}` is empty")]
    MissingValue {
        row: usize,
        location: String,
        field: String,
    },

    #[error("Source unavailable: {location}: {reason}")]
    SourceUnavailable { location: String, reason: String },

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Validation engine error: {0}")]
    ValidationEngine(String),

    #[error("Validation failed for suite {suite}: {unsuccessful} of {evaluated} expectations failed")]
    ValidationFailed {
        suite: String,
        evaluated: usize,
        unsuccessful: usize,
    },

    #[error("Mapping error: {0}")]
    Mapping(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl IngestError {
    pub fn source_unavailable(location: impl Into<String>, reason: impl ToString) -> Self {
        Self::SourceUnavailable {
            location: location.into(),
            reason: reason.to_string(),
        }
    }

    pub fn validation_engine(msg: impl Into<String>) -> Self {
        Self::ValidationEngine(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this error is scoped to a single input row.
    pub fn is_row_error(&self) -> bool {
        matches!(
            self,
            Self::Format { .. } | Self::Type { .. } | Self::MissingValue { .. }
        )
    }

    /// Row index of a row-level error.
    pub fn row(&self) -> Option<usize> {
        match self {
            Self::Format { row, .. } | Self::Type { row, .. } | Self::MissingValue { row, .. } => {
                Some(*row)
            }
            _ => None,
        }
    }
}
