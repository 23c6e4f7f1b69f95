//! Error types for the vaccination-quality crate.

use thiserror::Error;
use vaccination_core::IngestError;

#[derive(Debug, Error)]
pub enum QualityError {
    #[error("Expectation suite not found: {0}")]
    SuiteNotFound(String),

    #[error("Checkpoint not found: {0}")]
    CheckpointNotFound(String),

    #[error("Invalid expectation: {0}")]
    InvalidExpectation(String),

    #[error("Data context error: {0}")]
    Context(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Suite parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Checkpoint parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl QualityError {
    pub fn invalid_expectation(msg: impl Into<String>) -> Self {
        Self::InvalidExpectation(msg.into())
    }
}

impl From<QualityError> for IngestError {
    fn from(e: QualityError) -> Self {
        IngestError::validation_engine(e.to_string())
    }
}
