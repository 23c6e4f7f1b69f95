//! Validation gate: the seam between the pipeline and a data-quality engine.
//!
//! The pipeline never evaluates rules itself. It wraps the loaded table in a
//! [`RuntimeBatchRequest`], hands it to a [`ValidationEngine`], and applies the
//! configured [`ValidationPolicy`] to the returned [`ValidationResult`].

use crate::config::{ValidationConfig, ValidationPolicy};
use crate::error::IngestError;
use crate::table::Table;
use serde::{Deserialize, Serialize};

pub const DATASOURCE_NAME: &str = "vaccination_data";
pub const DATA_CONNECTOR_NAME: &str = "default_runtime_data_connector_name";
pub const DATA_ASSET_NAME: &str = "vaccination_data";
pub const BATCH_IDENTIFIER: &str = "default_identifier";

/// An in-memory batch submitted to an engine together with the suite to run.
#[derive(Debug, Clone)]
pub struct RuntimeBatchRequest<'a> {
    pub datasource_name: String,
    pub data_connector_name: String,
    pub data_asset_name: String,
    pub batch_identifier: String,
    pub expectation_suite_name: String,
    pub batch_data: &'a Table,
}

impl<'a> RuntimeBatchRequest<'a> {
    /// Request for the vaccination datasource with default identifiers.
    pub fn new(batch_data: &'a Table, expectation_suite_name: impl Into<String>) -> Self {
        Self {
            datasource_name: DATASOURCE_NAME.to_string(),
            data_connector_name: DATA_CONNECTOR_NAME.to_string(),
            data_asset_name: DATA_ASSET_NAME.to_string(),
            batch_identifier: BATCH_IDENTIFIER.to_string(),
            expectation_suite_name: expectation_suite_name.into(),
            batch_data,
        }
    }
}

/// Outcome of one expectation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectationOutcome {
    pub expectation_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    pub success: bool,
    #[serde(default)]
    pub unexpected_count: usize,
    /// First few offending row indices.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unexpected_rows: Vec<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationStatistics {
    pub evaluated_expectations: usize,
    pub successful_expectations: usize,
    pub unsuccessful_expectations: usize,
    pub success_percent: f64,
}

impl ValidationStatistics {
    pub fn from_outcomes(outcomes: &[ExpectationOutcome]) -> Self {
        let evaluated = outcomes.len();
        let successful = outcomes.iter().filter(|o| o.success).count();
        let success_percent = if evaluated > 0 {
            successful as f64 / evaluated as f64 * 100.0
        } else {
            100.0
        };
        Self {
            evaluated_expectations: evaluated,
            successful_expectations: successful,
            unsuccessful_expectations: evaluated - successful,
            success_percent,
        }
    }
}

/// Result of running one suite against one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub expectation_suite_name: String,
    pub data_asset_name: String,
    pub success: bool,
    pub statistics: ValidationStatistics,
    pub results: Vec<ExpectationOutcome>,
    pub evaluated_at: chrono::DateTime<chrono::Utc>,
}

impl ValidationResult {
    pub fn from_outcomes(
        expectation_suite_name: impl Into<String>,
        data_asset_name: impl Into<String>,
        results: Vec<ExpectationOutcome>,
    ) -> Self {
        let statistics = ValidationStatistics::from_outcomes(&results);
        Self {
            expectation_suite_name: expectation_suite_name.into(),
            data_asset_name: data_asset_name.into(),
            success: statistics.unsuccessful_expectations == 0,
            statistics,
            results,
            evaluated_at: chrono::Utc::now(),
        }
    }

    pub fn failed(&self) -> impl Iterator<Item = &ExpectationOutcome> {
        self.results.iter().filter(|o| !o.success)
    }
}

/// A data-quality engine able to run a named suite over a batch.
pub trait ValidationEngine: Send + Sync {
    /// Engine name for logs.
    fn name(&self) -> &str;

    /// Run the requested suite. Errors mean the engine could not run at all,
    /// not that expectations failed.
    fn validate(&self, request: &RuntimeBatchRequest<'_>) -> Result<ValidationResult, IngestError>;
}

/// Runs an engine once per load and decides whether emission may proceed.
pub struct ValidationGate {
    engine: Box<dyn ValidationEngine>,
    config: ValidationConfig,
}

impl ValidationGate {
    pub fn new(engine: Box<dyn ValidationEngine>, config: ValidationConfig) -> Self {
        Self { engine, config }
    }

    pub fn policy(&self) -> ValidationPolicy {
        self.config.policy
    }

    /// Validate the whole table against the configured suite.
    pub fn run(&self, table: &Table) -> Result<ValidationResult, IngestError> {
        let request = RuntimeBatchRequest::new(table, &self.config.expectation_suite_name);
        tracing::info!(
            engine = self.engine.name(),
            suite = %request.expectation_suite_name,
            rows = table.row_count(),
            "Running validation"
        );

        let result = self.engine.validate(&request)?;

        if result.success {
            tracing::info!(
                suite = %result.expectation_suite_name,
                evaluated = result.statistics.evaluated_expectations,
                "Validation passed"
            );
        } else {
            for outcome in result.failed() {
                tracing::warn!(
                    expectation = %outcome.expectation_type,
                    column = outcome.column.as_deref().unwrap_or("-"),
                    unexpected = outcome.unexpected_count,
                    "Expectation failed"
                );
            }
        }
        Ok(result)
    }

    /// Apply the policy to a result. `Block` turns a failed suite into an error.
    pub fn enforce(&self, result: &ValidationResult) -> Result<(), IngestError> {
        match self.config.policy {
            ValidationPolicy::Block if !result.success => Err(IngestError::ValidationFailed {
                suite: result.expectation_suite_name.clone(),
                evaluated: result.statistics.evaluated_expectations,
                unsuccessful: result.statistics.unsuccessful_expectations,
            }),
            _ => Ok(()),
        }
    }
}

impl std::fmt::Debug for ValidationGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationGate")
            .field("engine", &self.engine.name())
            .field("config", &self.config)
            .finish()
    }
}
