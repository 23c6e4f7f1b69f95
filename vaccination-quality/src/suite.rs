//! Named, persisted collections of expectations.

use crate::error::QualityError;
use crate::expectation::Expectation;
use serde::{Deserialize, Serialize};
use std::path::Path;
use vaccination_core::table::Table;
use vaccination_core::validation::ValidationResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectationSuite {
    pub expectation_suite_name: String,
    #[serde(default)]
    pub expectations: Vec<Expectation>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub meta: serde_json::Map<String, serde_json::Value>,
}

impl ExpectationSuite {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            expectation_suite_name: name.into(),
            expectations: Vec::new(),
            meta: serde_json::Map::new(),
        }
    }

    /// Append an expectation, rejecting ones that can never be evaluated.
    pub fn add_expectation(&mut self, expectation: Expectation) -> Result<(), QualityError> {
        expectation.check()?;
        self.expectations.push(expectation);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.expectations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expectations.is_empty()
    }

    /// Read a suite from its JSON file.
    pub fn load(path: &Path) -> Result<Self, QualityError> {
        let text = std::fs::read_to_string(path)?;
        let suite: Self = serde_json::from_str(&text)?;
        for expectation in &suite.expectations {
            expectation.check()?;
        }
        Ok(suite)
    }

    /// Write the suite as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), QualityError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Evaluate every expectation in order. Any invalid expectation aborts the run.
    pub fn validate(
        &self,
        table: &Table,
        data_asset_name: &str,
    ) -> Result<ValidationResult, QualityError> {
        let outcomes = self
            .expectations
            .iter()
            .map(|e| e.evaluate(table))
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(
            suite = %self.expectation_suite_name,
            evaluated = outcomes.len(),
            "Suite evaluated"
        );
        Ok(ValidationResult::from_outcomes(
            &self.expectation_suite_name,
            data_asset_name,
            outcomes,
        ))
    }
}
