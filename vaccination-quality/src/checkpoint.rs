//! Checkpoints: a named list of suites run together against one batch.

use crate::error::QualityError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;
use vaccination_core::validation::ValidationResult;

/// One suite reference inside a checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointValidation {
    pub expectation_suite_name: String,
}

/// Checkpoint configuration as stored in `checkpoints/<name>.yml`.
///
/// Keys other than `name` and `validations` are tolerated and ignored so files
/// written by other tooling still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub name: String,
    #[serde(default)]
    pub validations: Vec<CheckpointValidation>,
}

impl Checkpoint {
    /// Build a checkpoint in code from suite names.
    pub fn new<I, S>(name: impl Into<String>, suites: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            validations: suites
                .into_iter()
                .map(|s| CheckpointValidation {
                    expectation_suite_name: s.into(),
                })
                .collect(),
        }
    }

    pub fn suite_names(&self) -> impl Iterator<Item = &str> {
        self.validations
            .iter()
            .map(|v| v.expectation_suite_name.as_str())
    }

    pub fn load(path: &Path) -> Result<Self, QualityError> {
        let text = std::fs::read_to_string(path)?;
        let checkpoint: Self = serde_yaml::from_str(&text)?;
        if checkpoint.validations.is_empty() {
            return Err(QualityError::Context(format!(
                "checkpoint '{}' lists no validations",
                checkpoint.name
            )));
        }
        Ok(checkpoint)
    }

    pub fn save(&self, path: &Path) -> Result<(), QualityError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }
}

/// Combined outcome of one checkpoint run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointResult {
    pub checkpoint_name: String,
    pub run_id: Uuid,
    pub success: bool,
    pub run_results: Vec<ValidationResult>,
}

impl CheckpointResult {
    pub fn new(checkpoint_name: impl Into<String>, run_results: Vec<ValidationResult>) -> Self {
        Self {
            checkpoint_name: checkpoint_name.into(),
            run_id: Uuid::new_v4(),
            success: run_results.iter().all(|r| r.success),
            run_results,
        }
    }

    /// Result for one suite, if the checkpoint ran it.
    pub fn suite_result(&self, suite: &str) -> Option<&ValidationResult> {
        self.run_results
            .iter()
            .find(|r| r.expectation_suite_name == suite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_load_tolerates_extra_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vaccination_checkpoint.yml");
        std::fs::write(
            &path,
            "name: vaccination_checkpoint\n\
             config_version: 1.0\n\
             class_name: Checkpoint\n\
             run_name_template: '%Y%m%d-%H%M%S'\n\
             validations:\n  - expectation_suite_name: vaccination_expectations\n",
        )
        .unwrap();
        let checkpoint = Checkpoint::load(&path).unwrap();
        assert_eq!(checkpoint.name, "vaccination_checkpoint");
        assert_eq!(
            checkpoint.suite_names().collect::<Vec<_>>(),
            vec!["vaccination_expectations"]
        );
    }

    #[test]
    fn test_load_rejects_empty_validations() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.yml");
        std::fs::write(&path, "name: empty\n").unwrap();
        assert!(matches!(
            Checkpoint::load(&path),
            Err(QualityError::Context(_))
        ));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkpoints/cp.yml");
        let checkpoint = Checkpoint::new("cp", ["a", "b"]);
        checkpoint.save(&path).unwrap();
        assert_eq!(Checkpoint::load(&path).unwrap(), checkpoint);
    }

    #[test]
    fn test_result_success_requires_every_suite() {
        let pass = ValidationResult::from_outcomes("a", "asset", vec![]);
        let mut fail = ValidationResult::from_outcomes("b", "asset", vec![]);
        fail.success = false;

        let result = CheckpointResult::new("cp", vec![pass.clone(), fail]);
        assert!(!result.success);
        assert!(result.suite_result("a").unwrap().success);
        assert!(result.suite_result("missing").is_none());

        assert!(CheckpointResult::new("cp", vec![pass]).success);
    }
}
