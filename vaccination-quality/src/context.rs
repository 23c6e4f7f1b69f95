//! File-backed data context.
//!
//! Layout under the root directory:
//!
//! ```text
//! <root>/expectations/<suite>.json
//! <root>/checkpoints/<name>.yml
//! ```

use crate::checkpoint::{Checkpoint, CheckpointResult};
use crate::error::QualityError;
use crate::suite::ExpectationSuite;
use std::path::{Path, PathBuf};
use vaccination_core::IngestError;
use vaccination_core::validation::{RuntimeBatchRequest, ValidationEngine, ValidationResult};

const EXPECTATIONS_DIR: &str = "expectations";
const CHECKPOINTS_DIR: &str = "checkpoints";

#[derive(Debug, Clone)]
pub struct DataContext {
    root: PathBuf,
}

impl DataContext {
    /// Open an existing context directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, QualityError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(QualityError::Context(format!(
                "context root {} is not a directory",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    /// Create the directory layout if missing, then open it.
    pub fn init(root: impl Into<PathBuf>) -> Result<Self, QualityError> {
        let root = root.into();
        std::fs::create_dir_all(root.join(EXPECTATIONS_DIR))?;
        std::fs::create_dir_all(root.join(CHECKPOINTS_DIR))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, dir: &str, name: &str, ext: &str) -> Result<PathBuf, QualityError> {
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(QualityError::Context(format!("invalid name '{name}'")));
        }
        Ok(self.root.join(dir).join(format!("{name}.{ext}")))
    }

    pub fn get_expectation_suite(&self, name: &str) -> Result<ExpectationSuite, QualityError> {
        let path = self.entry_path(EXPECTATIONS_DIR, name, "json")?;
        if !path.is_file() {
            return Err(QualityError::SuiteNotFound(name.to_string()));
        }
        ExpectationSuite::load(&path)
    }

    /// Persist a suite, replacing any suite of the same name.
    pub fn save_expectation_suite(&self, suite: &ExpectationSuite) -> Result<(), QualityError> {
        let path = self.entry_path(EXPECTATIONS_DIR, &suite.expectation_suite_name, "json")?;
        suite.save(&path)?;
        tracing::info!(suite = %suite.expectation_suite_name, path = %path.display(), "Saved expectation suite");
        Ok(())
    }

    /// Suite names found on disk, sorted.
    pub fn list_expectation_suite_names(&self) -> Result<Vec<String>, QualityError> {
        list_stems(&self.root.join(EXPECTATIONS_DIR), "json")
    }

    pub fn get_checkpoint(&self, name: &str) -> Result<Checkpoint, QualityError> {
        let path = self.entry_path(CHECKPOINTS_DIR, name, "yml")?;
        if !path.is_file() {
            return Err(QualityError::CheckpointNotFound(name.to_string()));
        }
        Checkpoint::load(&path)
    }

    pub fn save_checkpoint(&self, checkpoint: &Checkpoint) -> Result<(), QualityError> {
        let path = self.entry_path(CHECKPOINTS_DIR, &checkpoint.name, "yml")?;
        checkpoint.save(&path)
    }

    pub fn list_checkpoint_names(&self) -> Result<Vec<String>, QualityError> {
        list_stems(&self.root.join(CHECKPOINTS_DIR), "yml")
    }

    /// Run every suite of `checkpoint` against the request's batch.
    ///
    /// The suite named in the request is ignored; the checkpoint decides.
    pub fn run_checkpoint(
        &self,
        checkpoint: &Checkpoint,
        request: &RuntimeBatchRequest<'_>,
    ) -> Result<CheckpointResult, QualityError> {
        tracing::info!(
            checkpoint = %checkpoint.name,
            suites = checkpoint.validations.len(),
            rows = request.batch_data.row_count(),
            "Running checkpoint"
        );
        let run_results = checkpoint
            .suite_names()
            .map(|name| {
                self.get_expectation_suite(name)?
                    .validate(request.batch_data, &request.data_asset_name)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let result = CheckpointResult::new(&checkpoint.name, run_results);
        if result.success {
            tracing::info!(checkpoint = %result.checkpoint_name, run_id = %result.run_id, "Checkpoint passed");
        } else {
            tracing::warn!(checkpoint = %result.checkpoint_name, run_id = %result.run_id, "Checkpoint failed");
        }
        Ok(result)
    }

    pub fn run_checkpoint_by_name(
        &self,
        name: &str,
        request: &RuntimeBatchRequest<'_>,
    ) -> Result<CheckpointResult, QualityError> {
        let checkpoint = self.get_checkpoint(name)?;
        self.run_checkpoint(&checkpoint, request)
    }
}

fn list_stems(dir: &Path, ext: &str) -> Result<Vec<String>, QualityError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|e| e == ext)
            && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
        {
            names.push(stem.to_string());
        }
    }
    names.sort();
    Ok(names)
}

impl ValidationEngine for DataContext {
    fn name(&self) -> &str {
        "data-context"
    }

    fn validate(&self, request: &RuntimeBatchRequest<'_>) -> Result<ValidationResult, IngestError> {
        let suite = self.get_expectation_suite(&request.expectation_suite_name)?;
        Ok(suite.validate(request.batch_data, &request.data_asset_name)?)
    }
}
