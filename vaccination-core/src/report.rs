//! Per-run source report.

use crate::validation::ValidationResult;
use serde::{Deserialize, Serialize};

/// One recorded problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    /// Row index or unit id the entry concerns.
    pub key: String,
    pub message: String,
}

/// What one emission pass produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceReport {
    pub workunits_produced: usize,
    pub workunit_ids: Vec<String>,
    pub rows_loaded: usize,
    pub warnings: Vec<ReportEntry>,
    pub failures: Vec<ReportEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationResult>,
    pub start_time: chrono::DateTime<chrono::Utc>,
}

impl Default for SourceReport {
    fn default() -> Self {
        Self {
            workunits_produced: 0,
            workunit_ids: Vec::new(),
            rows_loaded: 0,
            warnings: Vec::new(),
            failures: Vec::new(),
            validation: None,
            start_time: chrono::Utc::now(),
        }
    }
}

impl SourceReport {
    pub fn report_workunit(&mut self, id: &str) {
        self.workunits_produced += 1;
        self.workunit_ids.push(id.to_string());
    }

    pub fn report_warning(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ReportEntry {
            key: key.into(),
            message: message.into(),
        });
    }

    pub fn report_failure(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.failures.push(ReportEntry {
            key: key.into(),
            message: message.into(),
        });
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}
