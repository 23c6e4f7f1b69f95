//! Source interface and the vaccination CSV source.

use crate::config::{ValidationPolicy, VaccinationSourceConfig};
use crate::emitter::WorkUnitStream;
use crate::error::IngestError;
use crate::report::SourceReport;
use crate::table::{REQUIRED_COLUMNS, Table};
use crate::validation::{ValidationEngine, ValidationGate};
use async_trait::async_trait;
use std::time::Duration;

/// Context shared by everything in one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineContext {
    pub run_id: String,
    pub pipeline_name: Option<String>,
}

impl PipelineContext {
    pub fn new(pipeline_name: Option<String>) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            pipeline_name,
        }
    }
}

impl Default for PipelineContext {
    fn default() -> Self {
        Self::new(None)
    }
}

/// The trait every metadata source implements.
///
/// Four capabilities: construct from config, produce units, report, release.
#[async_trait]
pub trait Source: Send {
    /// Construct from a loosely typed config value.
    fn create(config: serde_json::Value, ctx: PipelineContext) -> Result<Self, IngestError>
    where
        Self: Sized;

    /// Load input and return the unit stream for one pass.
    async fn get_workunits<'a>(&'a mut self) -> Result<WorkUnitStream<'a>, IngestError>;

    /// Report of the most recent pass.
    fn get_report(&self) -> &SourceReport;

    /// Release held resources.
    fn close(&mut self) -> Result<(), IngestError> {
        Ok(())
    }
}

/// Source that reads a vaccination CSV and emits one unit per row.
pub struct VaccinationSource {
    config: VaccinationSourceConfig,
    ctx: PipelineContext,
    gate: Option<ValidationGate>,
    report: SourceReport,
}

impl VaccinationSource {
    pub fn new(config: VaccinationSourceConfig, ctx: PipelineContext) -> Self {
        Self {
            config,
            ctx,
            gate: None,
            report: SourceReport::default(),
        }
    }

    /// Attach an engine. It is only used when the config has a `validation` section.
    pub fn with_validation_engine(mut self, engine: Box<dyn ValidationEngine>) -> Self {
        match self.config.validation.clone() {
            Some(validation) => self.gate = Some(ValidationGate::new(engine, validation)),
            None => tracing::debug!(
                engine = engine.name(),
                "No validation configured; ignoring engine"
            ),
        }
        self
    }

    pub fn config(&self) -> &VaccinationSourceConfig {
        &self.config
    }

    pub fn context(&self) -> &PipelineContext {
        &self.ctx
    }

    pub fn has_validation(&self) -> bool {
        self.gate.is_some()
    }
}

#[async_trait]
impl Source for VaccinationSource {
    fn create(config: serde_json::Value, ctx: PipelineContext) -> Result<Self, IngestError> {
        let config = VaccinationSourceConfig::from_value(config)?;
        Ok(Self::new(config, ctx))
    }

    async fn get_workunits<'a>(&'a mut self) -> Result<WorkUnitStream<'a>, IngestError> {
        self.report = SourceReport::default();
        tracing::info!(
            run_id = %self.ctx.run_id,
            csv = %self.config.csv_file_url,
            env = %self.config.env,
            "Starting vaccination ingestion"
        );

        let timeout = Duration::from_secs(self.config.fetch_timeout_secs);
        let table = match Table::fetch(&self.config.csv_file_url, timeout).await {
            Ok(table) => table,
            Err(e) => {
                self.report.report_failure("source", e.to_string());
                return Err(e);
            }
        };
        if let Err(e) = table.require_columns(&REQUIRED_COLUMNS) {
            self.report.report_failure("source", e.to_string());
            return Err(e);
        }
        self.report.rows_loaded = table.row_count();
        if table.is_empty() {
            tracing::warn!(csv = %self.config.csv_file_url, "CSV has no data rows");
            self.report.report_warning("source", "CSV has a header but no data rows");
        }

        if let Some(gate) = &self.gate {
            let result = match gate.run(&table) {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!(error = %e, "Validation engine failed");
                    self.report.report_failure("validation", e.to_string());
                    return Err(e);
                }
            };
            let verdict = gate.enforce(&result);
            if !result.success && gate.policy() == ValidationPolicy::Annotate {
                self.report.report_warning(
                    "validation",
                    format!(
                        "suite '{}' failed {} of {} expectations; emitting anyway",
                        result.expectation_suite_name,
                        result.statistics.unsuccessful_expectations,
                        result.statistics.evaluated_expectations
                    ),
                );
            }
            self.report.validation = Some(result);
            if let Err(e) = verdict {
                tracing::error!(error = %e, "Validation blocked emission");
                self.report.report_failure("validation", e.to_string());
                return Err(e);
            }
        }

        Ok(WorkUnitStream::new(
            table,
            self.config.env.clone(),
            &mut self.report,
        ))
    }

    fn get_report(&self) -> &SourceReport {
        &self.report
    }

    fn close(&mut self) -> Result<(), IngestError> {
        tracing::debug!(
            run_id = %self.ctx.run_id,
            produced = self.report.workunits_produced,
            "Closing vaccination source"
        );
        self.gate = None;
        Ok(())
    }
}
