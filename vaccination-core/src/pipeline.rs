//! Host-side runner: source → sink.

use crate::config::Recipe;
use crate::error::IngestError;
use crate::report::SourceReport;
use crate::sink::{Sink, build_sink};
use crate::source::{PipelineContext, Source, VaccinationSource};
use crate::validation::ValidationEngine;
use serde::Serialize;

/// Outcome of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineSummary {
    pub run_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pipeline_name: Option<String>,
    pub records_written: usize,
    pub source_report: SourceReport,
}

/// One ingestion pipeline built from a recipe.
pub struct Pipeline {
    ctx: PipelineContext,
    source: VaccinationSource,
    sink: Box<dyn Sink>,
}

impl Pipeline {
    /// Build source and sink from a recipe.
    pub fn create(
        recipe: &Recipe,
        engine: Option<Box<dyn ValidationEngine>>,
    ) -> Result<Self, IngestError> {
        let sink = build_sink(&recipe.sink)?;
        Self::with_sink(recipe, engine, sink)
    }

    /// Build with an explicit sink, ignoring the recipe's sink section.
    pub fn with_sink(
        recipe: &Recipe,
        engine: Option<Box<dyn ValidationEngine>>,
        sink: Box<dyn Sink>,
    ) -> Result<Self, IngestError> {
        if recipe.source.source_type != "vaccination" {
            return Err(IngestError::config(format!(
                "unsupported source type {:?}",
                recipe.source.source_type
            )));
        }

        let ctx = PipelineContext::new(recipe.pipeline_name.clone());
        let mut source = VaccinationSource::create(recipe.source.config.clone(), ctx.clone())?;
        if let Some(engine) = engine {
            source = source.with_validation_engine(engine);
        }

        Ok(Self { ctx, source, sink })
    }

    pub fn context(&self) -> &PipelineContext {
        &self.ctx
    }

    /// Drain every unit into the sink.
    ///
    /// The sink is flushed and both ends are closed even when the run aborts;
    /// the abort error is returned after that.
    pub async fn run(&mut self) -> Result<PipelineSummary, IngestError> {
        tracing::info!(run_id = %self.ctx.run_id, "Pipeline started");

        let outcome = match self.source.get_workunits().await {
            Ok(stream) => {
                let mut outcome = Ok(());
                for item in stream {
                    match item.and_then(|wu| self.sink.write_workunit(&wu)) {
                        Ok(()) => {}
                        Err(e) => {
                            outcome = Err(e);
                            break;
                        }
                    }
                }
                outcome
            }
            Err(e) => Err(e),
        };

        let closed = self.sink.close().and(self.source.close());
        outcome?;
        closed?;

        let report = self.source.get_report().clone();
        tracing::info!(
            run_id = %self.ctx.run_id,
            produced = report.workunits_produced,
            failures = report.failures.len(),
            "Pipeline finished"
        );

        Ok(PipelineSummary {
            run_id: self.ctx.run_id.clone(),
            pipeline_name: self.ctx.pipeline_name.clone(),
            records_written: self.sink.written(),
            source_report: report,
        })
    }

    /// Report of the source, available after a failed run too.
    pub fn source_report(&self) -> &SourceReport {
        self.source.get_report()
    }
}
