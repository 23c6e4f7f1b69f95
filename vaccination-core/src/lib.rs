//! # vaccination-core
//!
//! Ingests a CSV of vaccination statistics and emits one catalog metadata unit
//! per row.
//!
//! ## Flow
//!
//! 1. [`table::Table::fetch`] loads the whole CSV (local path or URL).
//! 2. [`validation::ValidationGate`] optionally runs an expectation suite over
//!    the full table and applies the configured policy.
//! 3. [`emitter::WorkUnitStream`] coerces each row to a
//!    [`record::VaccinationRecord`], maps it with [`mapper::map_record`], counts
//!    it in the [`report::SourceReport`], and yields it.
//!
//! [`source::VaccinationSource`] ties the steps together behind the
//! [`source::Source`] trait; [`pipeline::Pipeline`] drains a source into a
//! [`sink::Sink`].

pub mod config;
pub mod emitter;
pub mod error;
pub mod mapper;
pub mod pipeline;
pub mod record;
pub mod report;
pub mod sink;
pub mod source;
pub mod table;
pub mod urn;
pub mod validation;
pub mod workunit;

// Re-exports
pub use config::{
    Recipe, SinkConfig, ValidationConfig, ValidationPolicy, VaccinationSourceConfig, load_recipe,
};
pub use emitter::WorkUnitStream;
pub use error::IngestError;
pub use mapper::{NO_VALUE, map_record};
pub use pipeline::{Pipeline, PipelineSummary};
pub use record::VaccinationRecord;
pub use report::SourceReport;
pub use source::{PipelineContext, Source, VaccinationSource};
pub use table::Table;
pub use urn::DatasetUrn;
pub use validation::{
    ExpectationOutcome, RuntimeBatchRequest, ValidationEngine, ValidationResult,
};
pub use workunit::MetadataWorkUnit;
