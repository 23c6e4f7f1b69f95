//! # Vaccination Quality
//!
//! A small expectation engine for vaccination tables. Suites are JSON files,
//! checkpoints are YAML files, both kept under a [`DataContext`] root. The
//! context implements [`vaccination_core::ValidationEngine`], so it plugs
//! straight into the ingest pipeline's validation gate.

pub mod checkpoint;
pub mod context;
pub mod error;
pub mod expectation;
pub mod suite;

pub use checkpoint::{Checkpoint, CheckpointResult, CheckpointValidation};
pub use context::DataContext;
pub use error::QualityError;
pub use expectation::Expectation;
pub use suite::ExpectationSuite;
