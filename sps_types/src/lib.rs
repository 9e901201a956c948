//! Core types for the SPS library-prep reconciliation workflow.
//!
//! Every stage of the workflow (first-attempt FA analysis, rework
//! assignment, second-attempt FA analysis, conclusion) operates on the
//! same per-sample ledger row, [`SampleRecord`], and reports failures
//! through [`ReconcileError`].

pub mod constants;
pub mod errors;
pub mod sample_record;
pub mod table_parser;

pub use errors::{ReconcileError, ReconcileResult};
pub use sample_record::SampleRecord;
pub use table_parser::TableParser;
