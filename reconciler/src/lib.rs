//! The plate-state reconciliation engine.
//!
//! Tracks every sample through up to two library-construction attempts:
//! merging FA QC results and per-plate thresholds into the project ledger,
//! deciding pass/fail per sample and rework per plate, selecting the
//! pooling source for each sample, and enforcing the row-count and
//! attempt-accounting invariants at every merge. All decisions that need a
//! human go through [`decision::DecisionProvider`].

pub mod conclude;
pub mod decision;
pub mod first_attempt;
pub mod merge;
pub mod pooling;
pub mod rework;
pub mod second_attempt;
pub mod summary;
pub mod thresholds;

/// Concentrations are reported to 3 decimal places after dilution
/// correction.
pub(crate) fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}
