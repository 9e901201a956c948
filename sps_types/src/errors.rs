//! Error taxonomy for the reconciliation workflow.
//!
//! Every invariant violation is fatal: errors propagate unchanged to the
//! CLI entry point, which reports them and aborts without touching the
//! ledger. The only recoverable condition (a dilution-factor mismatch) is
//! handled before an error is ever constructed, via an operator decision.

use std::path::PathBuf;
use thiserror::Error;

pub type ReconcileResult<T> = Result<T, ReconcileError>;

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// A ledger merge produced a different number of rows than the ledger
    /// held before the merge. Indicates fan-out or silently dropped
    /// samples and always aborts the run.
    #[error(
        "row count changed while merging {stage}: ledger had {expected} rows, \
         merge produced {actual}. Aborting before any ledger write."
    )]
    RowCountDrift {
        stage: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("duplicate sample id '{sample_id}' in {source_name}")]
    DuplicateSampleId {
        sample_id: String,
        source_name: String,
    },

    #[error("sample '{sample_id}' from {source_name} is not present in the ledger")]
    UnknownSample {
        sample_id: String,
        source_name: String,
    },

    #[error("FA sample id '{raw}' does not split into <plate>_<sample>_<well>")]
    MalformedSampleId { raw: String },

    /// The FA plate folder name does not match any plate parsed from the
    /// sample ids inside the smear file. The primary defense against
    /// processing a mislabeled or swapped physical plate.
    #[error(
        "mismatch between FA plate folder '{folder}' and the plate ids parsed \
         from sample names in '{file}'"
    )]
    PlateNameMismatch { folder: String, file: PathBuf },

    #[error("processed {files} FA files but recovered {plates} distinct destination plates")]
    PlateCountMismatch { files: usize, plates: usize },

    #[error("thresholds file '{path}' is missing a value in column '{column}'")]
    IncompleteThresholds { path: PathBuf, column: String },

    #[error("no QC thresholds defined for plate '{plate}'")]
    MissingThreshold { plate: String },

    /// A sample has no total-passed-attempts value after reconciliation,
    /// meaning it was present on one side of a merge but not the other.
    #[error(
        "sample '{sample_id}' has no Total_passed_attempts value after \
         reconciliation; the ledger and the QC summary are out of sync"
    )]
    NullAttemptCount { sample_id: String },

    /// `Total_passed_attempts` disagrees with the sum of the per-attempt
    /// pass flags. Signals an internally inconsistent hand-edited summary.
    #[error(
        "Total_passed_attempts for sample '{sample_id}' is {total} but \
         Passed_library + Redo_Passed_library is {sum}; check the updated \
         summary file for pass/fail values that were not properly updated"
    )]
    AccountingMismatch {
        sample_id: String,
        total: u8,
        sum: u8,
    },

    #[error("required input file is missing: {path}")]
    MissingInput { path: PathBuf },

    #[error("did not find any FA output files under {dir}")]
    NoFaFiles { dir: PathBuf },

    #[error("aborted by operator: {reason}")]
    OperatorAbort { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
