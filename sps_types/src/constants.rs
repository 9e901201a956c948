/// Substrings identifying FA control wells, matched case-insensitively
/// against the instrument's `Sample ID` column.
pub const CONTROL_MARKERS: [&str; 3] = ["empty", "ladder", "libstd"];

/// Suffix appended to a library plate barcode to name its FA plate.
/// A library plate `P1` is measured on the FA plate `P1F`.
pub const FA_PLATE_SUFFIX: char = 'F';

/// File-name suffix of FA smear analysis exports.
pub const SMEAR_FILE_SUFFIX: &str = "Smear Analysis Result.csv";

/// Default number of failed libraries on a plate that triggers
/// whole-plate rework.
pub const DEFAULT_PLATE_FAIL_THRESHOLD: u32 = 20;

/// Default fold-dilution used when setting up FA plates for reworked
/// libraries.
pub const DEFAULT_REDO_DILUTION_FACTOR: f64 = 5.0;

/// Library size threshold (bp) prefilled into the second-attempt
/// thresholds template.
pub const DEFAULT_SIZE_THRESHOLD_BP: f64 = 530.0;

/// Timestamp format used for archived ledger snapshots.
pub const ARCHIVE_TIMESTAMP_FORMAT: &str = "%Y_%m_%d-Time%H-%M-%S";

/// Name of the sample ledger table and its SQLite file.
pub const LEDGER_TABLE: &str = "project_summary";
pub const LEDGER_DB_FILE: &str = "project_summary.db";
pub const LEDGER_CSV_FILE: &str = "project_summary.csv";

/// Per-plate QC thresholds, consumed by every FA analysis stage.
pub const THRESHOLDS_FILE: &str = "thresholds.txt";

/// Reduced summaries written by the FA analysis stages, and the
/// (possibly hand-edited) copies consumed by later stages.
pub const FIRST_SUMMARY_FILE: &str = "reduced_fa_analysis_summary.txt";
pub const FIRST_UPDATED_SUMMARY_FILE: &str = "updated_fa_analysis_summary.txt";
pub const SECOND_SUMMARY_FILE: &str = "reduced_2nd_fa_analysis_summary.txt";
pub const SECOND_UPDATED_SUMMARY_FILE: &str = "updated_2nd_fa_analysis_summary.txt";
pub const DOUBLE_FAILED_FILE: &str = "double_failed_libraries.txt";
