//! The per-sample ledger row.
//!
//! One `SampleRecord` tracks a physical sample through both
//! library-construction attempts. Column names in the serialized form
//! match the legacy `project_summary` schema exactly, so the CSV mirror
//! stays byte-compatible with files produced by earlier tooling.

use serde::{Deserialize, Serialize};

/// One row of the project ledger.
///
/// Fields for stages that have not run yet are `None` and serialize to
/// empty cells, so the schema is uniform at every stage of the workflow.
/// Pass flags use the ledger's numeric 0/1 convention rather than bools.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SampleRecord {
    /// Unique key, stable across all workflow stages.
    pub sample_id: String,

    #[serde(rename = "Illumina Library")]
    pub illumina_library: String,

    /// Origin plate and well the sample was drawn from.
    #[serde(rename = "plate_id")]
    pub source_plate_id: String,
    pub echo_id: String,
    pub source_well: String,

    /// First-attempt library plate location.
    #[serde(rename = "Destination_Plate_Barcode")]
    pub destination_plate_barcode: String,
    #[serde(rename = "Destination_Well")]
    pub destination_well: String,

    #[serde(rename = "Illumina_index_set")]
    pub illumina_index_set: String,
    #[serde(rename = "Illumina_index")]
    pub illumina_index: String,

    /// Fold-dilution used when loading the first-attempt FA plate.
    pub dilution_factor: Option<f64>,

    /// First-attempt QC measurements. Concentrations are stored
    /// dilution-corrected; the raw instrument reading is only held in
    /// memory while the pass/fail decision is made.
    #[serde(rename = "FA_Well")]
    pub fa_well: Option<String>,
    #[serde(rename = "ng/uL")]
    pub conc_ng_per_ul: Option<f64>,
    #[serde(rename = "nmole/L")]
    pub conc_nmol_per_l: Option<f64>,
    #[serde(rename = "Avg. Size")]
    pub avg_size_bp: Option<f64>,

    #[serde(rename = "Passed_library")]
    pub passed_first_attempt: Option<u8>,

    /// True for every sample on a plate whose failed-library count
    /// reached the rework threshold, regardless of the sample's own
    /// pass/fail outcome.
    #[serde(rename = "Redo_whole_plate")]
    pub redo_whole_plate: Option<bool>,

    /// Second-attempt (redo) mirror attributes. Populated by the rework
    /// stage only for samples on reworked plates.
    #[serde(rename = "Redo_Destination_Plate_Barcode")]
    pub redo_destination_plate_barcode: Option<String>,
    #[serde(rename = "Redo_Destination_Well")]
    pub redo_destination_well: Option<String>,
    #[serde(rename = "Redo_FA_Well")]
    pub redo_fa_well: Option<String>,
    #[serde(rename = "Redo_Illumina_index_set")]
    pub redo_illumina_index_set: Option<String>,
    #[serde(rename = "Redo_Illumina_index")]
    pub redo_illumina_index: Option<String>,
    #[serde(rename = "Redo_dilution_factor")]
    pub redo_dilution_factor: Option<f64>,
    #[serde(rename = "Redo_ng/uL")]
    pub redo_conc_ng_per_ul: Option<f64>,
    #[serde(rename = "Redo_nmole/L")]
    pub redo_conc_nmol_per_l: Option<f64>,
    #[serde(rename = "Redo_Avg. Size")]
    pub redo_avg_size_bp: Option<f64>,
    #[serde(rename = "Redo_Passed_library")]
    pub passed_redo_attempt: Option<u8>,

    /// Null-safe sum of the two pass flags; always 0, 1 or 2 once
    /// reconciliation has run.
    #[serde(rename = "Total_passed_attempts")]
    pub total_passed_attempts: Option<u8>,

    /// Pool-source attributes: mirrors of whichever attempt was selected
    /// to supply material into downstream pooling.
    #[serde(rename = "Pool_source_plate")]
    pub pool_source_plate: Option<String>,
    #[serde(rename = "Pool_source_well")]
    pub pool_source_well: Option<String>,
    #[serde(rename = "Pool_Illumina_index_set")]
    pub pool_illumina_index_set: Option<String>,
    #[serde(rename = "Pool_Illumina_index")]
    pub pool_illumina_index: Option<String>,
    #[serde(rename = "Pool_dilution_factor")]
    pub pool_dilution_factor: Option<f64>,
    #[serde(rename = "Pool_DNA_conc_ng/uL")]
    pub pool_conc_ng_per_ul: Option<f64>,
    #[serde(rename = "Pool_nmole/L")]
    pub pool_conc_nmol_per_l: Option<f64>,
    #[serde(rename = "Pool_Avg. Size")]
    pub pool_avg_size_bp: Option<f64>,
}

impl SampleRecord {
    /// First-attempt pass flag, treating "not yet tested" as failed.
    pub fn passed_first(&self) -> u8 {
        self.passed_first_attempt.unwrap_or(0)
    }

    /// Redo-attempt pass flag, treating "no second attempt" as failed.
    pub fn passed_redo(&self) -> u8 {
        self.passed_redo_attempt.unwrap_or(0)
    }

    /// The attempt count implied by the two pass flags. Must equal
    /// `total_passed_attempts` after reconciliation.
    pub fn computed_total(&self) -> u8 {
        self.passed_first() + self.passed_redo()
    }

    pub fn is_whole_plate_redo(&self) -> bool {
        self.redo_whole_plate == Some(true)
    }

    /// Fill the redo columns with placeholders for a run where no plate
    /// triggered rework, so downstream consumers see a uniform schema.
    /// `total_passed_attempts` collapses to the first-attempt flag.
    pub fn synthesize_redo_placeholders(&mut self) {
        self.passed_redo_attempt = Some(0);
        self.redo_destination_plate_barcode = None;
        self.redo_destination_well = None;
        self.redo_fa_well = None;
        self.redo_illumina_index_set = None;
        self.redo_illumina_index = None;
        self.redo_dilution_factor = None;
        self.redo_conc_ng_per_ul = None;
        self.redo_conc_nmol_per_l = None;
        self.redo_avg_size_bp = None;
        self.total_passed_attempts = Some(self.passed_first());
    }
}
