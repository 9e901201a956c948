//! Reduced FA analysis summaries.
//!
//! Each analysis stage writes a tab-delimited "reduced" summary that the
//! operator reviews, optionally hand-edits, and saves back as the
//! `updated_*` copy. The updated copy is an override source: its
//! pass/fail and dilution columns are authoritative when merged back
//! into the ledger, since they may encode decisions the instrument could
//! not make (e.g. failing a library with suspicious traces).

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::path::Path;

use sps_types::{ReconcileError, ReconcileResult, SampleRecord};

use crate::merge::OverridePolicy::{PreferIfPresent, PreferIncoming};
use crate::merge::{merge_rows, Coverage};

/// One row of the first-attempt reduced summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirstSummaryRow {
    pub sample_id: String,
    #[serde(rename = "Destination_Plate_Barcode")]
    pub destination_plate_barcode: String,
    #[serde(rename = "FA_Well")]
    pub fa_well: Option<String>,
    pub dilution_factor: Option<f64>,
    #[serde(rename = "ng/uL")]
    pub conc_ng_per_ul: Option<f64>,
    #[serde(rename = "nmole/L")]
    pub conc_nmol_per_l: Option<f64>,
    #[serde(rename = "Avg. Size")]
    pub avg_size_bp: Option<f64>,
    #[serde(rename = "Passed_library")]
    pub passed_library: Option<u8>,
    #[serde(rename = "Redo_whole_plate")]
    pub redo_whole_plate: Option<bool>,
}

impl FirstSummaryRow {
    pub fn from_record(rec: &SampleRecord) -> FirstSummaryRow {
        FirstSummaryRow {
            sample_id: rec.sample_id.clone(),
            destination_plate_barcode: rec.destination_plate_barcode.clone(),
            fa_well: rec.fa_well.clone(),
            dilution_factor: rec.dilution_factor,
            conc_ng_per_ul: rec.conc_ng_per_ul,
            conc_nmol_per_l: rec.conc_nmol_per_l,
            avg_size_bp: rec.avg_size_bp,
            passed_library: rec.passed_first_attempt,
            redo_whole_plate: rec.redo_whole_plate,
        }
    }
}

/// One row of the second-attempt (redo) reduced summary. Also the schema
/// of the double-failed report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedoSummaryRow {
    pub sample_id: String,
    #[serde(rename = "Redo_Destination_Plate_Barcode")]
    pub redo_destination_plate_barcode: Option<String>,
    #[serde(rename = "Redo_FA_Well")]
    pub redo_fa_well: Option<String>,
    #[serde(rename = "Redo_dilution_factor")]
    pub redo_dilution_factor: Option<f64>,
    #[serde(rename = "Redo_ng/uL")]
    pub redo_conc_ng_per_ul: Option<f64>,
    #[serde(rename = "Redo_nmole/L")]
    pub redo_conc_nmol_per_l: Option<f64>,
    #[serde(rename = "Redo_Avg. Size")]
    pub redo_avg_size_bp: Option<f64>,
    #[serde(rename = "Redo_Passed_library")]
    pub redo_passed_library: Option<u8>,
    #[serde(rename = "Total_passed_attempts")]
    pub total_passed_attempts: Option<u8>,
}

impl RedoSummaryRow {
    pub fn from_record(rec: &SampleRecord) -> RedoSummaryRow {
        RedoSummaryRow {
            sample_id: rec.sample_id.clone(),
            redo_destination_plate_barcode: rec.redo_destination_plate_barcode.clone(),
            redo_fa_well: rec.redo_fa_well.clone(),
            redo_dilution_factor: rec.redo_dilution_factor,
            redo_conc_ng_per_ul: rec.redo_conc_ng_per_ul,
            redo_conc_nmol_per_l: rec.redo_conc_nmol_per_l,
            redo_avg_size_bp: rec.redo_avg_size_bp,
            redo_passed_library: rec.passed_redo_attempt,
            total_passed_attempts: rec.total_passed_attempts,
        }
    }
}

fn write_rows<S: Serialize>(path: &Path, rows: &[S]) -> ReconcileResult<()> {
    let mut wtr = csv::WriterBuilder::new().delimiter(b'\t').from_path(path)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

fn read_rows<R: for<'de> Deserialize<'de>>(path: &Path) -> ReconcileResult<Vec<R>> {
    if !path.exists() {
        return Err(ReconcileError::MissingInput {
            path: path.to_path_buf(),
        });
    }
    let mut rdr = csv::ReaderBuilder::new().delimiter(b'\t').from_path(path)?;
    rdr.deserialize().collect::<Result<_, _>>().map_err(Into::into)
}

/// Write the first-attempt reduced summary, sorted by plate then sample.
pub fn write_first_summary(path: &Path, ledger: &[SampleRecord]) -> ReconcileResult<()> {
    let rows: Vec<FirstSummaryRow> = ledger
        .iter()
        .map(FirstSummaryRow::from_record)
        .sorted_by(|a, b| {
            (&a.destination_plate_barcode, &a.sample_id)
                .cmp(&(&b.destination_plate_barcode, &b.sample_id))
        })
        .collect();
    write_rows(path, &rows)
}

pub fn read_first_summary(path: &Path) -> ReconcileResult<Vec<FirstSummaryRow>> {
    read_rows(path)
}

/// Write the second-attempt reduced summary, sorted by redo plate then
/// sample.
pub fn write_redo_summary(path: &Path, ledger: &[SampleRecord]) -> ReconcileResult<()> {
    let rows: Vec<RedoSummaryRow> = ledger
        .iter()
        .map(RedoSummaryRow::from_record)
        .sorted_by(|a, b| {
            (&a.redo_destination_plate_barcode, &a.sample_id)
                .cmp(&(&b.redo_destination_plate_barcode, &b.sample_id))
        })
        .collect();
    write_rows(path, &rows)
}

pub fn read_redo_summary(path: &Path) -> ReconcileResult<Vec<RedoSummaryRow>> {
    read_rows(path)
}

/// Write the double-failed report: redo-summary rows for the given
/// sample ids.
pub fn write_double_failed(
    path: &Path,
    ledger: &[SampleRecord],
    double_failed: &[String],
) -> ReconcileResult<()> {
    let rows: Vec<RedoSummaryRow> = ledger
        .iter()
        .filter(|rec| double_failed.contains(&rec.sample_id))
        .map(RedoSummaryRow::from_record)
        .collect();
    write_rows(path, &rows)
}

/// Merge a (possibly hand-edited) first-attempt summary into the ledger.
/// Pass/fail and the rework flag are operator-authoritative; measurements
/// fill in only where present.
pub fn merge_first_summary(
    ledger: &mut [SampleRecord],
    rows: &[FirstSummaryRow],
) -> ReconcileResult<()> {
    merge_rows(
        ledger,
        rows,
        |r| &r.sample_id,
        "updated first-attempt summary",
        Coverage::FullLedger,
        |rec, row| {
            rec.fa_well = PreferIfPresent.resolve(rec.fa_well.take(), row.fa_well.clone());
            rec.dilution_factor = PreferIfPresent.resolve(rec.dilution_factor, row.dilution_factor);
            rec.conc_ng_per_ul = PreferIfPresent.resolve(rec.conc_ng_per_ul, row.conc_ng_per_ul);
            rec.conc_nmol_per_l = PreferIfPresent.resolve(rec.conc_nmol_per_l, row.conc_nmol_per_l);
            rec.avg_size_bp = PreferIfPresent.resolve(rec.avg_size_bp, row.avg_size_bp);
            rec.passed_first_attempt =
                PreferIncoming.resolve(rec.passed_first_attempt, row.passed_library);
            rec.redo_whole_plate =
                PreferIncoming.resolve(rec.redo_whole_plate, row.redo_whole_plate);
        },
    )
}

/// Merge a (possibly hand-edited) second-attempt summary into the ledger.
/// The redo pass flag, the attempt total, and the redo dilution factor
/// are operator-authoritative.
pub fn merge_redo_summary(
    ledger: &mut [SampleRecord],
    rows: &[RedoSummaryRow],
) -> ReconcileResult<()> {
    merge_rows(
        ledger,
        rows,
        |r| &r.sample_id,
        "updated second-attempt summary",
        Coverage::FullLedger,
        |rec, row| {
            rec.redo_destination_plate_barcode = PreferIfPresent.resolve(
                rec.redo_destination_plate_barcode.take(),
                row.redo_destination_plate_barcode.clone(),
            );
            rec.redo_fa_well =
                PreferIfPresent.resolve(rec.redo_fa_well.take(), row.redo_fa_well.clone());
            rec.redo_dilution_factor =
                PreferIncoming.resolve(rec.redo_dilution_factor, row.redo_dilution_factor);
            rec.redo_conc_ng_per_ul =
                PreferIfPresent.resolve(rec.redo_conc_ng_per_ul, row.redo_conc_ng_per_ul);
            rec.redo_conc_nmol_per_l =
                PreferIfPresent.resolve(rec.redo_conc_nmol_per_l, row.redo_conc_nmol_per_l);
            rec.redo_avg_size_bp =
                PreferIfPresent.resolve(rec.redo_avg_size_bp, row.redo_avg_size_bp);
            rec.passed_redo_attempt =
                PreferIncoming.resolve(rec.passed_redo_attempt, row.redo_passed_library);
            rec.total_passed_attempts =
                PreferIncoming.resolve(rec.total_passed_attempts, row.total_passed_attempts);
        },
    )
}
