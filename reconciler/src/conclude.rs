//! Final reconciliation and ESP smear output.
//!
//! The conclusion stage folds the operator's last reviewed summary into
//! the ledger, enforces the attempt-accounting invariants, selects pool
//! sources, and writes one ESP smear upload file per destination plate.

use itertools::Itertools;
use log::info;
use serde::Serialize;
use std::path::{Path, PathBuf};

use sps_types::constants::{FIRST_UPDATED_SUMMARY_FILE, SECOND_UPDATED_SUMMARY_FILE};
use sps_types::{ReconcileError, ReconcileResult, SampleRecord};

use crate::summary;

/// Which updated summary concludes the project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdatedSummary {
    /// No rework happened; the first-attempt summary is final.
    FirstAttemptOnly(PathBuf),
    /// A second attempt happened; its summary carries the attempt totals.
    SecondAttempt(PathBuf),
}

/// Locate the updated summary to conclude from.
///
/// A second-attempt results directory takes precedence; if it exists, its
/// updated summary must too (an existing directory with the file missing
/// means the second analysis was never reviewed, which is fatal rather
/// than something to silently fall back from).
pub fn find_updated_summary(
    first_dir: &Path,
    second_dir: &Path,
) -> ReconcileResult<UpdatedSummary> {
    if second_dir.exists() {
        let path = second_dir.join(SECOND_UPDATED_SUMMARY_FILE);
        if !path.exists() {
            return Err(ReconcileError::MissingInput { path });
        }
        Ok(UpdatedSummary::SecondAttempt(path))
    } else if first_dir.exists() {
        let path = first_dir.join(FIRST_UPDATED_SUMMARY_FILE);
        if !path.exists() {
            return Err(ReconcileError::MissingInput { path });
        }
        Ok(UpdatedSummary::FirstAttemptOnly(path))
    } else {
        Err(ReconcileError::MissingInput {
            path: first_dir.to_path_buf(),
        })
    }
}

/// Merge the chosen updated summary into the ledger and settle the
/// attempt accounting for every sample.
pub fn reconcile_final(
    ledger: &mut [SampleRecord],
    chosen: &UpdatedSummary,
) -> ReconcileResult<()> {
    match chosen {
        UpdatedSummary::FirstAttemptOnly(path) => {
            info!("concluding from first-attempt summary {}", path.display());
            let rows = summary::read_first_summary(path)?;
            summary::merge_first_summary(ledger, &rows)?;
            // No second attempt happened anywhere: synthesize the redo
            // placeholders so the final schema is uniform.
            for rec in ledger.iter_mut() {
                rec.synthesize_redo_placeholders();
            }
        }
        UpdatedSummary::SecondAttempt(path) => {
            info!("concluding from second-attempt summary {}", path.display());
            let rows = summary::read_redo_summary(path)?;
            summary::merge_redo_summary(ledger, &rows)?;
            check_accounting(ledger)?;
        }
    }

    // Either path above must leave every sample with a settled total.
    for rec in ledger.iter() {
        if rec.total_passed_attempts.is_none() {
            return Err(ReconcileError::NullAttemptCount {
                sample_id: rec.sample_id.clone(),
            });
        }
    }
    Ok(())
}

/// The accounting identity: the summary's attempt total must equal the
/// sum of the per-attempt pass flags. A mismatch means the hand-edited
/// summary changed one without the other.
fn check_accounting(ledger: &[SampleRecord]) -> ReconcileResult<()> {
    for rec in ledger {
        let total = rec
            .total_passed_attempts
            .ok_or_else(|| ReconcileError::NullAttemptCount {
                sample_id: rec.sample_id.clone(),
            })?;
        let sum = rec.computed_total();
        if total != sum {
            return Err(ReconcileError::AccountingMismatch {
                sample_id: rec.sample_id.clone(),
                total,
                sum,
            });
        }
    }
    Ok(())
}

const ESP_RANGE: &str = "400 bp to 800 bp";
const ESP_PCT_TOTAL: u32 = 15;
const ESP_PCT_CV: u32 = 20;
const ESP_VOLUME_UL: u32 = 20;
const ESP_PCR_CYCLES: u32 = 12;
const ESP_FAILURE_MODE: &str = "Sample Problem";

#[derive(Serialize)]
struct EspSmearRow<'a> {
    #[serde(rename = "Well")]
    well: &'a str,
    #[serde(rename = "Sample ID")]
    sample_id: &'a str,
    #[serde(rename = "Range")]
    range: &'a str,
    #[serde(rename = "ng/uL")]
    conc_ng_per_ul: f64,
    #[serde(rename = "%Total")]
    pct_total: u32,
    #[serde(rename = "nmole/L")]
    conc_nmol_per_l: f64,
    #[serde(rename = "Avg. Size")]
    avg_size_bp: f64,
    #[serde(rename = "%CV")]
    pct_cv: u32,
    #[serde(rename = "Volume uL")]
    volume_ul: u32,
    #[serde(rename = "QC Result")]
    qc_result: &'a str,
    #[serde(rename = "Failure Mode")]
    failure_mode: &'a str,
    #[serde(rename = "Index Name")]
    index_name: &'a str,
    #[serde(rename = "PCR Cycles")]
    pcr_cycles: u32,
}

/// Write one ESP smear upload file per destination plate, built from the
/// pool columns. Returns the files written.
pub fn write_esp_files(dir: &Path, ledger: &[SampleRecord]) -> ReconcileResult<Vec<PathBuf>> {
    let plates: Vec<&str> = ledger
        .iter()
        .map(|rec| rec.destination_plate_barcode.as_str())
        .unique()
        .sorted()
        .collect();

    let mut written = Vec::with_capacity(plates.len());
    for plate in plates {
        let path = dir.join(format!("ESP_smear_file_for_upload_{plate}.txt"));
        let mut wtr = csv::WriterBuilder::new().delimiter(b'\t').from_path(&path)?;
        for rec in ledger
            .iter()
            .filter(|rec| rec.destination_plate_barcode == plate)
        {
            let passed = rec.total_passed_attempts.unwrap_or(0) >= 1;
            wtr.serialize(EspSmearRow {
                well: &rec.destination_well,
                sample_id: &rec.illumina_library,
                range: ESP_RANGE,
                conc_ng_per_ul: rec.pool_conc_ng_per_ul.unwrap_or(0.0),
                pct_total: ESP_PCT_TOTAL,
                conc_nmol_per_l: rec.pool_conc_nmol_per_l.unwrap_or(0.0),
                avg_size_bp: rec.pool_avg_size_bp.unwrap_or(0.0),
                pct_cv: ESP_PCT_CV,
                volume_ul: ESP_VOLUME_UL,
                qc_result: if passed { "Pass" } else { "Fail" },
                failure_mode: if passed { "" } else { ESP_FAILURE_MODE },
                index_name: rec.pool_illumina_index.as_deref().unwrap_or(""),
                pcr_cycles: ESP_PCR_CYCLES,
            })?;
        }
        wtr.flush()?;
        info!("wrote ESP smear file {}", path.display());
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pooling::select_pool_sources;
    use crate::summary::{FirstSummaryRow, RedoSummaryRow};
    use std::fs;

    fn ledger_sample(id: &str, plate: &str, well: &str) -> SampleRecord {
        SampleRecord {
            sample_id: id.to_string(),
            illumina_library: format!("Lib_{id}"),
            destination_plate_barcode: plate.to_string(),
            destination_well: well.to_string(),
            illumina_index_set: "SetA".into(),
            illumina_index: format!("A{id}"),
            ..Default::default()
        }
    }

    #[test]
    fn second_attempt_summary_takes_precedence_and_must_exist() {
        let tmp = tempfile::tempdir().unwrap();
        let first = tmp.path().join("B_first_attempt_fa_result");
        let second = tmp.path().join("D_second_attempt_fa_result");
        fs::create_dir_all(&first).unwrap();
        fs::create_dir_all(&second).unwrap();
        fs::write(first.join(FIRST_UPDATED_SUMMARY_FILE), "x").unwrap();

        // Second dir exists but its summary is missing: fatal, never a
        // fallback to the first-attempt file.
        assert!(matches!(
            find_updated_summary(&first, &second),
            Err(ReconcileError::MissingInput { .. })
        ));

        fs::write(second.join(SECOND_UPDATED_SUMMARY_FILE), "x").unwrap();
        assert!(matches!(
            find_updated_summary(&first, &second).unwrap(),
            UpdatedSummary::SecondAttempt(_)
        ));

        fs::remove_dir_all(&second).unwrap();
        assert!(matches!(
            find_updated_summary(&first, &second).unwrap(),
            UpdatedSummary::FirstAttemptOnly(_)
        ));
    }

    #[test]
    fn inconsistent_hand_edit_fails_the_accounting_check() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(SECOND_UPDATED_SUMMARY_FILE);

        let mut rec = ledger_sample("S1", "P1", "A1");
        rec.passed_first_attempt = Some(0);
        rec.passed_redo_attempt = Some(0);
        let mut ledger = vec![rec];

        // Operator bumped the total without flipping a pass flag.
        let row = RedoSummaryRow {
            total_passed_attempts: Some(1),
            ..RedoSummaryRow::from_record(&ledger[0])
        };
        fs::write(
            &path,
            {
                let mut w = csv::WriterBuilder::new().delimiter(b'\t').from_writer(vec![]);
                w.serialize(&row).unwrap();
                String::from_utf8(w.into_inner().unwrap()).unwrap()
            },
        )
        .unwrap();

        let err = reconcile_final(&mut ledger, &UpdatedSummary::SecondAttempt(path)).unwrap_err();
        assert!(matches!(
            err,
            ReconcileError::AccountingMismatch {
                total: 1,
                sum: 0,
                ..
            }
        ));
    }

    // The canonical first-attempt-only project: S1/S2 pass, S3/S4 fail on
    // size, nothing reaches the rework threshold, and the conclusion is
    // drawn from the first-attempt summary alone.
    #[test]
    fn first_attempt_only_project_concludes_end_to_end() {
        let tmp = tempfile::tempdir().unwrap();
        let first = tmp.path().join("B_first_attempt_fa_result");
        let second = tmp.path().join("D_second_attempt_fa_result");
        fs::create_dir_all(&first).unwrap();

        let mut ledger: Vec<SampleRecord> = ["S1", "S2", "S3", "S4"]
            .iter()
            .enumerate()
            .map(|(i, id)| ledger_sample(id, "P1", &format!("A{}", i + 1)))
            .collect();

        let rows: Vec<FirstSummaryRow> = ledger
            .iter()
            .enumerate()
            .map(|(i, rec)| FirstSummaryRow {
                sample_id: rec.sample_id.clone(),
                destination_plate_barcode: rec.destination_plate_barcode.clone(),
                fa_well: Some(format!("A{}", i + 1)),
                dilution_factor: Some(5.0),
                conc_ng_per_ul: Some(20.0),
                conc_nmol_per_l: Some(25.0),
                avg_size_bp: Some(if i < 2 { 600.0 } else { 400.0 }),
                passed_library: Some(u8::from(i < 2)),
                redo_whole_plate: Some(false),
            })
            .collect();
        {
            let mut wtr = csv::WriterBuilder::new()
                .delimiter(b'\t')
                .from_path(first.join(FIRST_UPDATED_SUMMARY_FILE))
                .unwrap();
            for row in &rows {
                wtr.serialize(row).unwrap();
            }
        }

        let chosen = find_updated_summary(&first, &second).unwrap();
        assert!(matches!(chosen, UpdatedSummary::FirstAttemptOnly(_)));
        reconcile_final(&mut ledger, &chosen).unwrap();

        let totals: Vec<u8> = ledger
            .iter()
            .map(|rec| rec.total_passed_attempts.unwrap())
            .collect();
        assert_eq!(totals, vec![1, 1, 0, 0]);
        for rec in &ledger {
            assert_eq!(rec.passed_redo_attempt, Some(0));
            assert_eq!(rec.redo_destination_plate_barcode, None);
            assert_eq!(rec.redo_conc_ng_per_ul, None);
        }

        select_pool_sources(&mut ledger);
        let esp_dir = tmp.path().join("A_smear_file_for_ESP_upload");
        fs::create_dir_all(&esp_dir).unwrap();
        let files = write_esp_files(&esp_dir, &ledger).unwrap();
        assert_eq!(files.len(), 1);

        let text = fs::read_to_string(&files[0]).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "Well\tSample ID\tRange\tng/uL\t%Total\tnmole/L\tAvg. Size\t%CV\t\
             Volume uL\tQC Result\tFailure Mode\tIndex Name\tPCR Cycles"
        );
        assert_eq!(
            lines[1],
            "A1\tLib_S1\t400 bp to 800 bp\t20.0\t15\t25.0\t600.0\t20\t20\tPass\t\tAS1\t12"
        );
        assert_eq!(
            lines[3],
            "A3\tLib_S3\t400 bp to 800 bp\t0.0\t15\t0.0\t0.0\t20\t20\tFail\tSample Problem\tAS3\t12"
        );
    }
}
