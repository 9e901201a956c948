//! Second-attempt (redo) QC reconciliation.
//!
//! Mirrors the first-attempt logic for the redo columns, then settles the
//! per-sample accounting: `total_passed_attempts` becomes the null-safe
//! sum of the two pass flags for every sample in the project, and samples
//! on a measured redo plate that still total zero are collected into the
//! double-failed report.

use log::{info, warn};
use std::collections::HashSet;

use fa_import::QcRecord;
use sps_types::{ReconcileResult, SampleRecord};

use crate::decision::DecisionProvider;
use crate::merge::{merge_rows, Coverage};
use crate::round3;
use crate::thresholds::ThresholdSet;

/// Sample ids that failed both attempts, in ledger order.
#[derive(Debug, Default)]
pub struct SecondAttemptOutcome {
    pub double_failed: Vec<String>,
}

/// Apply redo QC results to the ledger.
///
/// `measured_plates` are the redo plate barcodes the importer actually
/// found FA exports for. Pass/fail is only decided for samples on those
/// plates; every other sample gets an explicit redo fail flag so the
/// attempt total is well defined project-wide.
pub fn apply_second_attempt(
    ledger: &mut [SampleRecord],
    qc: &[QcRecord],
    measured_plates: &[String],
    thresholds: &ThresholdSet,
    decisions: &mut dyn DecisionProvider,
) -> ReconcileResult<SecondAttemptOutcome> {
    thresholds.reconcile_redo_dilution(ledger, decisions)?;

    // Redo QC covers only the reworked plates.
    merge_rows(
        ledger,
        qc,
        |q| &q.sample_id,
        "second-attempt QC results",
        Coverage::Subset,
        |rec, q| {
            rec.redo_fa_well = Some(q.fa_well.clone());
            rec.redo_conc_ng_per_ul = Some(q.conc_ng_per_ul);
            rec.redo_conc_nmol_per_l = Some(q.conc_nmol_per_l);
            rec.redo_avg_size_bp = Some(q.avg_size_bp);
        },
    )?;

    let measured: HashSet<&str> = measured_plates.iter().map(String::as_str).collect();
    let mut outcome = SecondAttemptOutcome::default();

    for rec in ledger.iter_mut() {
        let redo_plate = rec
            .redo_destination_plate_barcode
            .clone()
            .filter(|p| measured.contains(p.as_str()));

        if let Some(plate) = redo_plate {
            let thr = thresholds.get(&plate)?;
            let raw_nmol = rec.redo_conc_nmol_per_l.unwrap_or(0.0);
            let raw_size = rec.redo_avg_size_bp.unwrap_or(0.0);
            let passed =
                raw_nmol > thr.conc_threshold_nmol_per_l && raw_size > thr.size_threshold_bp;
            rec.passed_redo_attempt = Some(u8::from(passed));
            rec.redo_dilution_factor = Some(thr.dilution_factor);
            rec.redo_conc_ng_per_ul =
                rec.redo_conc_ng_per_ul.map(|v| round3(v * thr.dilution_factor));
            rec.redo_conc_nmol_per_l =
                rec.redo_conc_nmol_per_l.map(|v| round3(v * thr.dilution_factor));

            rec.total_passed_attempts = Some(rec.computed_total());
            if rec.computed_total() == 0 {
                outcome.double_failed.push(rec.sample_id.clone());
            }
        } else {
            // Not on a measured redo plate: no second attempt happened.
            rec.passed_redo_attempt = Some(rec.passed_redo());
            rec.total_passed_attempts = Some(rec.computed_total());
        }
    }

    if outcome.double_failed.is_empty() {
        info!("no libraries failed both attempts");
    } else {
        warn!(
            "{} libraries failed both attempts",
            outcome.double_failed.len()
        );
    }
    Ok(outcome)
}
