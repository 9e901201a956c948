//! First-attempt QC reconciliation.
//!
//! Folds the imported FA results into the ledger, decides pass/fail per
//! sample against the plate's thresholds, corrects concentrations for the
//! plate dilution, and flags whole plates for rework when too many of
//! their libraries failed.

use log::info;
use std::collections::HashMap;

use fa_import::QcRecord;
use itertools::Itertools;
use sps_types::constants::DEFAULT_PLATE_FAIL_THRESHOLD;
use sps_types::{ReconcileResult, SampleRecord};

use crate::decision::DecisionProvider;
use crate::merge::{merge_rows, Coverage};
use crate::round3;
use crate::thresholds::ThresholdSet;

/// Apply first-attempt QC results to the ledger. Returns the plates
/// flagged for whole-plate rework, sorted; an empty list is the no-rework
/// terminal case.
///
/// The pass/fail decision uses the undiluted instrument reading; only the
/// stored concentrations are scaled by the plate's dilution factor. The
/// ordering matters: scaling first would change which samples pass.
pub fn apply_first_attempt(
    ledger: &mut [SampleRecord],
    qc: &[QcRecord],
    thresholds: &ThresholdSet,
    decisions: &mut dyn DecisionProvider,
) -> ReconcileResult<Vec<String>> {
    // First-attempt FA covers the whole project, so the QC set must line
    // up with the ledger one to one.
    merge_rows(
        ledger,
        qc,
        |q| &q.sample_id,
        "first-attempt QC results",
        Coverage::FullLedger,
        |rec, q| {
            rec.fa_well = Some(q.fa_well.clone());
            rec.conc_ng_per_ul = Some(q.conc_ng_per_ul);
            rec.conc_nmol_per_l = Some(q.conc_nmol_per_l);
            rec.avg_size_bp = Some(q.avg_size_bp);
        },
    )?;

    for rec in ledger.iter_mut() {
        let thr = thresholds.get(&rec.destination_plate_barcode)?;
        let raw_nmol = rec.conc_nmol_per_l.unwrap_or(0.0);
        let raw_size = rec.avg_size_bp.unwrap_or(0.0);
        // Strict comparisons: a reading exactly at threshold fails.
        let passed =
            raw_nmol > thr.conc_threshold_nmol_per_l && raw_size > thr.size_threshold_bp;
        rec.passed_first_attempt = Some(u8::from(passed));
        rec.dilution_factor = Some(thr.dilution_factor);
        rec.conc_ng_per_ul = rec.conc_ng_per_ul.map(|v| round3(v * thr.dilution_factor));
        rec.conc_nmol_per_l = rec.conc_nmol_per_l.map(|v| round3(v * thr.dilution_factor));
    }

    let fail_threshold = decisions.prompt_count(
        "How many failed libraries per plate trigger whole-plate rework?",
        DEFAULT_PLATE_FAIL_THRESHOLD,
    )?;

    let mut failed_per_plate: HashMap<&str, u32> = HashMap::new();
    for rec in ledger.iter() {
        if rec.passed_first() == 0 {
            *failed_per_plate
                .entry(rec.destination_plate_barcode.as_str())
                .or_insert(0) += 1;
        }
    }
    let reworked: Vec<String> = failed_per_plate
        .iter()
        .filter(|&(_, &n)| n >= fail_threshold)
        .map(|(plate, _)| (*plate).to_string())
        .sorted()
        .collect();

    // A plate-level decision overrides sample-level status: every sample
    // on a reworked plate is flagged, passing ones included.
    for rec in ledger.iter_mut() {
        rec.redo_whole_plate = Some(reworked.binary_search(&rec.destination_plate_barcode).is_ok());
    }

    if reworked.is_empty() {
        info!("no plate reached {fail_threshold} failed libraries; no rework needed");
    } else {
        info!("plates flagged for whole-plate rework: {}", reworked.iter().join(", "));
    }
    Ok(reworked)
}
