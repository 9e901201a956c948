//! Whole-plate rework assignment.
//!
//! Takes the ledger after first-attempt analysis, selects every sample on
//! a plate flagged for rework, and fills the redo columns: a fresh plate
//! barcode, the same wells and Illumina indexes as the first attempt, and
//! the operator's chosen FA dilution. Also emits the thresholds template
//! the operator completes before the second FA analysis. Liquid-handler
//! transfer files and barcode labels are produced by external tooling.

use itertools::Itertools;
use log::info;
use std::path::Path;

use sps_types::constants::{DEFAULT_REDO_DILUTION_FACTOR, DEFAULT_SIZE_THRESHOLD_BP};
use sps_types::{ReconcileResult, SampleRecord};

use crate::decision::DecisionProvider;
use crate::thresholds::THRESHOLD_HEADERS;

/// The plates assigned for a second attempt.
#[derive(Debug)]
pub struct ReworkOutcome {
    /// New redo plate barcodes, sorted.
    pub redo_plates: Vec<String>,
    /// Fold-dilution the operator will use for the redo FA plates.
    pub redo_dilution_factor: f64,
}

/// Next barcode in a plate's rework series: `P1` becomes `P1.2`, `P1.2`
/// becomes `P1.3`.
pub fn next_plate_barcode(barcode: &str) -> String {
    match barcode.split_once('.') {
        Some((base, n)) => match n.parse::<u32>() {
            Ok(n) => format!("{base}.{}", n + 1),
            Err(_) => format!("{barcode}.2"),
        },
        None => format!("{barcode}.2"),
    }
}

/// Fill the redo columns for every sample on a reworked plate.
///
/// Returns `None` when no plate was flagged: the no-rework terminal case,
/// where the workflow skips the second-attempt stages entirely.
pub fn assign_rework(
    ledger: &mut [SampleRecord],
    decisions: &mut dyn DecisionProvider,
) -> ReconcileResult<Option<ReworkOutcome>> {
    let flagged_plates: Vec<String> = ledger
        .iter()
        .filter(|rec| rec.is_whole_plate_redo())
        .map(|rec| rec.destination_plate_barcode.clone())
        .unique()
        .sorted()
        .collect();

    if flagged_plates.is_empty() {
        info!("no plates flagged for rework; skipping second-attempt stages");
        return Ok(None);
    }

    let redo_dilution_factor = decisions.prompt_float(
        "What is the desired fold-dilution for libraries loaded into the FA plate?",
        DEFAULT_REDO_DILUTION_FACTOR,
    )?;

    for rec in ledger.iter_mut() {
        if !rec.is_whole_plate_redo() {
            continue;
        }
        rec.redo_destination_plate_barcode =
            Some(next_plate_barcode(&rec.destination_plate_barcode));
        // Same physical layout and indexes as the first attempt.
        rec.redo_destination_well = Some(rec.destination_well.clone());
        rec.redo_fa_well = rec.fa_well.clone();
        rec.redo_illumina_index_set = Some(rec.illumina_index_set.clone());
        rec.redo_illumina_index = Some(rec.illumina_index.clone());
        rec.redo_dilution_factor = Some(redo_dilution_factor);
    }

    let redo_plates: Vec<String> = flagged_plates
        .iter()
        .map(|p| next_plate_barcode(p))
        .collect();
    info!(
        "assigned rework plates: {}",
        flagged_plates
            .iter()
            .zip(&redo_plates)
            .map(|(a, b)| format!("{a} -> {b}"))
            .join(", ")
    );
    Ok(Some(ReworkOutcome {
        redo_plates,
        redo_dilution_factor,
    }))
}

/// Write the second-attempt `thresholds.txt` template: dilution factor
/// filled in, size threshold prefilled, concentration threshold left for
/// the operator.
pub fn write_thresholds_template(
    path: &Path,
    redo_plates: &[String],
    dilution_factor: f64,
) -> ReconcileResult<()> {
    let mut wtr = csv::WriterBuilder::new().delimiter(b'\t').from_path(path)?;
    wtr.write_record(THRESHOLD_HEADERS)?;
    let size = DEFAULT_SIZE_THRESHOLD_BP.to_string();
    let dilution = dilution_factor.to_string();
    for plate in redo_plates {
        wtr.write_record([plate.as_str(), "", size.as_str(), dilution.as_str()])?;
    }
    wtr.flush()?;
    Ok(())
}
