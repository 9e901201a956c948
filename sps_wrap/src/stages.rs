//! The four human-triggered workflow stages.
//!
//! Each stage loads the ledger, runs one reconciliation step, and writes
//! its outputs. The ledger itself is only persisted by the stages whose
//! results are final (rework assignment and conclusion); the analysis
//! stages publish reduced summaries for operator review instead, and the
//! reviewed `updated_*` copies are merged by the following stage.
//!
//! On success each stage drops a marker under `.workflow_status/` for the
//! surrounding workflow manager.

use chrono::Local;
use log::info;
use std::fs;

use ledger::{Archiver, LedgerStore};
use reconciler::conclude::{find_updated_summary, reconcile_final, write_esp_files};
use reconciler::decision::DecisionProvider;
use reconciler::first_attempt::apply_first_attempt;
use reconciler::pooling::select_pool_sources;
use reconciler::rework::{assign_rework, write_thresholds_template};
use reconciler::second_attempt::apply_second_attempt;
use reconciler::summary;
use reconciler::thresholds::ThresholdSet;
use sps_types::ReconcileResult;

use crate::paths::WorkflowPaths;

/// Outcome of the rework stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReworkStatus {
    /// Plates were assigned for a second attempt.
    Assigned { redo_plates: Vec<String> },
    /// Nothing to rework; the workflow proceeds straight to `conclude`.
    NoReworkNeeded,
}

fn ledger_store(paths: &WorkflowPaths) -> LedgerStore {
    LedgerStore::open(&paths.ledger_db(), &paths.ledger_csv())
}

fn write_success_marker(paths: &WorkflowPaths, stage: &str) -> ReconcileResult<()> {
    let dir = paths.status_dir();
    fs::create_dir_all(&dir)?;
    let marker = dir.join(format!("{stage}.success"));
    fs::write(
        &marker,
        format!(
            "SUCCESS: {stage} completed at {}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        ),
    )?;
    info!("success marker created: {}", marker.display());
    Ok(())
}

/// Analyze first-attempt FA results: import the exports, decide pass/fail
/// and whole-plate rework, and publish the reduced summary for review.
/// The ledger is left untouched until the reviewed summary comes back.
pub fn run_first_attempt(
    paths: &WorkflowPaths,
    decisions: &mut dyn DecisionProvider,
) -> ReconcileResult<()> {
    let mut records = ledger_store(paths).load()?;
    let import = fa_import::import_attempt(&paths.first_fa_dir())?;
    let thresholds = ThresholdSet::load(&paths.first_thresholds())?;

    let reworked = apply_first_attempt(&mut records, &import.records, &thresholds, decisions)?;
    summary::write_first_summary(&paths.first_summary(), &records)?;
    info!(
        "first-attempt analysis complete: {} samples, {} plates flagged for rework",
        records.len(),
        reworked.len()
    );

    write_success_marker(paths, "first_attempt")
}

/// Merge the reviewed first-attempt summary and assign whole-plate
/// rework: new plate barcodes, redo wells/indexes, and the second-attempt
/// thresholds template. Persists the ledger when rework was assigned.
pub fn run_rework(
    paths: &WorkflowPaths,
    decisions: &mut dyn DecisionProvider,
) -> ReconcileResult<ReworkStatus> {
    let store = ledger_store(paths);
    let mut records = store.load()?;

    let rows = summary::read_first_summary(&paths.first_updated_summary())?;
    summary::merge_first_summary(&mut records, &rows)?;

    let Some(outcome) = assign_rework(&mut records, decisions)? else {
        // First-attempt-only project: the conclude stage reads the
        // reviewed summary directly, so the ledger stays as it is.
        write_success_marker(paths, "rework")?;
        return Ok(ReworkStatus::NoReworkNeeded);
    };

    fs::create_dir_all(paths.second_lib_dir())?;
    fs::create_dir_all(paths.second_fa_dir())?;
    write_thresholds_template(
        &paths.second_thresholds(),
        &outcome.redo_plates,
        outcome.redo_dilution_factor,
    )?;

    let archiver = Archiver::new(&paths.archive_dir())?;
    store.replace(&records, &archiver)?;

    write_success_marker(paths, "rework")?;
    Ok(ReworkStatus::Assigned {
        redo_plates: outcome.redo_plates,
    })
}

/// Analyze second-attempt FA results and publish the redo summary plus
/// the double-failed report. As with the first analysis, the ledger waits
/// for the reviewed summary.
pub fn run_second_attempt(
    paths: &WorkflowPaths,
    decisions: &mut dyn DecisionProvider,
) -> ReconcileResult<()> {
    let mut records = ledger_store(paths).load()?;
    let import = fa_import::import_attempt(&paths.second_fa_dir())?;
    let thresholds = ThresholdSet::load(&paths.second_thresholds())?;

    let outcome = apply_second_attempt(
        &mut records,
        &import.records,
        &import.plates,
        &thresholds,
        decisions,
    )?;
    summary::write_redo_summary(&paths.second_summary(), &records)?;
    summary::write_double_failed(&paths.double_failed(), &records, &outcome.double_failed)?;

    write_success_marker(paths, "second_attempt")
}

/// Conclude the project: merge the final reviewed summary, settle the
/// attempt accounting, select pooling sources, write the ESP smear files,
/// and persist the final ledger.
pub fn run_conclude(paths: &WorkflowPaths) -> ReconcileResult<()> {
    let store = ledger_store(paths);
    let mut records = store.load()?;

    let chosen = find_updated_summary(&paths.first_fa_dir(), &paths.second_fa_dir())?;
    reconcile_final(&mut records, &chosen)?;
    select_pool_sources(&mut records);

    fs::create_dir_all(paths.smear_dir())?;
    let files = write_esp_files(&paths.smear_dir(), &records)?;
    info!("wrote {} ESP smear files", files.len());

    let archiver = Archiver::new(&paths.archive_dir())?;
    store.replace(&records, &archiver)?;

    write_success_marker(paths, "conclude")
}
