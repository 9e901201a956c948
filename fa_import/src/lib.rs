//! Importer for Fragment Analyzer smear-analysis exports.
//!
//! Walks an attempt directory for per-plate smear files, validates that
//! each file really belongs to the plate folder it was found in, and
//! normalizes the instrument rows into per-sample [`QcRecord`]s ready for
//! reconciliation against the project ledger.

use itertools::Itertools;
use log::info;
use std::fs;
use std::path::Path;

use sps_types::{ReconcileError, ReconcileResult};

mod scan;
mod smear;

pub use scan::{scan_fa_results, FaPlateFile};
pub use smear::{parse_smear_file, QcRecord};

/// The normalized output of one attempt's worth of FA exports.
#[derive(Debug)]
pub struct FaImport {
    /// One record per non-control well, across all plates.
    pub records: Vec<QcRecord>,
    /// Distinct destination (library) plate ids recovered from the
    /// parsed sample names, sorted.
    pub plates: Vec<String>,
}

/// Import every FA smear export found under `attempt_dir`.
///
/// Each validated export is also copied up to `<attempt_dir>/<plate>.csv`,
/// flattening the instrument's run-directory nesting the way the rest of
/// the workflow expects.
///
/// Fails if no exports are found, if any file's plate folder does not
/// match the sample names inside it, or if the number of files processed
/// does not equal the number of distinct plates recovered — the latter
/// means two files resolved to the same physical plate, which would
/// silently corrupt downstream pooling if allowed through.
pub fn import_attempt(attempt_dir: &Path) -> ReconcileResult<FaImport> {
    let plate_files = scan_fa_results(attempt_dir)?;
    let n_files = plate_files.len();

    let mut records = Vec::new();
    for pf in &plate_files {
        let mut recs = parse_smear_file(&pf.path, &pf.plate_name)?;
        fs::copy(&pf.path, attempt_dir.join(format!("{}.csv", pf.plate_name)))?;
        info!(
            "processed FA export {} ({} samples)",
            pf.path.display(),
            recs.len()
        );
        records.append(&mut recs);
    }

    let plates: Vec<String> = records
        .iter()
        .map(|r| r.origin_plate.clone())
        .unique()
        .sorted()
        .collect();

    if n_files != plates.len() {
        return Err(ReconcileError::PlateCountMismatch {
            files: n_files,
            plates: plates.len(),
        });
    }

    Ok(FaImport { records, plates })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    const SMEAR_HEADER: &str = "Well,Sample ID,ng/uL,nmole/L,Avg. Size,%CV\n";

    fn make_plate_dir(root: &Path, date: &str, folder: &str, body: &str) {
        let dir = root.join(date).join(folder);
        fs::create_dir_all(&dir).unwrap();
        let mut f = File::create(dir.join("2024 01 05 Smear Analysis Result.csv")).unwrap();
        f.write_all(SMEAR_HEADER.as_bytes()).unwrap();
        f.write_all(body.as_bytes()).unwrap();
    }

    #[test]
    fn imports_one_plate_and_flattens_the_export() {
        let tmp = tempfile::tempdir().unwrap();
        make_plate_dir(
            tmp.path(),
            "run_2024_01_05",
            "P1F extra tokens",
            "A1:,P1_S1_A1,4.2,5.1,612,1\n\
             B1:,P1_S2_B1,3.9,4.8,598,1\n\
             H12:,ladder_1,,,,\n",
        );

        let import = import_attempt(tmp.path()).unwrap();
        assert_eq!(import.plates, vec!["P1"]);
        assert_eq!(import.records.len(), 2);
        assert_eq!(import.records[0].sample_id, "S1");
        assert_eq!(import.records[0].fa_well, "A1");
        assert!(tmp.path().join("P1F.csv").exists());
    }

    #[test]
    fn no_exports_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("run_2024_01_05")).unwrap();
        assert!(matches!(
            import_attempt(tmp.path()),
            Err(ReconcileError::NoFaFiles { .. })
        ));
    }

    #[test]
    fn two_files_resolving_to_one_plate_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        // Folder names differ only in trailing tokens; both files carry
        // samples from plate P1.
        make_plate_dir(tmp.path(), "run_a", "P1F", "A1:,P1_S1_A1,4.2,5.1,612,1\n");
        make_plate_dir(tmp.path(), "run_b", "P1F copy", "B1:,P1_S2_B1,3.9,4.8,598,1\n");

        assert!(matches!(
            import_attempt(tmp.path()),
            Err(ReconcileError::PlateCountMismatch { files: 2, plates: 1 })
        ));
    }
}
