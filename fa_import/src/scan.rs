//! Directory walk for FA instrument exports.
//!
//! The instrument writes each run under `<attempt_dir>/<run>/<plate>/`,
//! where the plate directory name starts with the FA plate barcode
//! (library plate barcode + `F`) followed by instrument-generated tokens.

use std::fs;
use std::path::{Path, PathBuf};

use sps_types::constants::SMEAR_FILE_SUFFIX;
use sps_types::{ReconcileError, ReconcileResult};

/// One smear-analysis export located on disk.
#[derive(Debug)]
pub struct FaPlateFile {
    /// FA plate name parsed from the plate directory (first
    /// whitespace-delimited token).
    pub plate_name: String,
    /// Full path to the smear analysis CSV.
    pub path: PathBuf,
}

/// Find every smear-analysis export two directory levels below
/// `attempt_dir`. Finding none is fatal: the stage was invoked before the
/// instrument results were staged.
pub fn scan_fa_results(attempt_dir: &Path) -> ReconcileResult<Vec<FaPlateFile>> {
    if !attempt_dir.is_dir() {
        return Err(ReconcileError::MissingInput {
            path: attempt_dir.to_path_buf(),
        });
    }

    let mut found = Vec::new();
    for run_dir in sorted_subdirs(attempt_dir)? {
        for plate_dir in sorted_subdirs(&run_dir)? {
            let folder_name = plate_dir
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default();
            let plate_name = folder_name
                .split_whitespace()
                .next()
                .unwrap_or(folder_name)
                .to_string();

            // Take the first smear export in the plate directory; the
            // instrument writes exactly one per run.
            let mut entries: Vec<PathBuf> = fs::read_dir(&plate_dir)?
                .filter_map(|e| e.ok().map(|e| e.path()))
                .filter(|p| {
                    p.file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| n.ends_with(SMEAR_FILE_SUFFIX))
                })
                .collect();
            entries.sort();

            if let Some(path) = entries.into_iter().next() {
                found.push(FaPlateFile { plate_name, path });
            }
        }
    }

    if found.is_empty() {
        return Err(ReconcileError::NoFaFiles {
            dir: attempt_dir.to_path_buf(),
        });
    }
    Ok(found)
}

fn sorted_subdirs(dir: &Path) -> ReconcileResult<Vec<PathBuf>> {
    let mut dirs: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort();
    Ok(dirs)
}
