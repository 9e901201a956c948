//! Project directory layout.
//!
//! Every filesystem location the workflow touches is derived from the
//! single project directory, so stage code never assembles paths on its
//! own and the layout is documented in exactly one place.

use std::path::{Path, PathBuf};

use sps_types::constants::{
    DOUBLE_FAILED_FILE, FIRST_SUMMARY_FILE, FIRST_UPDATED_SUMMARY_FILE, LEDGER_CSV_FILE,
    LEDGER_DB_FILE, SECOND_SUMMARY_FILE, SECOND_UPDATED_SUMMARY_FILE, THRESHOLDS_FILE,
};

/// Well-known locations inside one project directory.
#[derive(Debug, Clone)]
pub struct WorkflowPaths {
    project_dir: PathBuf,
}

impl WorkflowPaths {
    pub fn new(project_dir: &Path) -> WorkflowPaths {
        WorkflowPaths {
            project_dir: project_dir.to_path_buf(),
        }
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub fn ledger_db(&self) -> PathBuf {
        self.project_dir.join(LEDGER_DB_FILE)
    }

    pub fn ledger_csv(&self) -> PathBuf {
        self.project_dir.join(LEDGER_CSV_FILE)
    }

    pub fn archive_dir(&self) -> PathBuf {
        self.project_dir.join("archived_files")
    }

    fn library_dir(&self) -> PathBuf {
        self.project_dir.join("1_make_library_analyze_fa")
    }

    /// First-attempt FA exports and summaries.
    pub fn first_fa_dir(&self) -> PathBuf {
        self.library_dir().join("B_first_attempt_fa_result")
    }

    /// Working area for the rework (second library construction) step.
    pub fn second_lib_dir(&self) -> PathBuf {
        self.library_dir().join("C_second_attempt_make_lib")
    }

    /// Second-attempt FA exports and summaries. Its existence is the
    /// signal that a rework happened.
    pub fn second_fa_dir(&self) -> PathBuf {
        self.library_dir().join("D_second_attempt_fa_result")
    }

    pub fn smear_dir(&self) -> PathBuf {
        self.project_dir.join("2_pooling").join("A_smear_file_for_ESP_upload")
    }

    pub fn status_dir(&self) -> PathBuf {
        self.project_dir.join(".workflow_status")
    }

    pub fn first_thresholds(&self) -> PathBuf {
        self.first_fa_dir().join(THRESHOLDS_FILE)
    }

    pub fn second_thresholds(&self) -> PathBuf {
        self.second_fa_dir().join(THRESHOLDS_FILE)
    }

    pub fn first_summary(&self) -> PathBuf {
        self.first_fa_dir().join(FIRST_SUMMARY_FILE)
    }

    pub fn first_updated_summary(&self) -> PathBuf {
        self.first_fa_dir().join(FIRST_UPDATED_SUMMARY_FILE)
    }

    pub fn second_summary(&self) -> PathBuf {
        self.second_fa_dir().join(SECOND_SUMMARY_FILE)
    }

    pub fn second_updated_summary(&self) -> PathBuf {
        self.second_fa_dir().join(SECOND_UPDATED_SUMMARY_FILE)
    }

    pub fn double_failed(&self) -> PathBuf {
        self.second_fa_dir().join(DOUBLE_FAILED_FILE)
    }
}
