//! Timestamped archiving of ledger snapshots.

use chrono::Local;
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

use sps_types::constants::ARCHIVE_TIMESTAMP_FORMAT;
use sps_types::{ReconcileError, ReconcileResult};

/// Moves the current ledger snapshot into the archive directory before it
/// is replaced. The archive step failing aborts the write that requested
/// it: losing the prior state entirely is strictly worse than failing the
/// current stage.
#[derive(Debug)]
pub struct Archiver {
    archive_dir: PathBuf,
}

impl Archiver {
    /// Create an archiver rooted at `archive_dir`, creating the directory
    /// if needed.
    pub fn new(archive_dir: &Path) -> ReconcileResult<Archiver> {
        fs::create_dir_all(archive_dir)?;
        Ok(Archiver {
            archive_dir: archive_dir.to_path_buf(),
        })
    }

    /// Move the current ledger database and CSV mirror into the archive,
    /// tagged with a second-resolution timestamp. Both files must exist;
    /// a missing snapshot means the caller is about to overwrite state it
    /// never read, which is always a bug.
    pub fn archive_ledger(&self, db_path: &Path, csv_path: &Path) -> ReconcileResult<()> {
        for path in [db_path, csv_path] {
            if !path.exists() {
                return Err(ReconcileError::MissingInput {
                    path: path.to_path_buf(),
                });
            }
        }

        let stamp = Local::now().format(ARCHIVE_TIMESTAMP_FORMAT);
        let db_dest = self
            .archive_dir
            .join(format!("archive_project_summary_{stamp}.db"));
        let csv_dest = self
            .archive_dir
            .join(format!("archive_project_summary_{stamp}.csv"));

        fs::rename(db_path, &db_dest)?;
        fs::rename(csv_path, &csv_dest)?;
        info!("archived ledger snapshot to {}", db_dest.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    #[test]
    fn archiving_moves_both_files() {
        let tmp = tempfile::tempdir().unwrap();
        let db = tmp.path().join("project_summary.db");
        let csv = tmp.path().join("project_summary.csv");
        File::create(&db).unwrap().write_all(b"db").unwrap();
        File::create(&csv).unwrap().write_all(b"csv").unwrap();

        let archiver = Archiver::new(&tmp.path().join("archived_files")).unwrap();
        archiver.archive_ledger(&db, &csv).unwrap();

        assert!(!db.exists());
        assert!(!csv.exists());
        let archived: Vec<_> = fs::read_dir(tmp.path().join("archived_files"))
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(archived.len(), 2);
        assert!(archived.iter().all(|n| n.starts_with("archive_project_summary_")));
    }

    #[test]
    fn missing_snapshot_aborts_instead_of_archiving_half() {
        let tmp = tempfile::tempdir().unwrap();
        let db = tmp.path().join("project_summary.db");
        let csv = tmp.path().join("project_summary.csv");
        File::create(&db).unwrap();

        let archiver = Archiver::new(&tmp.path().join("archived_files")).unwrap();
        let err = archiver.archive_ledger(&db, &csv).unwrap_err();
        assert!(matches!(err, ReconcileError::MissingInput { .. }));
        // The existing half must not have moved.
        assert!(db.exists());
    }
}
