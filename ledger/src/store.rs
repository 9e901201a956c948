//! SQLite-backed sample ledger with a flat CSV mirror.

use log::info;
use rusqlite::{params, Connection, OpenFlags};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use sps_types::{ReconcileError, ReconcileResult, SampleRecord};

use crate::Archiver;

const CREATE_TABLE_SQL: &str = r#"
CREATE TABLE "project_summary" (
    "sample_id"                      TEXT NOT NULL,
    "Illumina Library"               TEXT,
    "plate_id"                       TEXT,
    "echo_id"                        TEXT,
    "source_well"                    TEXT,
    "Destination_Plate_Barcode"      TEXT,
    "Destination_Well"               TEXT,
    "Illumina_index_set"             TEXT,
    "Illumina_index"                 TEXT,
    "dilution_factor"                REAL,
    "FA_Well"                        TEXT,
    "ng/uL"                          REAL,
    "nmole/L"                        REAL,
    "Avg. Size"                      REAL,
    "Passed_library"                 INTEGER,
    "Redo_whole_plate"               INTEGER,
    "Redo_Destination_Plate_Barcode" TEXT,
    "Redo_Destination_Well"          TEXT,
    "Redo_FA_Well"                   TEXT,
    "Redo_Illumina_index_set"        TEXT,
    "Redo_Illumina_index"            TEXT,
    "Redo_dilution_factor"           REAL,
    "Redo_ng/uL"                     REAL,
    "Redo_nmole/L"                   REAL,
    "Redo_Avg. Size"                 REAL,
    "Redo_Passed_library"            INTEGER,
    "Total_passed_attempts"          INTEGER,
    "Pool_source_plate"              TEXT,
    "Pool_source_well"               TEXT,
    "Pool_Illumina_index_set"        TEXT,
    "Pool_Illumina_index"            TEXT,
    "Pool_dilution_factor"           REAL,
    "Pool_DNA_conc_ng/uL"            REAL,
    "Pool_nmole/L"                   REAL,
    "Pool_Avg. Size"                 REAL
)"#;

const SELECT_SQL: &str = r#"
SELECT "sample_id", "Illumina Library", "plate_id", "echo_id", "source_well",
       "Destination_Plate_Barcode", "Destination_Well",
       "Illumina_index_set", "Illumina_index", "dilution_factor",
       "FA_Well", "ng/uL", "nmole/L", "Avg. Size",
       "Passed_library", "Redo_whole_plate",
       "Redo_Destination_Plate_Barcode", "Redo_Destination_Well", "Redo_FA_Well",
       "Redo_Illumina_index_set", "Redo_Illumina_index", "Redo_dilution_factor",
       "Redo_ng/uL", "Redo_nmole/L", "Redo_Avg. Size", "Redo_Passed_library",
       "Total_passed_attempts",
       "Pool_source_plate", "Pool_source_well",
       "Pool_Illumina_index_set", "Pool_Illumina_index", "Pool_dilution_factor",
       "Pool_DNA_conc_ng/uL", "Pool_nmole/L", "Pool_Avg. Size"
FROM "project_summary" ORDER BY rowid"#;

const INSERT_SQL: &str = r#"
INSERT INTO "project_summary" VALUES (
    ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
    ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28, ?29, ?30,
    ?31, ?32, ?33, ?34, ?35
)"#;

/// The project ledger: one `project_summary` row per sample, stored in
/// SQLite and mirrored to CSV. The store is fully replaced (never
/// appended) on each successful reconciliation cycle.
#[derive(Debug)]
pub struct LedgerStore {
    db_path: PathBuf,
    csv_path: PathBuf,
}

impl LedgerStore {
    /// Address a ledger at the given database and CSV mirror paths. No
    /// I/O happens until [`LedgerStore::load`] or a write is called.
    pub fn open(db_path: &Path, csv_path: &Path) -> LedgerStore {
        LedgerStore {
            db_path: db_path.to_path_buf(),
            csv_path: csv_path.to_path_buf(),
        }
    }

    /// Read every sample row, in insertion order. Fails if the database
    /// file is missing or holds duplicate sample ids.
    pub fn load(&self) -> ReconcileResult<Vec<SampleRecord>> {
        if !self.db_path.exists() {
            return Err(ReconcileError::MissingInput {
                path: self.db_path.clone(),
            });
        }
        let conn = Connection::open_with_flags(&self.db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        let mut stmt = conn.prepare(SELECT_SQL)?;
        let records: Vec<SampleRecord> = stmt
            .query_map([], record_from_row)?
            .collect::<Result<_, _>>()?;

        let mut seen = HashSet::new();
        for rec in &records {
            if !seen.insert(rec.sample_id.as_str()) {
                return Err(ReconcileError::DuplicateSampleId {
                    sample_id: rec.sample_id.clone(),
                    source_name: self.db_path.display().to_string(),
                });
            }
        }
        info!("read {} rows from {}", records.len(), self.db_path.display());
        Ok(records)
    }

    /// Write the initial ledger. Refuses to clobber an existing snapshot;
    /// updates to an existing ledger must go through
    /// [`LedgerStore::replace`] so the prior state is archived.
    pub fn create(&self, records: &[SampleRecord]) -> ReconcileResult<()> {
        for path in [&self.db_path, &self.csv_path] {
            if path.exists() {
                return Err(ReconcileError::Other(anyhow::anyhow!(
                    "ledger snapshot {} already exists; refusing to overwrite without archiving",
                    path.display()
                )));
            }
        }
        self.write_db(records)?;
        self.write_csv(records)
    }

    /// Replace both snapshots with `records`, archiving the current
    /// versions first. If archiving fails nothing is written.
    pub fn replace(&self, records: &[SampleRecord], archiver: &Archiver) -> ReconcileResult<()> {
        archiver.archive_ledger(&self.db_path, &self.csv_path)?;
        self.write_db(records)?;
        self.write_csv(records)?;
        info!(
            "replaced ledger ({} rows) at {}",
            records.len(),
            self.db_path.display()
        );
        Ok(())
    }

    fn write_db(&self, records: &[SampleRecord]) -> ReconcileResult<()> {
        let mut conn = Connection::open(&self.db_path)?;
        conn.execute_batch(CREATE_TABLE_SQL)?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(INSERT_SQL)?;
            for rec in records {
                stmt.execute(params![
                    rec.sample_id,
                    rec.illumina_library,
                    rec.source_plate_id,
                    rec.echo_id,
                    rec.source_well,
                    rec.destination_plate_barcode,
                    rec.destination_well,
                    rec.illumina_index_set,
                    rec.illumina_index,
                    rec.dilution_factor,
                    rec.fa_well,
                    rec.conc_ng_per_ul,
                    rec.conc_nmol_per_l,
                    rec.avg_size_bp,
                    rec.passed_first_attempt,
                    rec.redo_whole_plate,
                    rec.redo_destination_plate_barcode,
                    rec.redo_destination_well,
                    rec.redo_fa_well,
                    rec.redo_illumina_index_set,
                    rec.redo_illumina_index,
                    rec.redo_dilution_factor,
                    rec.redo_conc_ng_per_ul,
                    rec.redo_conc_nmol_per_l,
                    rec.redo_avg_size_bp,
                    rec.passed_redo_attempt,
                    rec.total_passed_attempts,
                    rec.pool_source_plate,
                    rec.pool_source_well,
                    rec.pool_illumina_index_set,
                    rec.pool_illumina_index,
                    rec.pool_dilution_factor,
                    rec.pool_conc_ng_per_ul,
                    rec.pool_conc_nmol_per_l,
                    rec.pool_avg_size_bp,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn write_csv(&self, records: &[SampleRecord]) -> ReconcileResult<()> {
        let mut wtr = csv::Writer::from_path(&self.csv_path)?;
        for rec in records {
            wtr.serialize(rec)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

fn record_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SampleRecord> {
    Ok(SampleRecord {
        sample_id: row.get(0)?,
        illumina_library: row.get(1)?,
        source_plate_id: row.get(2)?,
        echo_id: row.get(3)?,
        source_well: row.get(4)?,
        destination_plate_barcode: row.get(5)?,
        destination_well: row.get(6)?,
        illumina_index_set: row.get(7)?,
        illumina_index: row.get(8)?,
        dilution_factor: row.get(9)?,
        fa_well: row.get(10)?,
        conc_ng_per_ul: row.get(11)?,
        conc_nmol_per_l: row.get(12)?,
        avg_size_bp: row.get(13)?,
        passed_first_attempt: row.get(14)?,
        redo_whole_plate: row.get(15)?,
        redo_destination_plate_barcode: row.get(16)?,
        redo_destination_well: row.get(17)?,
        redo_fa_well: row.get(18)?,
        redo_illumina_index_set: row.get(19)?,
        redo_illumina_index: row.get(20)?,
        redo_dilution_factor: row.get(21)?,
        redo_conc_ng_per_ul: row.get(22)?,
        redo_conc_nmol_per_l: row.get(23)?,
        redo_avg_size_bp: row.get(24)?,
        passed_redo_attempt: row.get(25)?,
        total_passed_attempts: row.get(26)?,
        pool_source_plate: row.get(27)?,
        pool_source_well: row.get(28)?,
        pool_illumina_index_set: row.get(29)?,
        pool_illumina_index: row.get(30)?,
        pool_dilution_factor: row.get(31)?,
        pool_conc_ng_per_ul: row.get(32)?,
        pool_conc_nmol_per_l: row.get(33)?,
        pool_avg_size_bp: row.get(34)?,
    })
}
