//! Per-plate QC thresholds.
//!
//! `thresholds.txt` is a small tab-delimited table, one row per FA'd
//! destination plate, filled in by the operator before each analysis
//! stage. Partial thresholds are worse than none, so any missing cell is
//! fatal. The header spelling below (including `Size_theshold_(bp)`) is
//! the long-standing on-disk contract; hand-filled files in the wild use
//! it and the rework stage regenerates it verbatim.

use anyhow::anyhow;
use log::info;
use std::collections::BTreeMap;
use std::path::Path;

use sps_types::{ReconcileError, ReconcileResult, SampleRecord, TableParser};

use crate::decision::DecisionProvider;

pub const PLATE_COLUMN: &str = "Destination_plate";
pub const CONC_COLUMN: &str = "DNA_conc_threshold_(nmol/L)";
pub const SIZE_COLUMN: &str = "Size_theshold_(bp)";
pub const DILUTION_COLUMN: &str = "dilution_factor";

pub const THRESHOLD_HEADERS: [&str; 4] =
    [PLATE_COLUMN, CONC_COLUMN, SIZE_COLUMN, DILUTION_COLUMN];

/// QC acceptance thresholds and dilution factor for one plate.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdRecord {
    pub plate_id: String,
    pub conc_threshold_nmol_per_l: f64,
    pub size_threshold_bp: f64,
    pub dilution_factor: f64,
}

/// All thresholds for one analysis stage, keyed by destination plate.
#[derive(Debug, Default)]
pub struct ThresholdSet {
    by_plate: BTreeMap<String, ThresholdRecord>,
}

impl ThresholdSet {
    pub fn load(path: &Path) -> ReconcileResult<ThresholdSet> {
        if !path.exists() {
            return Err(ReconcileError::MissingInput {
                path: path.to_path_buf(),
            });
        }
        let mut parser = TableParser::new_tsv(path, THRESHOLD_HEADERS, "thresholds")?;

        let mut by_plate = BTreeMap::new();
        for line in 0..parser.len() {
            parser.set_line(line);
            let plate_id = parser.try_get_string(PLATE_COLUMN).ok_or_else(|| {
                ReconcileError::IncompleteThresholds {
                    path: path.to_path_buf(),
                    column: PLATE_COLUMN.to_string(),
                }
            })?;
            let record = ThresholdRecord {
                plate_id: plate_id.clone(),
                conc_threshold_nmol_per_l: required_value(&parser, path, CONC_COLUMN)?,
                size_threshold_bp: required_value(&parser, path, SIZE_COLUMN)?,
                dilution_factor: required_value(&parser, path, DILUTION_COLUMN)?,
            };
            if by_plate.insert(plate_id.clone(), record).is_some() {
                return Err(ReconcileError::Other(anyhow!(
                    "thresholds file '{}' lists plate '{plate_id}' more than once",
                    path.display()
                )));
            }
        }
        info!(
            "loaded thresholds for {} plates from {}",
            by_plate.len(),
            path.display()
        );
        Ok(ThresholdSet { by_plate })
    }

    /// Thresholds for one plate; a plate with QC data but no thresholds
    /// cannot be given a pass/fail decision.
    pub fn get(&self, plate: &str) -> ReconcileResult<&ThresholdRecord> {
        self.by_plate
            .get(plate)
            .ok_or_else(|| ReconcileError::MissingThreshold {
                plate: plate.to_string(),
            })
    }

    pub fn plates(&self) -> impl Iterator<Item = &str> {
        self.by_plate.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_plate.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_plate.is_empty()
    }

    /// Reconcile the redo dilution factors recorded in the ledger at
    /// rework time against the values the operator put in this stage's
    /// thresholds file.
    ///
    /// A disagreement usually means the FA plate was physically set up
    /// with a different dilution than recorded, which changes the scale
    /// of every downstream measurement, so it is never resolved silently:
    /// the operator confirms once that the thresholds file is correct
    /// (then its value wins for every row) or the run aborts.
    pub fn reconcile_redo_dilution(
        &self,
        ledger: &mut [SampleRecord],
        decisions: &mut dyn DecisionProvider,
    ) -> ReconcileResult<()> {
        let mut mismatch = None;
        for rec in ledger.iter() {
            let (Some(plate), Some(recorded)) = (
                rec.redo_destination_plate_barcode.as_deref(),
                rec.redo_dilution_factor,
            ) else {
                continue;
            };
            if let Some(thr) = self.by_plate.get(plate) {
                if (recorded - thr.dilution_factor).abs() > f64::EPSILON {
                    mismatch = Some((plate.to_string(), recorded, thr.dilution_factor));
                    break;
                }
            }
        }

        let Some((plate, recorded, from_file)) = mismatch else {
            return Ok(());
        };

        let question = format!(
            "The dilution factor in the thresholds file ({from_file}) does not \
             match the value recorded in the ledger ({recorded}) for plate \
             {plate}. Is the thresholds file correct?"
        );
        if !decisions.confirm(&question)? {
            return Err(ReconcileError::OperatorAbort {
                reason: format!(
                    "redo dilution factor for plate {plate} disagrees between \
                     the ledger and the thresholds file"
                ),
            });
        }

        for rec in ledger.iter_mut() {
            if let Some(plate) = rec.redo_destination_plate_barcode.as_deref() {
                if let Some(thr) = self.by_plate.get(plate) {
                    rec.redo_dilution_factor = Some(thr.dilution_factor);
                }
            }
        }
        info!("operator accepted thresholds-file dilution factors; ledger values replaced");
        Ok(())
    }
}

fn required_value(parser: &TableParser, path: &Path, column: &str) -> ReconcileResult<f64> {
    match parser.try_parse_field::<f64>(column, "number")? {
        Some(v) => Ok(v),
        None => Err(ReconcileError::IncompleteThresholds {
            path: path.to_path_buf(),
            column: column.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::ScriptedDecisions;
    use std::io::Write;

    fn write_thresholds(body: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        writeln!(
            f,
            "Destination_plate\tDNA_conc_threshold_(nmol/L)\tSize_theshold_(bp)\tdilution_factor"
        )
        .unwrap();
        f.write_all(body.as_bytes()).unwrap();
        f
    }

    fn redo_sample(id: &str, plate: &str, dilution: f64) -> SampleRecord {
        SampleRecord {
            sample_id: id.to_string(),
            redo_destination_plate_barcode: Some(plate.to_string()),
            redo_dilution_factor: Some(dilution),
            ..Default::default()
        }
    }

    #[test]
    fn loads_complete_file() {
        let f = write_thresholds("P1\t2\t530\t5\nP2\t2.5\t510\t5\n");
        let set = ThresholdSet::load(f.path()).unwrap();
        assert_eq!(set.len(), 2);
        let p1 = set.get("P1").unwrap();
        assert_eq!(p1.conc_threshold_nmol_per_l, 2.0);
        assert_eq!(p1.size_threshold_bp, 530.0);
        assert_eq!(p1.dilution_factor, 5.0);
        assert!(matches!(
            set.get("P9"),
            Err(ReconcileError::MissingThreshold { .. })
        ));
    }

    #[test]
    fn missing_cell_names_the_column() {
        let f = write_thresholds("P1\t\t530\t5\n");
        let err = ThresholdSet::load(f.path()).unwrap_err();
        match err {
            ReconcileError::IncompleteThresholds { column, .. } => {
                assert_eq!(column, CONC_COLUMN);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn dilution_mismatch_is_default_deny() {
        let f = write_thresholds("P1.2\t2\t530\t10\n");
        let set = ThresholdSet::load(f.path()).unwrap();
        let mut ledger = vec![redo_sample("S1", "P1.2", 5.0)];

        let mut decisions = ScriptedDecisions::all_defaults();
        let err = set
            .reconcile_redo_dilution(&mut ledger, &mut decisions)
            .unwrap_err();
        assert!(matches!(err, ReconcileError::OperatorAbort { .. }));
        // Ledger untouched after an abort.
        assert_eq!(ledger[0].redo_dilution_factor, Some(5.0));
    }

    #[test]
    fn confirmed_mismatch_applies_file_value_to_every_row() {
        let f = write_thresholds("P1.2\t2\t530\t10\nP2.2\t2\t530\t10\n");
        let set = ThresholdSet::load(f.path()).unwrap();
        let mut ledger = vec![
            redo_sample("S1", "P1.2", 5.0),
            redo_sample("S2", "P2.2", 10.0),
        ];

        let mut decisions = ScriptedDecisions {
            confirmations: [true].into(),
            ..Default::default()
        };
        set.reconcile_redo_dilution(&mut ledger, &mut decisions)
            .unwrap();
        assert_eq!(ledger[0].redo_dilution_factor, Some(10.0));
        assert_eq!(ledger[1].redo_dilution_factor, Some(10.0));
    }

    #[test]
    fn matching_dilutions_ask_nothing() {
        let f = write_thresholds("P1.2\t2\t530\t5\n");
        let set = ThresholdSet::load(f.path()).unwrap();
        let mut ledger = vec![redo_sample("S1", "P1.2", 5.0)];
        // Default-deny provider: if a question were asked the call would
        // abort, so success proves no prompt happened.
        let mut decisions = ScriptedDecisions::all_defaults();
        set.reconcile_redo_dilution(&mut ledger, &mut decisions)
            .unwrap();
    }
}
