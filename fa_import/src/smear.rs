//! Parsing of a single smear-analysis export into per-sample QC records.

use std::collections::BTreeSet;
use std::path::Path;

use sps_types::constants::{CONTROL_MARKERS, FA_PLATE_SUFFIX};
use sps_types::{ReconcileError, ReconcileResult, TableParser};

/// One non-control well of one FA plate, normalized.
///
/// Measurements are the raw instrument readings; the reconciler applies
/// the plate's dilution factor after making its pass/fail decision.
#[derive(Debug, Clone, PartialEq)]
pub struct QcRecord {
    /// Sample core id parsed from the export's `Sample ID` triplet.
    pub sample_id: String,
    /// Destination (library) plate parsed from the triplet.
    pub origin_plate: String,
    /// Well suffix parsed from the triplet.
    pub well_suffix: String,
    /// Physical FA well, with the instrument's `:` separator stripped.
    pub fa_well: String,
    pub conc_ng_per_ul: f64,
    pub conc_nmol_per_l: f64,
    pub avg_size_bp: f64,
}

/// Is this `Sample ID` one of the plate-control wells (blank, ladder,
/// library standard) rather than a sample?
fn is_control(sample_id: &str) -> bool {
    let lower = sample_id.to_lowercase();
    CONTROL_MARKERS.iter().any(|m| lower.contains(m))
}

/// Parse one smear export, dropping control wells and validating that the
/// plate folder the file was found in matches the plate ids embedded in
/// its sample names.
///
/// Sample names use the `<plate>_<sample>_<well>` convention; a name that
/// does not split into exactly three parts is a fatal format error.
/// Missing numeric measurements default to zero — the instrument leaves
/// cells blank rather than writing a placeholder.
pub fn parse_smear_file(path: &Path, plate_folder_name: &str) -> ReconcileResult<Vec<QcRecord>> {
    let mut parser = TableParser::new_csv(
        path,
        ["Well", "Sample ID", "ng/uL", "nmole/L", "Avg. Size"],
        "FA smear analysis",
    )?;

    let mut records = Vec::with_capacity(parser.len());
    let mut plates_seen = BTreeSet::new();

    for line in 0..parser.len() {
        parser.set_line(line);
        let raw_id = parser.require_string("Sample ID")?;
        if is_control(&raw_id) {
            continue;
        }

        let parts: Vec<&str> = raw_id.split('_').collect();
        let [plate, sample, well] = parts[..] else {
            return Err(ReconcileError::MalformedSampleId { raw: raw_id });
        };
        plates_seen.insert(plate.to_string());

        records.push(QcRecord {
            sample_id: sample.to_string(),
            origin_plate: plate.to_string(),
            well_suffix: well.to_string(),
            fa_well: parser.get_string("Well").replace(':', ""),
            conc_ng_per_ul: parser.try_parse_field("ng/uL", "number")?.unwrap_or(0.0),
            conc_nmol_per_l: parser.try_parse_field("nmole/L", "number")?.unwrap_or(0.0),
            avg_size_bp: parser.try_parse_field("Avg. Size", "number")?.unwrap_or(0.0),
        });
    }

    // The folder is named after the FA plate: library plate + 'F'. A
    // mismatch means the export was staged under the wrong plate.
    let folder_matches = plates_seen
        .iter()
        .any(|p| format!("{p}{FA_PLATE_SUFFIX}") == plate_folder_name);
    if !folder_matches {
        return Err(ReconcileError::PlateNameMismatch {
            folder: plate_folder_name.to_string(),
            file: path.to_path_buf(),
        });
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_smear(body: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        f.write_all(b"Well,Sample ID,ng/uL,nmole/L,Avg. Size\n")
            .unwrap();
        f.write_all(body.as_bytes()).unwrap();
        f
    }

    #[test]
    fn controls_are_dropped_case_insensitively() {
        let f = write_smear(
            "A1:,P1_S1_A1,4.2,5.1,612\n\
             A2:,EMPTY_well,,,\n\
             H1:,LibStd_H1,9.0,9.0,400\n\
             H12:,Ladder_1,,,\n",
        );
        let recs = parse_smear_file(f.path(), "P1F").unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].sample_id, "S1");
    }

    #[test]
    fn blank_measurements_default_to_zero() {
        let f = write_smear("A1:,P1_S1_A1,,,\n");
        let recs = parse_smear_file(f.path(), "P1F").unwrap();
        assert_eq!(recs[0].conc_ng_per_ul, 0.0);
        assert_eq!(recs[0].conc_nmol_per_l, 0.0);
        assert_eq!(recs[0].avg_size_bp, 0.0);
    }

    #[test]
    fn non_triplet_sample_id_is_fatal() {
        let f = write_smear("A1:,P1_S1,4.2,5.1,612\n");
        assert!(matches!(
            parse_smear_file(f.path(), "P1F"),
            Err(ReconcileError::MalformedSampleId { .. })
        ));
    }

    #[test]
    fn folder_name_must_match_embedded_plate_ids() {
        let f = write_smear("A1:,P1_S1_A1,4.2,5.1,612\n");
        assert!(matches!(
            parse_smear_file(f.path(), "P2F"),
            Err(ReconcileError::PlateNameMismatch { .. })
        ));
    }
}
