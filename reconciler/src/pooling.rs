//! Pooling source selection.
//!
//! Once both attempts are resolved, each sample's pool columns mirror
//! whichever attempt supplies material downstream. Precedence: a sample
//! that passed both attempts pools from the redo plate (the fresher
//! library), a sample that passed only the redo pools from the redo, and
//! everything else pools from the first attempt. Measurements of samples
//! that never passed are zeroed so pooling math cannot draw volume from a
//! failed well; index fields are populated regardless because downstream
//! LIMS rows require one.

use sps_types::SampleRecord;

pub fn select_pool_sources(ledger: &mut [SampleRecord]) {
    for rec in ledger.iter_mut() {
        select_for(rec);
    }
}

fn select_for(rec: &mut SampleRecord) {
    let total = rec
        .total_passed_attempts
        .unwrap_or_else(|| rec.computed_total());
    let use_redo = total == 2 || rec.passed_redo() == 1;

    let pick = |redo: &Option<String>, first: &str| {
        if use_redo {
            redo.clone()
                .unwrap_or_else(|| first.to_string())
        } else {
            first.to_string()
        }
    };

    rec.pool_source_plate = Some(pick(
        &rec.redo_destination_plate_barcode,
        &rec.destination_plate_barcode,
    ));
    rec.pool_source_well = Some(pick(&rec.redo_destination_well, &rec.destination_well));
    rec.pool_illumina_index_set =
        Some(pick(&rec.redo_illumina_index_set, &rec.illumina_index_set));
    rec.pool_illumina_index = Some(pick(&rec.redo_illumina_index, &rec.illumina_index));
    rec.pool_dilution_factor = if use_redo {
        rec.redo_dilution_factor.or(rec.dilution_factor)
    } else {
        rec.dilution_factor
    };

    if total >= 1 {
        if use_redo {
            rec.pool_conc_ng_per_ul = rec.redo_conc_ng_per_ul;
            rec.pool_conc_nmol_per_l = rec.redo_conc_nmol_per_l;
            rec.pool_avg_size_bp = rec.redo_avg_size_bp;
        } else {
            rec.pool_conc_ng_per_ul = rec.conc_ng_per_ul;
            rec.pool_conc_nmol_per_l = rec.conc_nmol_per_l;
            rec.pool_avg_size_bp = rec.avg_size_bp;
        }
    } else {
        rec.pool_conc_ng_per_ul = Some(0.0);
        rec.pool_conc_nmol_per_l = Some(0.0);
        rec.pool_avg_size_bp = Some(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reconciled(passed_first: u8, passed_redo: Option<u8>, redone: bool) -> SampleRecord {
        SampleRecord {
            sample_id: "S1".into(),
            destination_plate_barcode: "P1".into(),
            destination_well: "A1".into(),
            illumina_index_set: "SetA".into(),
            illumina_index: "A01".into(),
            dilution_factor: Some(5.0),
            conc_ng_per_ul: Some(99.0),
            conc_nmol_per_l: Some(88.0),
            avg_size_bp: Some(700.0),
            passed_first_attempt: Some(passed_first),
            redo_destination_plate_barcode: redone.then(|| "P1.2".to_string()),
            redo_destination_well: redone.then(|| "A1".to_string()),
            redo_illumina_index_set: redone.then(|| "SetB".to_string()),
            redo_illumina_index: redone.then(|| "B01".to_string()),
            redo_dilution_factor: redone.then_some(5.0),
            redo_conc_ng_per_ul: redone.then_some(10.0),
            redo_conc_nmol_per_l: redone.then_some(12.0),
            redo_avg_size_bp: redone.then_some(580.0),
            passed_redo_attempt: passed_redo,
            total_passed_attempts: Some(passed_first + passed_redo.unwrap_or(0)),
            ..Default::default()
        }
    }

    #[test]
    fn passing_both_attempts_always_pools_from_the_redo() {
        // First-attempt measurements are deliberately "better"; the redo
        // still wins.
        let mut ledger = vec![reconciled(1, Some(1), true)];
        select_pool_sources(&mut ledger);
        let rec = &ledger[0];
        assert_eq!(rec.pool_source_plate.as_deref(), Some("P1.2"));
        assert_eq!(rec.pool_illumina_index.as_deref(), Some("B01"));
        assert_eq!(rec.pool_conc_ng_per_ul, Some(10.0));
        assert_eq!(rec.pool_conc_nmol_per_l, Some(12.0));
        assert_eq!(rec.pool_avg_size_bp, Some(580.0));
    }

    #[test]
    fn passing_only_the_redo_pools_from_the_redo() {
        let mut ledger = vec![reconciled(0, Some(1), true)];
        select_pool_sources(&mut ledger);
        assert_eq!(ledger[0].pool_source_plate.as_deref(), Some("P1.2"));
        assert_eq!(ledger[0].pool_conc_ng_per_ul, Some(10.0));
    }

    #[test]
    fn passing_only_the_first_attempt_pools_from_the_first_plate() {
        let mut ledger = vec![reconciled(1, Some(0), true)];
        select_pool_sources(&mut ledger);
        let rec = &ledger[0];
        assert_eq!(rec.pool_source_plate.as_deref(), Some("P1"));
        assert_eq!(rec.pool_illumina_index.as_deref(), Some("A01"));
        assert_eq!(rec.pool_conc_ng_per_ul, Some(99.0));
    }

    #[test]
    fn double_failed_samples_get_zero_measurements_but_keep_an_index() {
        let mut ledger = vec![reconciled(0, Some(0), true)];
        select_pool_sources(&mut ledger);
        let rec = &ledger[0];
        assert_eq!(rec.pool_conc_ng_per_ul, Some(0.0));
        assert_eq!(rec.pool_conc_nmol_per_l, Some(0.0));
        assert_eq!(rec.pool_avg_size_bp, Some(0.0));
        assert_eq!(rec.pool_illumina_index.as_deref(), Some("A01"));
        assert_eq!(rec.pool_source_plate.as_deref(), Some("P1"));
    }

    #[test]
    fn first_attempt_only_sample_pools_from_the_first_attempt() {
        let mut ledger = vec![reconciled(1, Some(0), false)];
        ledger[0].synthesize_redo_placeholders();
        select_pool_sources(&mut ledger);
        let rec = &ledger[0];
        assert_eq!(rec.pool_source_plate.as_deref(), Some("P1"));
        assert_eq!(rec.pool_source_well.as_deref(), Some("A1"));
        assert_eq!(rec.pool_conc_ng_per_ul, Some(99.0));
    }
}
