//! Row-count-checked merging of external tables into the ledger.
//!
//! Every QC or summary table is folded into the ledger through
//! [`merge_rows`], which enforces the integrity invariants up front:
//! incoming sample ids must be unique, every incoming row must match
//! exactly one ledger row, and a table that is supposed to cover the
//! whole ledger must have exactly the ledger's row count. Field-level
//! conflicts are resolved by an explicit [`OverridePolicy`] instead of
//! positional column conventions.

use std::collections::HashMap;

use sps_types::{ReconcileError, ReconcileResult, SampleRecord};

/// How much of the ledger an incoming table is required to cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coverage {
    /// One incoming row per ledger row; any count difference is fatal.
    FullLedger,
    /// Incoming rows cover a subset of the ledger (e.g. only reworked
    /// plates); unmatched ledger rows are left untouched.
    Subset,
}

/// Which side wins when both the ledger and an incoming table carry a
/// value for the same field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverridePolicy {
    /// The incoming value replaces the ledger's, even when absent.
    /// Used for operator-editable columns, where the edited file is
    /// authoritative.
    PreferIncoming,
    /// The ledger's value is kept regardless of the incoming one.
    PreferExisting,
    /// The incoming value wins only when present.
    PreferIfPresent,
}

impl OverridePolicy {
    pub fn resolve<T>(self, existing: Option<T>, incoming: Option<T>) -> Option<T> {
        match self {
            OverridePolicy::PreferIncoming => incoming,
            OverridePolicy::PreferExisting => existing,
            OverridePolicy::PreferIfPresent => incoming.or(existing),
        }
    }
}

/// Merge `incoming` rows into the ledger in place, matching on sample id.
///
/// `apply` is called once per matched pair. The ledger's row count cannot
/// change (rows are mutated, never inserted or dropped); instead the
/// conditions that would have silently changed it under join semantics
/// are detected and returned as fatal errors.
pub fn merge_rows<I>(
    ledger: &mut [SampleRecord],
    incoming: &[I],
    key: impl Fn(&I) -> &str,
    stage: &'static str,
    coverage: Coverage,
    mut apply: impl FnMut(&mut SampleRecord, &I),
) -> ReconcileResult<()> {
    if coverage == Coverage::FullLedger && incoming.len() != ledger.len() {
        return Err(ReconcileError::RowCountDrift {
            stage,
            expected: ledger.len(),
            actual: incoming.len(),
        });
    }

    let mut by_id: HashMap<&str, &I> = HashMap::with_capacity(incoming.len());
    for row in incoming {
        if by_id.insert(key(row), row).is_some() {
            return Err(ReconcileError::DuplicateSampleId {
                sample_id: key(row).to_string(),
                source_name: stage.to_string(),
            });
        }
    }

    let mut matched = 0;
    for rec in ledger.iter_mut() {
        if let Some(row) = by_id.get(rec.sample_id.as_str()) {
            apply(rec, row);
            matched += 1;
        }
    }

    if matched != by_id.len() {
        // At least one incoming row has no ledger counterpart; name it.
        let unknown = by_id
            .keys()
            .find(|id| !ledger.iter().any(|r| r.sample_id == **id))
            .map_or_else(String::new, ToString::to_string);
        return Err(ReconcileError::UnknownSample {
            sample_id: unknown,
            source_name: stage.to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ledger_of(ids: &[&str]) -> Vec<SampleRecord> {
        ids.iter()
            .map(|id| SampleRecord {
                sample_id: (*id).to_string(),
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn subset_merge_touches_only_matched_rows() {
        let mut ledger = ledger_of(&["S1", "S2", "S3"]);
        let incoming = vec![("S2".to_string(), 7.0)];
        merge_rows(
            &mut ledger,
            &incoming,
            |(id, _)| id,
            "test",
            Coverage::Subset,
            |rec, (_, v)| rec.conc_ng_per_ul = Some(*v),
        )
        .unwrap();
        assert_eq!(ledger[0].conc_ng_per_ul, None);
        assert_eq!(ledger[1].conc_ng_per_ul, Some(7.0));
        assert_eq!(ledger[2].conc_ng_per_ul, None);
    }

    #[test]
    fn full_coverage_with_wrong_count_is_row_count_drift() {
        let mut ledger = ledger_of(&["S1", "S2"]);
        let incoming = vec!["S1".to_string()];
        let err = merge_rows(
            &mut ledger,
            &incoming,
            |id| id,
            "test",
            Coverage::FullLedger,
            |_, _| {},
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ReconcileError::RowCountDrift {
                expected: 2,
                actual: 1,
                ..
            }
        ));
    }

    #[test]
    fn incoming_row_without_ledger_match_is_fatal() {
        let mut ledger = ledger_of(&["S1"]);
        let incoming = vec!["S9".to_string()];
        let err = merge_rows(
            &mut ledger,
            &incoming,
            |id| id,
            "test",
            Coverage::Subset,
            |_, _| {},
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ReconcileError::UnknownSample { sample_id, .. } if sample_id == "S9"
        ));
    }

    #[test]
    fn duplicate_incoming_ids_are_fatal() {
        let mut ledger = ledger_of(&["S1"]);
        let incoming = vec!["S1".to_string(), "S1".to_string()];
        assert!(matches!(
            merge_rows(
                &mut ledger,
                &incoming,
                |id| id,
                "test",
                Coverage::Subset,
                |_, _| {},
            ),
            Err(ReconcileError::DuplicateSampleId { .. })
        ));
    }

    #[test]
    fn override_policy_resolution() {
        use OverridePolicy::*;
        assert_eq!(PreferIncoming.resolve(Some(1), None), None);
        assert_eq!(PreferExisting.resolve(Some(1), Some(2)), Some(1));
        assert_eq!(PreferIfPresent.resolve(Some(1), None), Some(1));
        assert_eq!(PreferIfPresent.resolve(Some(1), Some(2)), Some(2));
    }

    proptest! {
        // Merging any incoming id set either succeeds with the ledger's
        // row count unchanged, or fails; there is no third outcome where
        // rows appear or vanish.
        #[test]
        fn row_count_is_preserved_or_the_merge_fails(
            ledger_ids in proptest::collection::hash_set("[a-z]{1,4}", 0..40),
            incoming_ids in proptest::collection::vec("[a-z]{1,4}", 0..40),
        ) {
            let mut ledger: Vec<SampleRecord> = ledger_ids
                .iter()
                .map(|id| SampleRecord { sample_id: id.clone(), ..Default::default() })
                .collect();
            let before = ledger.len();

            let result = merge_rows(
                &mut ledger,
                &incoming_ids,
                |id| id,
                "prop",
                Coverage::Subset,
                |rec, _| rec.passed_first_attempt = Some(1),
            );

            prop_assert_eq!(ledger.len(), before);
            if result.is_ok() {
                // Success implies every incoming id was a unique ledger id.
                let mut seen = std::collections::HashSet::new();
                for id in &incoming_ids {
                    prop_assert!(ledger_ids.contains(id));
                    prop_assert!(seen.insert(id));
                }
            }
        }
    }
}
