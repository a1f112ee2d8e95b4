//! Property-based tests for signatures, numeric binning and the catalog.
//!
//! ## Test Categories
//!
//! ### 1. Signatures
//! - Both variants are deterministic, idempotent on digit-free input and
//!   stable after two applications
//! - The stored variant keeps one output character per input character
//! - The strict variant only ever emits `a`, `A` and `N`
//!
//! ### 2. Numeric binning
//! - Bin counts add up to the finite values; NaN and infinities are counted apart
//! - Every value lies within the edges of the bin it was counted in
//!
//! ### 3. Catalog
//! - Upserting the same entry any number of times leaves exactly one row

use std::path::PathBuf;

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use term_profile::catalog::{Catalog, CatalogEntry, TableKey};
use term_profile::patterns::{signature, strict_signature, PatternVariant};
use term_profile::views::{NumericBinning, NumericHistogram, BIN_COUNT};

// ============================================================================
// Signatures
// ============================================================================

proptest! {
    #[test]
    fn prop_signature_is_idempotent_without_digits(value in "[^0-9N]{0,40}") {
        let once = signature(&value);
        prop_assert_eq!(signature(&once), once.clone());
        let strict = strict_signature(&value);
        prop_assert_eq!(strict_signature(&strict), strict);
    }

    #[test]
    fn prop_signature_settles_after_two_applications(value in any::<String>()) {
        let twice = signature(&signature(&value));
        prop_assert!(!twice.contains('N'));
        prop_assert_eq!(signature(&twice), twice.clone());
        let strict_twice = strict_signature(&strict_signature(&value));
        prop_assert_eq!(strict_signature(&strict_twice), strict_twice);
    }

    #[test]
    fn prop_uppercase_letters_fold_to_a(value in "[A-Z]{1,20}") {
        prop_assert_eq!(signature(&value), "A".repeat(value.len()));
    }

    #[test]
    fn prop_signature_is_deterministic(value in "\\PC{0,40}") {
        prop_assert_eq!(signature(&value), signature(&value));
        prop_assert_eq!(PatternVariant::Strict.apply(&value), strict_signature(&value));
    }

    #[test]
    fn prop_stored_signature_preserves_length(value in any::<String>()) {
        prop_assert_eq!(signature(&value).chars().count(), value.chars().count());
    }

    #[test]
    fn prop_strict_signature_alphabet(value in any::<String>()) {
        let strict = strict_signature(&value);
        prop_assert!(strict.chars().all(|c| matches!(c, 'a' | 'A' | 'N')));
        prop_assert_eq!(
            strict.len(),
            value.chars().filter(|c| c.is_ascii_alphanumeric()).count()
        );
    }

    #[test]
    fn prop_strict_matches_stored_without_punctuation(value in "[a-zA-Z0-9]{0,30}") {
        prop_assert_eq!(signature(&value), strict_signature(&value));
    }
}

// ============================================================================
// Numeric binning
// ============================================================================

fn values() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(
        prop_oneof![
            8 => -1.0e6f64..1.0e6,
            1 => prop::num::f64::ANY,
            1 => Just(0.0),
        ],
        1..200,
    )
}

proptest! {
    #[test]
    fn prop_histogram_counts_every_value(values in values()) {
        let finite = values.iter().filter(|v| v.is_finite()).count() as u64;
        match NumericHistogram::from_values(values.clone()) {
            Some(h) => {
                prop_assert_eq!(h.bins.len(), BIN_COUNT);
                prop_assert_eq!(h.total(), values.len() as u64);
                prop_assert_eq!(h.bins.iter().map(|b| b.count).sum::<u64>(), finite);
                prop_assert_eq!(h.non_finite, values.len() as u64 - finite);
            }
            None => prop_assert_eq!(finite, 0),
        }
    }

    #[test]
    fn prop_values_fall_within_their_bin(values in values()) {
        if let Some(binning) = NumericBinning::fit(values.iter().copied()) {
            for v in values.iter().copied().filter(|v| v.is_finite()) {
                let i = binning.index(v);
                prop_assert!(i < BIN_COUNT);
                prop_assert!(v >= binning.lower(i), "{} below bin {}", v, i);
                if i + 1 < BIN_COUNT {
                    prop_assert!(v < binning.upper(i), "{} above bin {}", v, i);
                } else {
                    prop_assert!(v <= binning.upper(i), "{} above last bin", v);
                }
            }
        }
    }
}

// ============================================================================
// Catalog
// ============================================================================

fn identifier() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,12}"
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_upsert_is_idempotent(
        connection in identifier(),
        schema in identifier(),
        table in identifier(),
        repeats in 1usize..5,
        seconds in 0i64..2_000_000_000,
    ) {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::new(dir.path().join("catalog.db"));
        let key = TableKey::new(connection, schema, table);
        let table_dir = PathBuf::from("/artifacts").join(key.to_string());
        let entry = CatalogEntry {
            key: key.clone(),
            snapshot_path: table_dir.join("data.parquet"),
            summary_path: table_dir.join("summary.parquet"),
            pattern_path: None,
            last_profiled: Utc.timestamp_opt(seconds, 0).unwrap(),
        };

        for _ in 0..repeats {
            catalog.upsert(&entry).unwrap();
        }

        let all = catalog.list_all().unwrap();
        prop_assert_eq!(all.len(), 1);
        prop_assert_eq!(&all[0], &entry);
        prop_assert_eq!(catalog.lookup(&key).unwrap(), Some(entry));
    }
}
