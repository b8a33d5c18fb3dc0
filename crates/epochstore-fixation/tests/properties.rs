//! Property-based tests for point-in-time fixation lookup.
//!
//! Verifies, over arbitrary fixation histories:
//! - lookups never move backwards as the queried height grows
//! - the current value equals the lookup at any height past the last change
//! - a lookup's answer is unaffected by records appended above its height

#![allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]

use std::collections::BTreeSet;

use epochstore_fixation::{FixationError, FixationStore, FixedHeight};
use epochstore_types::{Height, ParamKey};
use proptest::prelude::*;

// =============================================================================
// Strategies
// =============================================================================

/// A strictly increasing set of fixation heights with arbitrary values.
fn arb_history() -> impl Strategy<Value = Vec<(Height, u64)>> {
    prop::collection::btree_set(0_u64..10_000, 1..20).prop_flat_map(|heights: BTreeSet<u64>| {
        let len = heights.len();
        let heights: Vec<u64> = heights.into_iter().collect();
        prop::collection::vec(1_u64..1_000, len)
            .prop_map(move |values| heights.iter().copied().zip(values).collect())
    })
}

fn store_from(history: &[(Height, u64)]) -> FixationStore {
    let store = FixationStore::in_memory();
    for &(height, value) in history {
        store
            .set_current(&FixedHeight(height), ParamKey::EpochBlocks, &value)
            .unwrap();
    }
    store
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn lookup_is_monotonic_in_height(
        history in arb_history(),
        a in 0_u64..12_000,
        b in 0_u64..12_000,
    ) {
        let store = store_from(&history);
        let (low, high) = if a <= b { (a, b) } else { (b, a) };

        match (
            store.get_as_of(ParamKey::EpochBlocks, low),
            store.get_as_of(ParamKey::EpochBlocks, high),
        ) {
            (Ok(lo), Ok(hi)) => prop_assert!(lo.effective_height <= hi.effective_height),
            (Err(FixationError::NoFixationBeforeHeight { .. }), _) => {
                prop_assert!(low < history[0].0);
            }
            (lo, hi) => prop_assert!(false, "unexpected results {lo:?} / {hi:?}"),
        }
    }

    #[test]
    fn current_equals_lookup_past_last_change(
        history in arb_history(),
        extra in 0_u64..1_000,
    ) {
        let store = store_from(&history);
        let last = history[history.len() - 1].0;

        let current = store.get_current(ParamKey::EpochBlocks).unwrap();
        let as_of = store.get_as_of(ParamKey::EpochBlocks, last + extra).unwrap();
        prop_assert_eq!(current, as_of);
    }

    #[test]
    fn lookup_matches_linear_scan(history in arb_history(), query in 0_u64..12_000) {
        let store = store_from(&history);
        let expected = history.iter().rev().find(|(h, _)| *h <= query).copied();

        match expected {
            Some((height, value)) => {
                let got = store
                    .get_value_as_of::<u64>(ParamKey::EpochBlocks, query)
                    .unwrap();
                prop_assert_eq!(got, (value, height));
            }
            None => {
                let is_before_history = matches!(
                    store.get_as_of(ParamKey::EpochBlocks, query),
                    Err(FixationError::NoFixationBeforeHeight { .. })
                );
                prop_assert!(is_before_history);
            }
        }
    }

    #[test]
    fn later_appends_do_not_rewrite_earlier_answers(
        history in arb_history(),
        query in 0_u64..10_000,
    ) {
        // Fixate only the records up to the query, answer, then append the rest.
        let (past, future): (Vec<_>, Vec<_>) =
            history.iter().copied().partition(|(h, _)| *h <= query);
        prop_assume!(!past.is_empty());

        let store = store_from(&past);
        let before = store.get_as_of(ParamKey::EpochBlocks, query).unwrap();
        for (height, value) in future {
            store
                .set_current(&FixedHeight(height), ParamKey::EpochBlocks, &value)
                .unwrap();
        }
        let after = store.get_as_of(ParamKey::EpochBlocks, query).unwrap();
        prop_assert_eq!(before, after);
    }
}
