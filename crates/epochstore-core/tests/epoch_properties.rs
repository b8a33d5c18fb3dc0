//! Property-based tests for epoch geometry over arbitrary length histories.
//!
//! Verifies:
//! - containment: `epoch_start(h) <= h < epoch_start(h) + length(h)`
//! - re-anchoring: after a change at F, offsets count from F
//! - the previous epoch ends exactly where the current one starts
//! - `is_epoch_start` agrees with `block_in_epoch`

#![allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]

use std::collections::BTreeMap;

use epochstore_core::epoch::{EpochCalculator, EpochError};
use epochstore_fixation::{FixationStore, FixedHeight};
use epochstore_types::{Height, ParamKey};
use proptest::prelude::*;

// =============================================================================
// Strategies
// =============================================================================

/// Epoch length changes keyed by height, always including genesis at 0.
fn arb_lengths() -> impl Strategy<Value = BTreeMap<Height, u64>> {
    (
        1_u64..50,
        prop::collection::btree_map(1_u64..5_000, 1_u64..50, 0..8),
    )
        .prop_map(|(genesis, mut changes)| {
            changes.insert(0, genesis);
            changes
        })
}

fn store_from(lengths: &BTreeMap<Height, u64>) -> FixationStore {
    let store = FixationStore::in_memory();
    for (&height, length) in lengths {
        store
            .set_current(&FixedHeight(height), ParamKey::EpochBlocks, length)
            .unwrap();
    }
    store
}

/// The `(fixation height, length)` in effect at `height`.
fn in_effect(lengths: &BTreeMap<Height, u64>, height: Height) -> (Height, u64) {
    let (&anchor, &length) = lengths.range(..=height).next_back().unwrap();
    (anchor, length)
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn epoch_contains_its_height(lengths in arb_lengths(), height in 0_u64..6_000) {
        let store = store_from(&lengths);
        let calc = EpochCalculator::new(&store);

        let start = calc.epoch_start(height).unwrap().start;
        let length = calc.epoch_blocks(height).unwrap();
        prop_assert!(start <= height);
        prop_assert!(height < start + length);
        prop_assert_eq!(calc.next_epoch_start(height).unwrap(), start + length);
    }

    #[test]
    fn offset_counts_from_fixation_height(lengths in arb_lengths(), height in 0_u64..6_000) {
        let store = store_from(&lengths);
        let calc = EpochCalculator::new(&store);

        let (anchor, length) = in_effect(&lengths, height);
        prop_assert_eq!(calc.block_in_epoch(height).unwrap(), (height - anchor) % length);
        // The epoch never reaches back past the fixation that defines it.
        prop_assert!(calc.epoch_start(height).unwrap().start >= anchor);
    }

    #[test]
    fn previous_epoch_ends_where_current_begins(
        lengths in arb_lengths(),
        height in 0_u64..6_000,
    ) {
        let store = store_from(&lengths);
        let calc = EpochCalculator::new(&store);

        let start = calc.epoch_start(height).unwrap().start;
        match calc.previous_epoch_start(height) {
            Ok(previous) => {
                prop_assert!(previous < start);
                prop_assert_eq!(calc.epoch_start(start - 1).unwrap().start, previous);
                // The previous epoch is no longer than the length in effect for it.
                prop_assert!(start - previous <= calc.epoch_blocks(previous).unwrap());
            }
            Err(EpochError::BeyondGenesisEpoch { .. }) => prop_assert_eq!(start, 0),
            Err(other) => prop_assert!(false, "unexpected error {other}"),
        }
    }

    #[test]
    fn epoch_start_flag_matches_offset(lengths in arb_lengths(), height in 0_u64..6_000) {
        let store = store_from(&lengths);
        let calc = EpochCalculator::new(&store);

        prop_assert_eq!(
            calc.is_epoch_start(height),
            calc.block_in_epoch(height).unwrap() == 0
        );
    }

    #[test]
    fn every_fixation_height_starts_an_epoch(lengths in arb_lengths()) {
        let store = store_from(&lengths);
        let calc = EpochCalculator::new(&store);

        for &height in lengths.keys() {
            prop_assert!(calc.is_epoch_start(height));
        }
    }
}
