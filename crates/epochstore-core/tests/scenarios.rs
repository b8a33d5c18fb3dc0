//! End-to-end scenarios: config, genesis, parameter changes, and epoch
//! queries working together over one store.

#![allow(clippy::unwrap_used, clippy::too_many_lines)]

use epochstore_core::clock::BlockClock;
use epochstore_core::config::EpochStoreConfig;
use epochstore_core::epoch::{EpochCalculator, EpochError};
use epochstore_core::params;
use epochstore_core::replay::{self, NoOpCallback};
use epochstore_fixation::{FixationError, FixationStore, FixedHeight};
use epochstore_types::{EpochGeometry, ParamKey, Params};

const CONFIG: &str = r"
genesis:
  epoch_blocks: 10
  epochs_to_save: 3
  unstake_hold_blocks: 20

replay:
  blocks: 60
  prune: false
  param_changes:
    - height: 40
      epoch_blocks: 7
";

#[test]
fn boundary_example() {
    let store = FixationStore::in_memory();
    store
        .set_current(&FixedHeight(0), ParamKey::EpochBlocks, &10_u64)
        .unwrap();
    let calc = EpochCalculator::new(&store);

    assert_eq!(calc.epoch_start(25).unwrap().start, 20);
    assert_eq!(calc.block_in_epoch(25).unwrap(), 5);
    assert_eq!(calc.next_epoch_start(25).unwrap(), 30);
    assert_eq!(calc.previous_epoch_start(25).unwrap(), 10);
}

#[test]
fn configured_change_replays_into_expected_geometry() {
    let config = EpochStoreConfig::parse(CONFIG).unwrap();
    let store = FixationStore::in_memory();
    params::seed_genesis(&store, &config.genesis.to_params()).unwrap();

    let mut clock = BlockClock::new();
    let result = replay::run_replay(&store, &mut clock, &config.replay, &mut NoOpCallback).unwrap();
    assert_eq!(result.epoch_starts, vec![0, 10, 20, 30, 40, 47, 54]);

    let calc = EpochCalculator::new(&store);
    assert_eq!(calc.block_in_epoch(44).unwrap(), 4);
    assert_eq!(calc.epoch_start(44).unwrap().start, 40);
    assert_eq!(calc.epoch_start(35).unwrap().start, 30);
    assert_eq!(calc.block_in_epoch(35).unwrap(), 5);
    assert_eq!(
        calc.geometry(44).unwrap(),
        EpochGeometry {
            height: 44,
            epoch_start: 40,
            block_in_epoch: 4,
            next_epoch_start: 47,
            previous_epoch_start: Some(30),
        }
    );

    // Current values reflect the change; fixated values do not rewrite history.
    assert_eq!(
        params::get_params(&store).unwrap(),
        Params {
            epoch_blocks: 7,
            epochs_to_save: 3,
            unstake_hold_blocks: 20,
            latest_param_change: 40,
        }
    );
    assert_eq!(calc.blocks_to_save(39).unwrap(), 30);
    assert_eq!(calc.blocks_to_save(40).unwrap(), 21);
}

#[test]
fn genesis_epoch_has_no_predecessor() {
    let store = FixationStore::in_memory();
    params::seed_genesis(
        &store,
        &Params {
            epoch_blocks: 10,
            epochs_to_save: 3,
            unstake_hold_blocks: 20,
            latest_param_change: 0,
        },
    )
    .unwrap();
    let calc = EpochCalculator::new(&store);

    assert!(matches!(
        calc.previous_epoch_start(9).unwrap_err(),
        EpochError::BeyondGenesisEpoch { height: 9 }
    ));
}

#[test]
fn history_before_first_fixation_is_unreachable() {
    let store = FixationStore::in_memory();
    store
        .set_current(&FixedHeight(5), ParamKey::EpochsToSave, &3_u64)
        .unwrap();

    assert!(matches!(
        store.get_as_of(ParamKey::EpochsToSave, 4).unwrap_err(),
        FixationError::NoFixationBeforeHeight {
            key: ParamKey::EpochsToSave,
            height: 4,
            earliest: 5,
        }
    ));
}

#[test]
fn exported_log_reproduces_epoch_answers() {
    let config = EpochStoreConfig::parse(CONFIG).unwrap();
    let store = FixationStore::in_memory();
    params::seed_genesis(&store, &config.genesis.to_params()).unwrap();
    let mut clock = BlockClock::new();
    replay::run_replay(&store, &mut clock, &config.replay, &mut NoOpCallback).unwrap();

    let restored = FixationStore::in_memory();
    restored.import(store.export().unwrap()).unwrap();

    let original = EpochCalculator::new(&store);
    let copy = EpochCalculator::new(&restored);
    for height in 0..80 {
        assert_eq!(copy.geometry(height).unwrap(), original.geometry(height).unwrap());
    }
}
