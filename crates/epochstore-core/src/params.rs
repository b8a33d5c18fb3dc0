//! Aggregate parameter reads and writes.
//!
//! Individual fixations live in the [`FixationStore`]; this module treats
//! the fixated keys as one [`Params`] value. It is also the one place where
//! parameter values are validated, so an invalid epoch length never reaches
//! the store.

use tracing::info;

use epochstore_fixation::{
    FixationBackend, FixationError, FixationStore, FixedHeight, HeightSource, ParamCodec,
};
use epochstore_types::{Height, ParamKey, Params};

/// Height at which genesis parameters take effect.
pub const GENESIS_HEIGHT: Height = 0;

/// Errors that can occur when reading or writing parameters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParamsError {
    /// The epoch length must be at least 1.
    #[error("invalid epoch length {0}: must be at least 1")]
    InvalidEpochLength(u64),

    /// Genesis parameters can only be written to an empty store.
    #[error("genesis already seeded: store holds {records} fixation records")]
    AlreadySeeded {
        /// Number of records already present.
        records: usize,
    },

    /// A fixation read or write failed.
    #[error("fixation error: {0}")]
    Fixation(#[from] FixationError),
}

/// Check a parameter set before any of it is fixated.
///
/// # Errors
///
/// Returns [`ParamsError::InvalidEpochLength`] if `epoch_blocks` is zero.
pub const fn validate(params: &Params) -> Result<(), ParamsError> {
    if params.epoch_blocks == 0 {
        return Err(ParamsError::InvalidEpochLength(params.epoch_blocks));
    }
    Ok(())
}

/// Fixate every parameter at [`GENESIS_HEIGHT`].
///
/// Because genesis is the smallest possible height, no later query can
/// predate a key's history.
///
/// # Errors
///
/// Returns [`ParamsError::InvalidEpochLength`] for invalid params,
/// [`ParamsError::AlreadySeeded`] if the store is not empty, or
/// [`ParamsError::Fixation`] if a write fails.
pub fn seed_genesis<B: FixationBackend, C: ParamCodec>(
    store: &FixationStore<B, C>,
    params: &Params,
) -> Result<(), ParamsError> {
    validate(params)?;
    if !store.is_empty() {
        return Err(ParamsError::AlreadySeeded {
            records: store.record_count(),
        });
    }

    let values: Vec<(ParamKey, u64)> = ParamKey::ALL
        .into_iter()
        .map(|key| (key, params.value_of(key)))
        .collect();
    store.set_current_many(&FixedHeight(GENESIS_HEIGHT), &values)?;
    info!(
        epoch_blocks = params.epoch_blocks,
        epochs_to_save = params.epochs_to_save,
        unstake_hold_blocks = params.unstake_hold_blocks,
        "Genesis parameters fixated"
    );
    Ok(())
}

/// The current (latest) value of every parameter.
///
/// # Errors
///
/// Returns [`ParamsError::Fixation`] if any key has never been fixated or
/// cannot be decoded.
pub fn get_params<B: FixationBackend, C: ParamCodec>(
    store: &FixationStore<B, C>,
) -> Result<Params, ParamsError> {
    Ok(Params {
        epoch_blocks: epoch_blocks_raw(store)?,
        epochs_to_save: epochs_to_save_raw(store)?,
        unstake_hold_blocks: unstake_hold_blocks_raw(store)?,
        latest_param_change: latest_param_change(store),
    })
}

/// Fixate every parameter whose value differs from its current value,
/// effective at the clock's height. Returns the keys that changed.
///
/// The changed keys are fixated together: if any of them is rejected (for
/// example because it already changed in this block), none is written.
/// `params.latest_param_change` is ignored; it is derived from the store.
///
/// # Errors
///
/// Returns [`ParamsError::InvalidEpochLength`] if the params are invalid,
/// or [`ParamsError::Fixation`] if the store rejects the change. Nothing
/// is written in either case.
pub fn set_params<B: FixationBackend, C: ParamCodec>(
    store: &FixationStore<B, C>,
    clock: &impl HeightSource,
    params: &Params,
) -> Result<Vec<ParamKey>, ParamsError> {
    validate(params)?;

    let updates: Vec<(ParamKey, u64)> = ParamKey::ALL
        .into_iter()
        .map(|key| (key, params.value_of(key)))
        .filter(|&(key, value)| store.get_current_value::<u64>(key).ok() != Some(value))
        .collect();
    if !updates.is_empty() {
        store.set_current_many(clock, &updates)?;
    }
    let changed: Vec<ParamKey> = updates.into_iter().map(|(key, _)| key).collect();

    if !changed.is_empty() {
        info!(
            height = clock.current_height(),
            changed = ?changed,
            "Parameters changed"
        );
    }
    Ok(changed)
}

/// The current epoch length.
///
/// # Errors
///
/// Returns [`FixationError`] if the key was never fixated or cannot be decoded.
pub fn epoch_blocks_raw<B: FixationBackend, C: ParamCodec>(
    store: &FixationStore<B, C>,
) -> Result<u64, FixationError> {
    store.get_current_value(ParamKey::EpochBlocks)
}

/// The current number of epochs to save.
///
/// # Errors
///
/// Returns [`FixationError`] if the key was never fixated or cannot be decoded.
pub fn epochs_to_save_raw<B: FixationBackend, C: ParamCodec>(
    store: &FixationStore<B, C>,
) -> Result<u64, FixationError> {
    store.get_current_value(ParamKey::EpochsToSave)
}

/// The current unstake hold period.
///
/// # Errors
///
/// Returns [`FixationError`] if the key was never fixated or cannot be decoded.
pub fn unstake_hold_blocks_raw<B: FixationBackend, C: ParamCodec>(
    store: &FixationStore<B, C>,
) -> Result<u64, FixationError> {
    store.get_current_value(ParamKey::UnstakeHoldBlocks)
}

/// Height of the most recent parameter change (genesis if none).
pub fn latest_param_change<B: FixationBackend, C: ParamCodec>(
    store: &FixationStore<B, C>,
) -> Height {
    store.latest_change_height().unwrap_or(GENESIS_HEIGHT)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::clock::BlockClock;

    fn genesis_params() -> Params {
        Params {
            epoch_blocks: 20,
            epochs_to_save: 25,
            unstake_hold_blocks: 210,
            latest_param_change: 0,
        }
    }

    fn seeded() -> FixationStore {
        let store = FixationStore::in_memory();
        seed_genesis(&store, &genesis_params()).unwrap();
        store
    }

    #[test]
    fn genesis_fixates_every_key_at_zero() {
        let store = seeded();
        for key in ParamKey::ALL {
            assert_eq!(store.get_current(key).unwrap().effective_height, 0);
        }
        assert_eq!(get_params(&store).unwrap(), genesis_params());
    }

    #[test]
    fn genesis_is_written_once() {
        let store = seeded();
        assert_eq!(
            seed_genesis(&store, &genesis_params()).unwrap_err(),
            ParamsError::AlreadySeeded { records: 3 }
        );
    }

    #[test]
    fn zero_epoch_length_is_rejected_before_any_write() {
        let store = FixationStore::in_memory();
        let bad = Params {
            epoch_blocks: 0,
            ..genesis_params()
        };
        assert_eq!(
            seed_genesis(&store, &bad).unwrap_err(),
            ParamsError::InvalidEpochLength(0)
        );
        assert!(store.is_empty());

        let store = seeded();
        let clock = BlockClock::from_height(50);
        assert_eq!(
            set_params(&store, &clock, &bad).unwrap_err(),
            ParamsError::InvalidEpochLength(0)
        );
        assert_eq!(store.record_count(), 3);
    }

    #[test]
    fn set_params_fixates_only_changed_keys() {
        let store = seeded();
        let clock = BlockClock::from_height(120);
        let next = Params {
            epoch_blocks: 15,
            ..genesis_params()
        };

        let changed = set_params(&store, &clock, &next).unwrap();
        assert_eq!(changed, vec![ParamKey::EpochBlocks]);
        assert_eq!(store.history(ParamKey::EpochBlocks).unwrap().len(), 2);
        assert_eq!(store.history(ParamKey::EpochsToSave).unwrap().len(), 1);

        let params = get_params(&store).unwrap();
        assert_eq!(params.epoch_blocks, 15);
        assert_eq!(params.latest_param_change, 120);
    }

    #[test]
    fn rejected_change_writes_nothing() {
        let store = seeded();
        let clock = BlockClock::from_height(40);
        let first = Params {
            unstake_hold_blocks: 150,
            ..genesis_params()
        };
        set_params(&store, &clock, &first).unwrap();

        // A second change in the same block touches the key that already
        // moved at 40, so the whole change is refused.
        let second = Params {
            epochs_to_save: 5,
            unstake_hold_blocks: 120,
            ..genesis_params()
        };
        assert_eq!(
            set_params(&store, &clock, &second).unwrap_err(),
            ParamsError::Fixation(FixationError::HeightAlreadyFixated {
                key: ParamKey::UnstakeHoldBlocks,
                height: 40,
            })
        );
        assert_eq!(store.history(ParamKey::EpochsToSave).unwrap().len(), 1);
        assert_eq!(
            get_params(&store).unwrap(),
            Params {
                unstake_hold_blocks: 150,
                latest_param_change: 40,
                ..genesis_params()
            }
        );

        // The same change one block later goes through.
        let changed = set_params(&store, &BlockClock::from_height(41), &second).unwrap();
        assert_eq!(changed, vec![ParamKey::EpochsToSave, ParamKey::UnstakeHoldBlocks]);
    }

    #[test]
    fn set_params_with_same_values_is_a_no_op() {
        let store = seeded();
        let clock = BlockClock::from_height(10);
        assert!(set_params(&store, &clock, &genesis_params()).unwrap().is_empty());
        assert_eq!(latest_param_change(&store), 0);
    }

    #[test]
    fn set_params_fills_unset_keys() {
        let store = FixationStore::in_memory();
        let clock = BlockClock::new();
        let changed = set_params(&store, &clock, &genesis_params()).unwrap();
        assert_eq!(changed, ParamKey::ALL.to_vec());
    }

    #[test]
    fn raw_reads_fail_on_empty_store() {
        let store = FixationStore::in_memory();
        assert!(matches!(
            get_params(&store).unwrap_err(),
            ParamsError::Fixation(FixationError::UnknownParameterKey { .. })
        ));
        assert_eq!(latest_param_change(&store), GENESIS_HEIGHT);
    }
}
