//! Epoch boundaries derived from the fixated epoch length.
//!
//! The epoch grid is anchored at the height where the epoch length in
//! effect took effect, not at height 0:
//!
//! ```text
//! block_in_epoch(h) = (h - fixation_height(h)) % epoch_blocks(h)
//! epoch_start(h)    = h - block_in_epoch(h)
//! ```
//!
//! A change of epoch length therefore re-anchors the grid at the change
//! height, while heights before the change keep resolving against the
//! length that was in effect for them.
//!
//! # Design Principles
//!
//! - [`EpochCalculator`] holds no state. Every query re-reads the fixation
//!   store, so answers are identical under replay.
//! - [`EpochCalculator::next_epoch_start`] is a prediction: it assumes no
//!   further change before the next epoch begins.
//! - [`EpochCalculator::is_epoch_start`] never fails. A read error is
//!   logged and answered with `false`; callers that need the error use
//!   [`EpochCalculator::block_in_epoch`].

use core::fmt;

use tracing::error;

use epochstore_fixation::{
    FixationBackend, FixationError, FixationStore, HeightSource, JsonCodec, MemoryBackend,
    ParamCodec,
};
use epochstore_types::{EpochGeometry, Height, ParamKey};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors returned by epoch calculations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EpochError {
    /// A fixation read failed. Propagated unchanged from the store.
    #[error(transparent)]
    Fixation(#[from] FixationError),

    /// There is no epoch before the one starting at height 0.
    #[error("no epoch precedes the genesis epoch (queried height {height})")]
    BeyondGenesisEpoch {
        /// The queried height.
        height: Height,
    },

    /// The fixated epoch length is zero. Fatal: the parameter-change path
    /// let an invalid value through.
    #[error("invalid epoch length {length} fixated at height {fixation_height}")]
    InvalidEpochLength {
        /// The invalid length.
        length: u64,
        /// Height at which the invalid length took effect.
        fixation_height: Height,
    },

    /// The store returned a fixation newer than the queried height.
    #[error("fixation at height {fixation_height} returned for earlier height {height}")]
    FixationAboveHeight {
        /// The queried height.
        height: Height,
        /// Effective height of the returned fixation.
        fixation_height: Height,
    },

    /// A derived height does not fit in a `u64`.
    #[error("height arithmetic overflow at height {height}")]
    HeightOverflow {
        /// The queried height.
        height: Height,
    },

    /// Blocks-to-save could not be computed.
    #[error(transparent)]
    BlocksToSave(#[from] BlocksToSaveError),
}

/// Every failure met while computing blocks-to-save.
///
/// Both factors are read independently, so both failures are kept.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("BlocksToSave param read errors: {}", join_errors(.errors))]
pub struct BlocksToSaveError {
    /// The underlying errors, in read order (epochs-to-save first).
    pub errors: Vec<EpochError>,
}

fn join_errors(errors: &[EpochError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// ---------------------------------------------------------------------------
// Calculator
// ---------------------------------------------------------------------------

/// Start of the epoch containing a height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpochStart {
    /// First block of the epoch.
    pub start: Height,
    /// Offset of the queried height within the epoch.
    pub block_in_epoch: u64,
}

/// Stateless epoch arithmetic over a [`FixationStore`].
pub struct EpochCalculator<'a, B = MemoryBackend, C = JsonCodec> {
    store: &'a FixationStore<B, C>,
}

impl<B, C> fmt::Debug for EpochCalculator<'_, B, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EpochCalculator").finish_non_exhaustive()
    }
}

impl<'a, B: FixationBackend, C: ParamCodec> EpochCalculator<'a, B, C> {
    /// Create a calculator reading from `store`.
    pub const fn new(store: &'a FixationStore<B, C>) -> Self {
        Self { store }
    }

    /// The epoch length in effect at `height` and the height at which it
    /// took effect.
    ///
    /// # Errors
    ///
    /// Returns [`EpochError::Fixation`] if the read fails, or
    /// [`EpochError::InvalidEpochLength`] if the fixated length is zero.
    pub fn fixated_epoch_blocks(&self, height: Height) -> Result<(u64, Height), EpochError> {
        let (length, fixation_height) = self
            .store
            .get_value_as_of::<u64>(ParamKey::EpochBlocks, height)?;
        if length == 0 {
            return Err(EpochError::InvalidEpochLength {
                length,
                fixation_height,
            });
        }
        Ok((length, fixation_height))
    }

    /// The epoch length in effect at `height`.
    ///
    /// # Errors
    ///
    /// Same as [`fixated_epoch_blocks`](Self::fixated_epoch_blocks).
    pub fn epoch_blocks(&self, height: Height) -> Result<u64, EpochError> {
        Ok(self.fixated_epoch_blocks(height)?.0)
    }

    /// The number of epochs to save in effect at `height`.
    ///
    /// # Errors
    ///
    /// Returns [`EpochError::Fixation`] if the read fails.
    pub fn epochs_to_save(&self, height: Height) -> Result<u64, EpochError> {
        Ok(self
            .store
            .get_value_as_of::<u64>(ParamKey::EpochsToSave, height)?
            .0)
    }

    /// The unstake hold period in effect at `height`.
    ///
    /// # Errors
    ///
    /// Returns [`EpochError::Fixation`] if the read fails.
    pub fn unstake_hold_blocks(&self, height: Height) -> Result<u64, EpochError> {
        Ok(self
            .store
            .get_value_as_of::<u64>(ParamKey::UnstakeHoldBlocks, height)?
            .0)
    }

    /// Offset of `height` within its epoch.
    ///
    /// # Errors
    ///
    /// Returns any error from [`fixated_epoch_blocks`](Self::fixated_epoch_blocks).
    pub fn block_in_epoch(&self, height: Height) -> Result<u64, EpochError> {
        let (length, fixation_height) = self.fixated_epoch_blocks(height)?;
        let since_anchor =
            height
                .checked_sub(fixation_height)
                .ok_or(EpochError::FixationAboveHeight {
                    height,
                    fixation_height,
                })?;
        since_anchor
            .checked_rem(length)
            .ok_or(EpochError::InvalidEpochLength {
                length,
                fixation_height,
            })
    }

    /// Start of the epoch containing `height`, with the offset of `height`
    /// inside it. Guarantees `start <= height < start + length`.
    ///
    /// # Errors
    ///
    /// Returns any error from [`block_in_epoch`](Self::block_in_epoch).
    pub fn epoch_start(&self, height: Height) -> Result<EpochStart, EpochError> {
        let block_in_epoch = self.block_in_epoch(height)?;
        let start = height
            .checked_sub(block_in_epoch)
            .ok_or(EpochError::HeightOverflow { height })?;
        Ok(EpochStart {
            start,
            block_in_epoch,
        })
    }

    /// Predicted start of the epoch after the one containing `height`.
    ///
    /// Assumes the epoch length does not change before then. If it does,
    /// queries made at the new heights re-read the fixation and resolve
    /// correctly.
    ///
    /// # Errors
    ///
    /// Returns any read error, or [`EpochError::HeightOverflow`] if the
    /// next start does not fit in a `u64`.
    pub fn next_epoch_start(&self, height: Height) -> Result<Height, EpochError> {
        let EpochStart { start, .. } = self.epoch_start(height)?;
        let length = self.epoch_blocks(height)?;
        start
            .checked_add(length)
            .ok_or(EpochError::HeightOverflow { height })
    }

    /// Start of the epoch before the one containing `height`.
    ///
    /// Resolved by an independent lookup at the block just before the
    /// current epoch's start, since the epoch length may have differed
    /// there.
    ///
    /// # Errors
    ///
    /// Returns [`EpochError::BeyondGenesisEpoch`] if the current epoch
    /// starts at height 0, or any read error from either lookup.
    pub fn previous_epoch_start(&self, height: Height) -> Result<Height, EpochError> {
        let EpochStart { start, .. } = self.epoch_start(height)?;
        let Some(last_of_previous) = start.checked_sub(1) else {
            return Err(EpochError::BeyondGenesisEpoch { height });
        };
        Ok(self.epoch_start(last_of_previous)?.start)
    }

    /// Whether `height` is the first block of an epoch.
    ///
    /// Read failures are logged and answered with `false`.
    pub fn is_epoch_start(&self, height: Height) -> bool {
        match self.block_in_epoch(height) {
            Ok(offset) => offset == 0,
            Err(err) => {
                error!(height, %err, "IsEpochStart: can't get block in epoch");
                false
            }
        }
    }

    /// Whether the block currently being executed starts an epoch.
    pub fn is_current_epoch_start(&self, clock: &impl HeightSource) -> bool {
        self.is_epoch_start(clock.current_height())
    }

    /// Blocks of history to keep at `height`: epochs-to-save times the
    /// epoch length, both as fixated at `height`.
    ///
    /// # Errors
    ///
    /// Returns [`BlocksToSaveError`] carrying every failed read (both, if
    /// both fail), or an overflow of the product.
    pub fn blocks_to_save(&self, height: Height) -> Result<u64, BlocksToSaveError> {
        let epochs_to_save = self.epochs_to_save(height);
        let epoch_blocks = self.epoch_blocks(height);

        match (epochs_to_save, epoch_blocks) {
            (Ok(epochs), Ok(blocks)) => epochs.checked_mul(blocks).ok_or_else(|| BlocksToSaveError {
                errors: vec![EpochError::HeightOverflow { height }],
            }),
            (epochs, blocks) => Err(BlocksToSaveError {
                errors: [epochs.err(), blocks.err()].into_iter().flatten().collect(),
            }),
        }
    }

    /// Oldest height whose state must still be kept at `height`: the start
    /// of the current epoch minus blocks-to-save, floored at 0.
    ///
    /// This is the horizon below which fixations may be pruned.
    ///
    /// # Errors
    ///
    /// Returns any error from [`epoch_start`](Self::epoch_start) or
    /// [`blocks_to_save`](Self::blocks_to_save).
    pub fn earliest_saved_height(&self, height: Height) -> Result<Height, EpochError> {
        let EpochStart { start, .. } = self.epoch_start(height)?;
        let keep = self.blocks_to_save(height)?;
        Ok(start.saturating_sub(keep))
    }

    /// Every epoch boundary of `height` in one value.
    ///
    /// `previous_epoch_start` is `None` inside the genesis epoch.
    ///
    /// # Errors
    ///
    /// Returns any read error other than [`EpochError::BeyondGenesisEpoch`].
    pub fn geometry(&self, height: Height) -> Result<EpochGeometry, EpochError> {
        let EpochStart {
            start,
            block_in_epoch,
        } = self.epoch_start(height)?;
        let next_epoch_start = self.next_epoch_start(height)?;
        let previous_epoch_start = match self.previous_epoch_start(height) {
            Ok(previous) => Some(previous),
            Err(EpochError::BeyondGenesisEpoch { .. }) => None,
            Err(err) => return Err(err),
        };
        Ok(EpochGeometry {
            height,
            epoch_start: start,
            block_in_epoch,
            next_epoch_start,
            previous_epoch_start,
        })
    }
}
