//! Core record and view structs.
//!
//! [`FixationRecord`] is the only type that is ever persisted. [`Params`]
//! and [`EpochGeometry`] are projections recomputed on demand.

use serde::{Deserialize, Serialize};

use crate::Height;
use crate::enums::ParamKey;

// ---------------------------------------------------------------------------
// Fixation record
// ---------------------------------------------------------------------------

/// A parameter value tagged with the height at which it took effect.
///
/// For a fixed key, records are totally ordered by `effective_height` and
/// no two records share a height.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixationRecord {
    /// The parameter this record belongs to.
    pub key: ParamKey,
    /// Encoded parameter value, opaque to the store.
    pub value: Vec<u8>,
    /// First height at which `value` is in effect.
    pub effective_height: Height,
}

impl FixationRecord {
    /// Create a record from its parts.
    pub const fn new(key: ParamKey, value: Vec<u8>, effective_height: Height) -> Self {
        Self {
            key,
            value,
            effective_height,
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregate parameter view
// ---------------------------------------------------------------------------

/// The current value of every parameter, as a single struct.
///
/// `latest_param_change` is not a parameter in its own right: it is the
/// greatest effective height among the latest fixation of every key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params {
    /// Epoch length in blocks.
    pub epoch_blocks: u64,
    /// Epochs of history to keep.
    pub epochs_to_save: u64,
    /// Unstake hold period in blocks.
    pub unstake_hold_blocks: u64,
    /// Height of the most recent parameter change.
    #[serde(default)]
    pub latest_param_change: Height,
}

impl Params {
    /// The value this struct holds for a fixated key.
    pub const fn value_of(&self, key: ParamKey) -> u64 {
        match key {
            ParamKey::EpochBlocks => self.epoch_blocks,
            ParamKey::EpochsToSave => self.epochs_to_save,
            ParamKey::UnstakeHoldBlocks => self.unstake_hold_blocks,
        }
    }
}

// ---------------------------------------------------------------------------
// Epoch geometry
// ---------------------------------------------------------------------------

/// Derived epoch boundaries for one height. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochGeometry {
    /// The height this geometry was computed for.
    pub height: Height,
    /// First block of the epoch containing `height`.
    pub epoch_start: Height,
    /// Offset of `height` within its epoch.
    pub block_in_epoch: u64,
    /// Predicted start of the following epoch, assuming no further change.
    pub next_epoch_start: Height,
    /// Start of the preceding epoch, `None` within the genesis epoch.
    pub previous_epoch_start: Option<Height>,
}
