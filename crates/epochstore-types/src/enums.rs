//! Enumeration types for the parameter store.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// A parameter whose value is fixated per height.
///
/// The variant order is the storage order: records are indexed by
/// `(ParamKey, height)`, so all fixations of one key are contiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ParamKey {
    /// Number of blocks in one epoch (the epoch length).
    EpochBlocks,
    /// Number of epochs of history the chain keeps.
    EpochsToSave,
    /// Blocks a provider must wait after unstaking before funds are released.
    UnstakeHoldBlocks,
}

impl ParamKey {
    /// Every fixated key, in storage order.
    pub const ALL: [Self; 3] = [Self::EpochBlocks, Self::EpochsToSave, Self::UnstakeHoldBlocks];

    /// Canonical storage name of the key.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EpochBlocks => "EpochBlocks",
            Self::EpochsToSave => "EpochsToSave",
            Self::UnstakeHoldBlocks => "UnstakeHoldBlocks",
        }
    }
}

impl fmt::Display for ParamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a storage name does not match any [`ParamKey`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown parameter key: {0}")]
pub struct UnknownParamKey(pub String);

impl FromStr for ParamKey {
    type Err = UnknownParamKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| UnknownParamKey(s.to_owned()))
    }
}
