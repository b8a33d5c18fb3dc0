//! Error types for the fixation store.
//!
//! [`FixationError`] is what every store operation returns. Backend
//! failures are wrapped in [`FixationError::Backend`] unchanged.

use epochstore_types::{Height, ParamKey};

/// Failure reported by a [`FixationBackend`](crate::FixationBackend).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// The underlying storage engine rejected or failed the operation.
    #[error("storage failure: {reason}")]
    Storage {
        /// Description of the failure.
        reason: String,
    },

    /// The stored data violates the record ordering invariant.
    #[error("corrupt fixation data: {reason}")]
    Corrupt {
        /// Description of the inconsistency.
        reason: String,
    },
}

/// Errors returned by [`FixationStore`](crate::FixationStore) operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FixationError {
    /// No fixation has ever been recorded for the key.
    ///
    /// Post-genesis this indicates an initialization bug.
    #[error("unknown parameter key {key}: no fixation has been recorded")]
    UnknownParameterKey {
        /// The key that was queried.
        key: ParamKey,
    },

    /// Every recorded fixation for the key is newer than the queried height.
    #[error(
        "no fixation of {key} at or before height {height} (earliest fixation is at {earliest})"
    )]
    NoFixationBeforeHeight {
        /// The key that was queried.
        key: ParamKey,
        /// The queried height.
        height: Height,
        /// Effective height of the oldest retained fixation.
        earliest: Height,
    },

    /// An append targeted a height below the key's latest fixation.
    #[error("fixation of {key} at height {height} precedes latest fixation at {latest}")]
    NonMonotonicHeight {
        /// The key being fixated.
        key: ParamKey,
        /// The rejected height.
        height: Height,
        /// Effective height of the latest existing fixation.
        latest: Height,
    },

    /// An append targeted a height that already has a fixation for the key.
    #[error("{key} is already fixated at height {height}")]
    HeightAlreadyFixated {
        /// The key being fixated.
        key: ParamKey,
        /// The duplicated height.
        height: Height,
    },

    /// An epoch length of zero was offered for fixation.
    #[error("epoch length fixated at height {height} must be at least 1")]
    InvalidEpochLength {
        /// Height of the rejected fixation.
        height: Height,
    },

    /// A value could not be encoded or decoded.
    #[error("codec error for {key}: {reason}")]
    Codec {
        /// The key whose value failed to convert.
        key: ParamKey,
        /// The codec's description of the failure.
        reason: String,
    },

    /// The storage backend failed.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}
