//! Append-only fixation log for height-indexed parameters.
//!
//! A *fixation* is a parameter value tagged with the height at which it
//! took effect. For every [`ParamKey`] the store keeps an append-only,
//! strictly height-ordered sequence of [`FixationRecord`]s and answers the
//! question "what was the value of this key as of height H?".
//!
//! # Architecture
//!
//! ```text
//! FixationStore
//!     |
//!     +-- RwLock --+-- FixationBackend   (ordered (key, height) -> bytes)
//!     |            +-- Parameter Set     (latest record per key, cached)
//!     |
//!     +-- ParamCodec                     (typed value <-> bytes)
//! ```
//!
//! - [`backend`] -- The [`FixationBackend`] trait and the in-memory
//!   [`MemoryBackend`].
//! - [`codec`] -- The [`ParamCodec`] trait and the JSON default.
//! - [`height`] -- The [`HeightSource`] seam for the execution height.
//! - [`store`] -- The [`FixationStore`] itself.
//! - [`error`] -- Store and backend error types.
//!
//! # Determinism
//!
//! [`FixationStore::get_as_of`] only ever reads records whose effective
//! height is at or below the queried height, so a record appended for a
//! later height can never change the answer for an earlier one.
//!
//! # Usage
//!
//! ```
//! use epochstore_fixation::{FixationStore, FixedHeight};
//! use epochstore_types::ParamKey;
//!
//! let store = FixationStore::in_memory();
//! store.set_current(&FixedHeight(0), ParamKey::EpochBlocks, &10_u64).ok();
//! store.set_current(&FixedHeight(40), ParamKey::EpochBlocks, &7_u64).ok();
//!
//! let (length, since) = store
//!     .get_value_as_of::<u64>(ParamKey::EpochBlocks, 35)
//!     .unwrap_or((0, 0));
//! assert_eq!((length, since), (10, 0));
//! ```
//!
//! [`ParamKey`]: epochstore_types::ParamKey
//! [`FixationRecord`]: epochstore_types::FixationRecord

pub mod backend;
pub mod codec;
pub mod error;
pub mod height;
pub mod store;

// Re-export primary types at crate root.
pub use backend::{FixationBackend, MemoryBackend};
pub use codec::{CodecError, JsonCodec, ParamCodec};
pub use error::{BackendError, FixationError};
pub use height::{FixedHeight, HeightSource};
pub use store::{FixationStore, ParameterSet};
