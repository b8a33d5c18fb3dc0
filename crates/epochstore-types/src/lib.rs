//! Shared type definitions for the fixation-based parameter store.
//!
//! This crate holds the value types that flow between the fixation store,
//! the epoch calculator, and the replay driver. Nothing here performs I/O
//! or holds state.
//!
//! # Modules
//!
//! - [`enums`] -- The closed set of fixated parameter keys.
//! - [`structs`] -- Fixation records, the aggregate parameter view, and
//!   derived epoch geometry.

pub mod enums;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{ParamKey, UnknownParamKey};
pub use structs::{EpochGeometry, FixationRecord, Params};

/// A position in the state machine's execution sequence (a block number).
pub type Height = u64;
