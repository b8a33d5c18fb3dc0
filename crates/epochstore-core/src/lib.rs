//! Epoch arithmetic, parameter management, and block replay over the
//! fixation store.
//!
//! Every epoch boundary is derived from the epoch length *as fixated at
//! the queried height*, so a parameter change re-anchors the epoch grid
//! from the change height onward without disturbing earlier epochs.
//!
//! # Modules
//!
//! - [`clock`] -- Block height counter implementing [`HeightSource`].
//! - [`config`] -- Configuration loading from `epochstore-config.yaml` into
//!   strongly-typed structs.
//! - [`epoch`] -- The stateless [`EpochCalculator`].
//! - [`params`] -- Genesis seeding and aggregate parameter reads/writes.
//! - [`replay`] -- Deterministic block loop that applies scheduled
//!   parameter changes and fires epoch-start callbacks.
//!
//! [`HeightSource`]: epochstore_fixation::HeightSource
//! [`EpochCalculator`]: epoch::EpochCalculator

pub mod clock;
pub mod config;
pub mod epoch;
pub mod params;
pub mod replay;
