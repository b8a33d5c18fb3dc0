//! Deterministic block replay.
//!
//! [`run_replay`] executes a bounded run of blocks against a fixation
//! store. For every block it:
//!
//! 1. applies the parameter changes scheduled for that height,
//! 2. checks whether the height starts an epoch and, if so, reports the
//!    epoch geometry to the [`BlockCallback`],
//! 3. optionally prunes fixations below the retention horizon,
//!
//! then advances the clock. Running the same schedule against the same
//! genesis always produces the same epoch starts.

use tracing::{debug, info, warn};

use epochstore_fixation::{FixationBackend, FixationError, FixationStore, ParamCodec};
use epochstore_types::{EpochGeometry, Height, ParamKey};

use crate::clock::{BlockClock, ClockError};
use crate::config::ReplayConfig;
use crate::epoch::{EpochCalculator, EpochError};
use crate::params::{self, ParamsError};

/// Errors that can occur during a replay run.
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    /// The block clock could not advance.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },

    /// An epoch calculation failed.
    #[error("epoch error: {source}")]
    Epoch {
        /// The underlying epoch error.
        #[from]
        source: EpochError,
    },

    /// A scheduled parameter change was rejected.
    #[error("params error: {source}")]
    Params {
        /// The underlying params error.
        #[from]
        source: ParamsError,
    },

    /// Pruning the fixation log failed.
    #[error("fixation error: {source}")]
    Fixation {
        /// The underlying fixation error.
        #[from]
        source: FixationError,
    },
}

/// Summary of a replay run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayResult {
    /// Number of blocks executed.
    pub blocks_executed: u64,
    /// Heights that started an epoch, in order.
    pub epoch_starts: Vec<Height>,
    /// Number of scheduled changes that fixated at least one key.
    pub param_changes_applied: u64,
    /// Number of fixation records removed by pruning.
    pub records_pruned: u64,
}

/// Hooks invoked during a replay run.
pub trait BlockCallback {
    /// Called when a block starts a new epoch.
    fn on_epoch_start(&mut self, geometry: &EpochGeometry);

    /// Called after a scheduled change fixated at least one key.
    fn on_param_change(&mut self, _height: Height, _changed: &[ParamKey]) {}
}

/// A no-op callback.
pub struct NoOpCallback;

impl BlockCallback for NoOpCallback {
    fn on_epoch_start(&mut self, _geometry: &EpochGeometry) {}
}

/// Execute `config.blocks` blocks starting at the clock's current height.
///
/// Scheduled changes below the starting height are skipped. On return the
/// clock points at the first block not executed.
///
/// # Errors
///
/// Returns [`ReplayError`] if a parameter change is rejected, an epoch
/// calculation or prune fails, or the clock overflows.
pub fn run_replay<B: FixationBackend, C: ParamCodec>(
    store: &FixationStore<B, C>,
    clock: &mut BlockClock,
    config: &ReplayConfig,
    callback: &mut dyn BlockCallback,
) -> Result<ReplayResult, ReplayError> {
    let calc = EpochCalculator::new(store);
    let mut result = ReplayResult::default();

    let start_height = clock.height();
    let mut pending = config
        .param_changes
        .iter()
        .filter(|change| change.height >= start_height)
        .peekable();

    info!(
        start_height,
        blocks = config.blocks,
        scheduled_changes = config.param_changes.len(),
        prune = config.prune,
        "Replay starting"
    );

    for _ in 0..config.blocks {
        let height = clock.height();

        // --- Scheduled parameter changes ---
        while let Some(change) = pending.next_if(|change| change.height == height) {
            let current = params::get_params(store)?;
            let next = change.apply_to(&current);
            let changed = params::set_params(store, clock, &next)?;
            if changed.is_empty() {
                warn!(height, "Scheduled param change matched current values");
                continue;
            }
            result.param_changes_applied = result.param_changes_applied.saturating_add(1);
            callback.on_param_change(height, &changed);
        }

        // --- Epoch boundary ---
        if calc.is_epoch_start(height) {
            let geometry = calc.geometry(height)?;
            info!(
                height,
                next_epoch_start = geometry.next_epoch_start,
                previous_epoch_start = ?geometry.previous_epoch_start,
                "Epoch start"
            );
            result.epoch_starts.push(height);
            callback.on_epoch_start(&geometry);

            if config.prune {
                let horizon = calc.earliest_saved_height(height)?;
                for key in ParamKey::ALL {
                    let removed = store.prune_before(key, horizon)?;
                    let removed = u64::try_from(removed).unwrap_or(u64::MAX);
                    result.records_pruned = result.records_pruned.saturating_add(removed);
                }
                debug!(height, horizon, "Retention horizon applied");
            }
        }

        result.blocks_executed = result.blocks_executed.saturating_add(1);
        clock.advance()?;
    }

    info!(
        blocks_executed = result.blocks_executed,
        epoch_starts = result.epoch_starts.len(),
        param_changes_applied = result.param_changes_applied,
        records_pruned = result.records_pruned,
        "Replay finished"
    );
    Ok(result)
}
