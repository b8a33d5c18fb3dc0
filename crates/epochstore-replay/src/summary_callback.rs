//! Block callback that tracks epoch lengths across a replay run.
//!
//! The replay loop already logs each epoch start; this callback keeps the
//! aggregate view (how many epochs began, the shortest and longest epoch
//! seen, which keys changed) so `main` can report it once at shutdown.

use epochstore_core::replay::BlockCallback;
use epochstore_types::{EpochGeometry, Height, ParamKey};
use tracing::{debug, info};

/// Callback that accumulates epoch statistics during a replay.
///
/// An epoch's length is only known once the next epoch starts, since a
/// parameter change can cut it short. Lengths are therefore measured
/// between consecutive epoch starts; the epoch still open when the replay
/// stops is not counted.
#[derive(Debug, Default)]
pub struct SummaryCallback {
    epochs: u64,
    last_start: Option<Height>,
    shortest: Option<u64>,
    longest: Option<u64>,
    changes: Vec<(Height, Vec<ParamKey>)>,
}

impl SummaryCallback {
    /// Create an empty summary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Log the accumulated statistics.
    pub fn log_summary(&self) {
        info!(
            epochs = self.epochs,
            shortest_epoch = ?self.shortest,
            longest_epoch = ?self.longest,
            param_changes = self.changes.len(),
            "Epoch summary"
        );
        for (height, keys) in &self.changes {
            info!(height, changed = ?keys, "Param change");
        }
    }
}

impl BlockCallback for SummaryCallback {
    fn on_epoch_start(&mut self, geometry: &EpochGeometry) {
        let start = geometry.epoch_start;
        self.epochs = self.epochs.saturating_add(1);
        if let Some(previous) = self.last_start.replace(start) {
            let length = start.saturating_sub(previous);
            self.shortest = Some(self.shortest.map_or(length, |s| s.min(length)));
            self.longest = Some(self.longest.map_or(length, |l| l.max(length)));
            debug!(start = previous, length, "Epoch completed");
        }
    }

    fn on_param_change(&mut self, height: Height, changed: &[ParamKey]) {
        self.changes.push((height, changed.to_vec()));
    }
}
