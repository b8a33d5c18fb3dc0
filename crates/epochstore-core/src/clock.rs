//! Block clock: the execution-height source.
//!
//! The clock is the single source of truth for which height is currently
//! being executed. Fixations written during block execution take effect at
//! this height.
//!
//! All height arithmetic is checked; the clock never wraps.

use epochstore_fixation::HeightSource;
use epochstore_types::Height;

/// Errors that can occur during clock operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClockError {
    /// Height counter would overflow.
    #[error("height counter overflow: cannot advance beyond u64::MAX")]
    HeightOverflow,
}

/// Height counter advanced once per executed block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockClock {
    /// Height of the block currently being executed (0 = genesis).
    height: Height,
}

impl BlockClock {
    /// Create a clock at the genesis height.
    pub const fn new() -> Self {
        Self { height: 0 }
    }

    /// Create a clock at an explicit height (state restoration).
    pub const fn from_height(height: Height) -> Self {
        Self { height }
    }

    /// Advance to the next block. Returns the new height.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::HeightOverflow`] if the height would exceed
    /// `u64::MAX`.
    pub fn advance(&mut self) -> Result<Height, ClockError> {
        self.height = self.height.checked_add(1).ok_or(ClockError::HeightOverflow)?;
        Ok(self.height)
    }

    /// Height of the block currently being executed.
    pub const fn height(&self) -> Height {
        self.height
    }
}

impl HeightSource for BlockClock {
    fn current_height(&self) -> Height {
        self.height
    }
}
