//! Source of the height currently being executed.

use epochstore_types::Height;

/// Gives the height of the block currently being processed.
///
/// Fixations written through [`FixationStore::set_current`] take effect at
/// this height.
///
/// [`FixationStore::set_current`]: crate::FixationStore::set_current
pub trait HeightSource {
    /// The height currently being executed.
    fn current_height(&self) -> Height;
}

/// A height source pinned to one height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedHeight(pub Height);

impl HeightSource for FixedHeight {
    fn current_height(&self) -> Height {
        self.0
    }
}
