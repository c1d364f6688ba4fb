//! Byte offsets into the arena buffer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Offset into the arena buffer.
///
/// This is a raw byte offset from the start of the buffer.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ArenaOffset(usize);

impl ArenaOffset {
    /// The start of the buffer.
    pub const ZERO: Self = Self(0);

    /// Create a new arena offset.
    #[must_use]
    pub const fn new(offset: usize) -> Self {
        Self(offset)
    }

    /// Get the raw offset value.
    #[must_use]
    pub const fn as_usize(&self) -> usize {
        self.0
    }

    /// Add a byte count.
    #[must_use]
    pub const fn add(&self, bytes: usize) -> Self {
        Self(self.0 + bytes)
    }
}

impl fmt::Display for ArenaOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

impl From<usize> for ArenaOffset {
    fn from(offset: usize) -> Self {
        Self(offset)
    }
}
