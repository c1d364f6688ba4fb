//! Strongly-typed identifiers for arena blocks.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle of a block in the arena.
///
/// Ids are assigned by the block table starting at 1, strictly increasing,
/// and never reused after the block is reclaimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(u64);

impl BlockId {
    /// The first id handed out by a fresh table.
    pub const FIRST: Self = Self(1);

    /// Create a block id from a raw value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Convert a wire-level signed handle.
    ///
    /// Returns `None` for zero and negative values, which never name a block.
    #[must_use]
    pub fn from_wire(id: i64) -> Option<Self> {
        u64::try_from(id).ok().filter(|&v| v > 0).map(Self)
    }

    /// Get the raw id value.
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Render as the signed handle used by the service surface.
    #[must_use]
    pub fn to_wire(&self) -> i64 {
        i64::try_from(self.0).unwrap_or(i64::MAX)
    }

    /// The id that follows this one.
    #[must_use]
    pub const fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "block_{}", self.0)
    }
}

impl From<u64> for BlockId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_conversion() {
        assert_eq!(BlockId::from_wire(5), Some(BlockId::new(5)));
        assert_eq!(BlockId::from_wire(0), None);
        assert_eq!(BlockId::from_wire(-1), None);
        assert_eq!(BlockId::new(42).to_wire(), 42);
    }

    #[test]
    fn display_and_ordering() {
        assert_eq!(BlockId::FIRST.to_string(), "block_1");
        assert!(BlockId::FIRST < BlockId::FIRST.next());
    }

    #[test]
    fn serializes_as_number() {
        let json = serde_json::to_string(&BlockId::new(9)).unwrap();
        assert_eq!(json, "9");
    }
}
