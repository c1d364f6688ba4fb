//! The raw arena buffer and its bump frontier.

use super::compaction::CompactionPlan;
use crate::error::{ArenaError, Result};
use crate::types::ArenaOffset;

/// A fixed-size, zero-initialised byte buffer with bump allocation.
///
/// Bytes at or beyond the frontier are always zero: reclaimed ranges are
/// cleared by the allocator and the tail vacated by compaction is cleared
/// here. A fresh block therefore reads back as the zero value of its type.
#[derive(Debug)]
pub struct Arena {
    buffer: Vec<u8>,
    frontier: usize,
}

impl Arena {
    /// Reserve an arena of `capacity` bytes.
    ///
    /// Failure to reserve the backing memory is the one fatal arena error.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(capacity)
            .map_err(|e| ArenaError::ArenaReserve {
                capacity,
                cause: e.to_string(),
            })?;
        buffer.resize(capacity, 0);

        Ok(Self {
            buffer,
            frontier: 0,
        })
    }

    /// Total capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Current bump frontier.
    pub fn frontier(&self) -> ArenaOffset {
        ArenaOffset::new(self.frontier)
    }

    /// Bytes between the frontier and the end of the buffer.
    pub fn available(&self) -> usize {
        self.capacity() - self.frontier
    }

    /// Bump-allocate `size` bytes and return their offset.
    pub fn allocate(&mut self, size: usize) -> Result<ArenaOffset> {
        let end = self
            .frontier
            .checked_add(size)
            .filter(|&end| end <= self.capacity())
            .ok_or(ArenaError::OutOfMemory {
                requested: size,
                available: self.available(),
                capacity: self.capacity(),
            })?;

        let offset = ArenaOffset::new(self.frontier);
        self.frontier = end;
        Ok(offset)
    }

    /// Copy `bytes` into the arena at `offset`.
    pub fn write(&mut self, offset: ArenaOffset, bytes: &[u8]) -> Result<()> {
        let range = self.checked_range(offset, bytes.len())?;
        self.buffer[range].copy_from_slice(bytes);
        Ok(())
    }

    /// Borrow `size` bytes starting at `offset`.
    pub fn read(&self, offset: ArenaOffset, size: usize) -> Result<&[u8]> {
        let range = self.checked_range(offset, size)?;
        Ok(&self.buffer[range])
    }

    /// Clear `size` bytes starting at `offset`.
    pub fn zero(&mut self, offset: ArenaOffset, size: usize) -> Result<()> {
        let range = self.checked_range(offset, size)?;
        self.buffer[range].fill(0);
        Ok(())
    }

    /// Relocate byte ranges to the layout described by `plan` and move the
    /// frontier to the plan's new end.
    ///
    /// The whole plan is validated before any byte moves, so a rejected plan
    /// leaves the buffer untouched.
    pub fn compact_to(&mut self, plan: &CompactionPlan) -> Result<()> {
        self.validate_plan(plan)?;

        // Targets never pass their sources, so ascending order never
        // overwrites bytes that are still waiting to move.
        for placement in plan.moves() {
            let from = placement.from.as_usize();
            self.buffer
                .copy_within(from..from + placement.size, placement.to.as_usize());
        }

        let new_frontier = plan.new_frontier().as_usize();
        if new_frontier < self.frontier {
            self.buffer[new_frontier..self.frontier].fill(0);
        }
        self.frontier = new_frontier;

        Ok(())
    }

    fn validate_plan(&self, plan: &CompactionPlan) -> Result<()> {
        let mut cursor = 0usize;

        for placement in plan.layout() {
            let from = placement.from.as_usize();
            let to = placement.to.as_usize();

            if to < cursor {
                return Err(ArenaError::CompactionFailed {
                    cause: format!(
                        "{} target {} overlaps the previous block ending at {}",
                        placement.id, placement.to, cursor
                    ),
                });
            }
            if to > from {
                return Err(ArenaError::CompactionFailed {
                    cause: format!(
                        "{} would move forward from {} to {}",
                        placement.id, placement.from, placement.to
                    ),
                });
            }
            if from + placement.size > self.frontier {
                return Err(ArenaError::CompactionFailed {
                    cause: format!(
                        "{} at {} of {} bytes lies beyond the frontier {}",
                        placement.id, placement.from, placement.size, self.frontier
                    ),
                });
            }

            cursor = to + placement.size;
        }

        if cursor != plan.new_frontier().as_usize() {
            return Err(ArenaError::CompactionFailed {
                cause: format!(
                    "planned frontier {} does not match layout end {}",
                    plan.new_frontier(),
                    cursor
                ),
            });
        }

        Ok(())
    }

    fn checked_range(&self, offset: ArenaOffset, size: usize) -> Result<std::ops::Range<usize>> {
        let start = offset.as_usize();
        match start.checked_add(size) {
            Some(end) if end <= self.frontier => Ok(start..end),
            _ => Err(ArenaError::InvalidRange {
                offset,
                size,
                limit: self.frontier,
            }),
        }
    }
}
