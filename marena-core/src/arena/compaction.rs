//! Arena compaction for reclaiming space left by collected blocks.
//!
//! Compaction slides every block in the table toward offset zero, keeping
//! their relative order, so the space freed by the collector becomes one
//! contiguous tail that bump allocation can reuse.

use super::buffer::Arena;
use super::table::BlockTable;
use crate::error::Result;
use crate::types::{ArenaOffset, BlockId};

/// Where one block sits before and after compaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// The block being placed.
    pub id: BlockId,
    /// Current offset.
    pub from: ArenaOffset,
    /// Offset after compaction.
    pub to: ArenaOffset,
    /// Size of the block.
    pub size: usize,
}

impl Placement {
    /// Whether the block has to be relocated.
    pub fn moves(&self) -> bool {
        self.from != self.to
    }
}

/// Plan for compacting an arena.
///
/// A plan is computed in full before any byte is moved.
#[derive(Debug, Clone, PartialEq)]
pub struct CompactionPlan {
    /// Every block in ascending current-offset order with its target.
    layout: Vec<Placement>,
    /// Frontier after compaction.
    new_frontier: ArenaOffset,
    /// Frontier before compaction.
    old_frontier: ArenaOffset,
}

impl CompactionPlan {
    /// Get the full layout, including blocks that stay in place.
    pub fn layout(&self) -> &[Placement] {
        &self.layout
    }

    /// Get only the placements that relocate a block.
    pub fn moves(&self) -> impl Iterator<Item = &Placement> {
        self.layout.iter().filter(|p| p.moves())
    }

    /// Get the frontier after compaction.
    pub fn new_frontier(&self) -> ArenaOffset {
        self.new_frontier
    }

    /// Get the bytes that will be returned to the free tail.
    pub fn bytes_to_reclaim(&self) -> usize {
        self.old_frontier.as_usize() - self.new_frontier.as_usize()
    }

    /// Whether applying the plan would change nothing.
    pub fn is_noop(&self) -> bool {
        self.bytes_to_reclaim() == 0 && self.moves().next().is_none()
    }
}

/// Result of a compaction run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompactionResult {
    /// Number of blocks relocated.
    pub blocks_moved: usize,
    /// Bytes returned to the free tail.
    pub bytes_reclaimed: usize,
    /// Bytes in use after compaction.
    pub bytes_used: usize,
    /// Whether anything changed.
    pub performed: bool,
}

/// Computes and applies compact layouts.
#[derive(Debug, Default, Clone, Copy)]
pub struct Defragmenter;

impl Defragmenter {
    /// Plan a compaction of `table` within an arena whose frontier is `frontier`.
    ///
    /// Each block, ordered by current offset (lower id first on ties), is
    /// assigned the running sum of the sizes placed before it.
    pub fn plan(table: &BlockTable, frontier: ArenaOffset) -> CompactionPlan {
        let mut layout = Vec::with_capacity(table.len());
        let mut cursor = ArenaOffset::ZERO;

        for block in table.blocks_by_offset() {
            layout.push(Placement {
                id: block.id,
                from: block.offset,
                to: cursor,
                size: block.size,
            });
            cursor = cursor.add(block.size);
        }

        CompactionPlan {
            layout,
            new_frontier: cursor,
            old_frontier: frontier,
        }
    }

    /// Compact the arena in place and update every moved block's offset.
    ///
    /// The arena validates the plan before moving bytes, so on error both
    /// the buffer and the table keep their previous layout.
    pub fn run(arena: &mut Arena, table: &mut BlockTable) -> Result<CompactionResult> {
        let plan = Self::plan(table, arena.frontier());

        if plan.is_noop() {
            return Ok(CompactionResult {
                bytes_used: plan.new_frontier().as_usize(),
                ..CompactionResult::default()
            });
        }

        arena.compact_to(&plan)?;

        let mut blocks_moved = 0;
        for placement in plan.moves() {
            table.update_offset(placement.id, placement.to)?;
            blocks_moved += 1;
            tracing::trace!(
                block_id = %placement.id,
                from = %placement.from,
                to = %placement.to,
                "Relocated block"
            );
        }

        let result = CompactionResult {
            blocks_moved,
            bytes_reclaimed: plan.bytes_to_reclaim(),
            bytes_used: plan.new_frontier().as_usize(),
            performed: true,
        };

        tracing::debug!(
            moved = result.blocks_moved,
            reclaimed = result.bytes_reclaimed,
            used = result.bytes_used,
            free = arena.available(),
            "Compacted arena"
        );

        Ok(result)
    }
}
