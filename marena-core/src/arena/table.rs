//! Block metadata and id assignment.

use crate::error::{ArenaError, Result};
use crate::registry::ValueKind;
use crate::types::{ArenaOffset, BlockId};
use std::collections::HashMap;

/// Metadata for a single block in the arena.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// Handle of the block.
    pub id: BlockId,
    /// Offset in the arena where the payload starts.
    pub offset: ArenaOffset,
    /// Size of the payload in bytes.
    pub size: usize,
    /// Kind of value stored in the payload.
    pub kind: ValueKind,
    /// Number of outstanding references.
    pub ref_count: u64,
}

impl Block {
    /// Get the end offset of this block.
    pub fn end_offset(&self) -> ArenaOffset {
        self.offset.add(self.size)
    }

    /// Whether the block is waiting to be reclaimed.
    pub fn is_unreferenced(&self) -> bool {
        self.ref_count == 0
    }
}

/// Mapping from handle to block metadata.
///
/// Every block in the table counts as live for layout purposes, including
/// blocks whose count dropped to zero but which the collector has not
/// reached yet. Only the collector removes entries.
#[derive(Debug)]
pub struct BlockTable {
    blocks: HashMap<BlockId, Block>,
    next_id: BlockId,
}

impl BlockTable {
    /// Create an empty table whose first id is 1.
    pub fn new() -> Self {
        Self {
            blocks: HashMap::new(),
            next_id: BlockId::FIRST,
        }
    }

    /// Insert a new block with a reference count of one.
    pub fn insert(&mut self, offset: ArenaOffset, size: usize, kind: ValueKind) -> BlockId {
        let id = self.next_id;
        self.next_id = id.next();

        self.blocks.insert(
            id,
            Block {
                id,
                offset,
                size,
                kind,
                ref_count: 1,
            },
        );

        id
    }

    /// Look up a block.
    pub fn get(&self, id: BlockId) -> Result<&Block> {
        self.blocks.get(&id).ok_or(ArenaError::NotFound { id })
    }

    /// Look up a block for mutation.
    pub fn get_mut(&mut self, id: BlockId) -> Result<&mut Block> {
        self.blocks.get_mut(&id).ok_or(ArenaError::NotFound { id })
    }

    /// Remove a block from the table.
    pub fn remove(&mut self, id: BlockId) -> Result<Block> {
        self.blocks.remove(&id).ok_or(ArenaError::NotFound { id })
    }

    /// The id the next insert will receive.
    pub fn next_id(&self) -> BlockId {
        self.next_id
    }

    /// Number of blocks in the table.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Check if the table holds no blocks.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Sum of the sizes of all blocks.
    pub fn total_bytes(&self) -> usize {
        self.blocks.values().map(|b| b.size).sum()
    }

    /// All blocks ordered by offset, lower id first on ties.
    pub fn blocks_by_offset(&self) -> Vec<&Block> {
        let mut blocks: Vec<_> = self.blocks.values().collect();
        blocks.sort_by_key(|b| (b.offset, b.id));
        blocks
    }

    /// Record a block's new position after compaction.
    pub fn update_offset(&mut self, id: BlockId, offset: ArenaOffset) -> Result<()> {
        self.get_mut(id)?.offset = offset;
        Ok(())
    }
}

impl Default for BlockTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_start_at_one_and_increase() {
        let mut table = BlockTable::new();

        let a = table.insert(ArenaOffset::new(0), 4, ValueKind::Int);
        let b = table.insert(ArenaOffset::new(4), 8, ValueKind::Double);

        assert_eq!(a, BlockId::new(1));
        assert_eq!(b, BlockId::new(2));
        assert_eq!(table.next_id(), BlockId::new(3));
        assert_eq!(table.get(a).unwrap().ref_count, 1);
    }

    #[test]
    fn ids_are_not_reused_after_removal() {
        let mut table = BlockTable::new();

        let a = table.insert(ArenaOffset::new(0), 4, ValueKind::Int);
        table.remove(a).unwrap();
        let b = table.insert(ArenaOffset::new(0), 4, ValueKind::Int);

        assert_ne!(a, b);
        assert!(matches!(table.get(a), Err(ArenaError::NotFound { .. })));
    }

    #[test]
    fn totals() {
        let mut table = BlockTable::new();
        table.insert(ArenaOffset::new(0), 4, ValueKind::Int);
        table.insert(ArenaOffset::new(4), 1, ValueKind::Bool);

        assert_eq!(table.len(), 2);
        assert_eq!(table.total_bytes(), 5);
    }

    #[test]
    fn blocks_sorted_by_offset() {
        let mut table = BlockTable::new();
        let high = table.insert(ArenaOffset::new(0x200), 8, ValueKind::Long);
        let low = table.insert(ArenaOffset::new(0x100), 4, ValueKind::Int);

        let order: Vec<_> = table.blocks_by_offset().iter().map(|b| b.id).collect();
        assert_eq!(order, vec![low, high]);
    }

    #[test]
    fn update_offset() {
        let mut table = BlockTable::new();
        let id = table.insert(ArenaOffset::new(0x40), 4, ValueKind::Float);

        table.update_offset(id, ArenaOffset::new(0)).unwrap();
        let block = table.get(id).unwrap();
        assert_eq!(block.offset, ArenaOffset::ZERO);
        assert_eq!(block.end_offset(), ArenaOffset::new(4));
    }
}
