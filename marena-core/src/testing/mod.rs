//! Test support.
//!
//! - [`RecordingSink`]: a snapshot sink that keeps every call in memory
//! - [`assert_layout_invariants`]: checks the arena layout of a manager
//! - [`assert_compact`]: checks that no gaps remain after collection
//!
//! # Example
//!
//! ```
//! use marena_core::testing::{assert_layout_invariants, RecordingSink};
//! use marena_core::{ArenaConfig, MemoryManager};
//! use std::sync::Arc;
//!
//! let sink = Arc::new(RecordingSink::new());
//! let manager = MemoryManager::with_sink(&ArenaConfig::for_testing(64), sink.clone()).unwrap();
//!
//! manager.create(4, "int").unwrap();
//! assert_layout_invariants(&manager);
//! assert_eq!(sink.summaries().len(), 1);
//! ```

mod recording;

pub use recording::{RecordedEvent, RecordingSink};

use crate::manager::MemoryManager;
use std::collections::HashSet;

/// Assert the structural invariants of a manager's arena.
///
/// Blocks must not overlap, must lie below the frontier, and must have
/// unique ids lower than the next id to be assigned. The summary must agree
/// with the block listing.
#[track_caller]
pub fn assert_layout_invariants(manager: &MemoryManager) {
    let summary = manager.summary();
    let blocks = manager.blocks();

    assert_eq!(
        summary.allocated_blocks,
        blocks.len(),
        "summary block count disagrees with block listing"
    );
    assert_eq!(
        summary.used_memory + summary.free_memory,
        summary.memory_size,
        "used and free bytes do not add up to capacity"
    );

    let mut seen = HashSet::new();
    let mut previous_end = 0;

    for block in &blocks {
        assert!(seen.insert(block.id), "duplicate block id {}", block.id);
        assert!(
            block.id < summary.next_available_id,
            "{} is not below next id {}",
            block.id,
            summary.next_available_id
        );

        let start = block.offset.as_usize();
        let end = start + block.size;
        assert!(
            start >= previous_end,
            "{} at {} overlaps the previous block ending at {}",
            block.id,
            block.offset,
            previous_end
        );
        assert!(
            end <= summary.used_memory,
            "{} ends at {} beyond the frontier {}",
            block.id,
            end,
            summary.used_memory
        );
        previous_end = end;
    }
}

/// Assert that blocks are packed from offset zero with no gaps.
///
/// Holds whenever the collection queue has been flushed.
#[track_caller]
pub fn assert_compact(manager: &MemoryManager) {
    assert_layout_invariants(manager);

    let mut cursor = 0;
    for block in manager.blocks() {
        assert_eq!(
            block.offset.as_usize(),
            cursor,
            "{} is not packed against its predecessor",
            block.id
        );
        cursor += block.size;
    }
    assert_eq!(
        manager.summary().used_memory,
        cursor,
        "frontier does not match the total block size"
    );
}
