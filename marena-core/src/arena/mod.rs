//! The arena buffer, its block table, and the compacting defragmenter.
//!
//! # Layout
//!
//! ```text
//! ┌───────────────────────────────────────────────┬──────────────────────┐
//! │ Used region [0, frontier)                     │ Free tail            │
//! │ ┌─────────┬───────┬─────────┬───────┬───────┐ │ (always zeroed)      │
//! │ │ block 1 │ gap   │ block 3 │ gap   │ blk 4 │ │                      │
//! │ └─────────┴───────┴─────────┴───────┴───────┘ │                      │
//! └───────────────────────────────────────────────┴──────────────────────┘
//! ```
//!
//! `create` bump-allocates at the frontier and never fills gaps. Gaps are
//! left behind when the collector reclaims a block; the defragmenter slides
//! the remaining blocks toward offset zero so that the frontier again equals
//! the total size of the blocks in the table.

mod buffer;
mod compaction;
mod table;

pub use buffer::Arena;
pub use compaction::{CompactionPlan, CompactionResult, Defragmenter, Placement};
pub use table::{Block, BlockTable};
