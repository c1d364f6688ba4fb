//! Core types for marena.
//!
//! - `BlockId`: opaque handle a caller uses instead of a pointer
//! - `ArenaOffset`: byte position inside the arena buffer

mod ids;
mod offset;

pub use ids::BlockId;
pub use offset::ArenaOffset;
