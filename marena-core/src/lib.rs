//! marena core library
//!
//! A single-process memory arena that hands out integer handles instead of
//! pointers. Callers create typed, fixed-size blocks, read and write them as
//! text, and share them through explicit reference counts. Blocks whose
//! count reaches zero are reclaimed by a background collector, which then
//! compacts the arena so bump allocation can reuse the freed space.
//!
//! # Key Components
//!
//! - **Registry**: the closed set of value kinds and their text/byte codecs
//! - **Arena**: the pre-reserved byte buffer, block table and defragmenter
//! - **MemoryManager**: the thread-safe allocator facade
//! - **Collector**: queue and worker that reclaim unreferenced blocks
//! - **Snapshot**: sinks that observe summaries and block listings
//! - **Service**: the five operations as serializable responses
//!
//! # Example
//!
//! ```
//! use marena_core::prelude::*;
//!
//! let manager = MemoryManager::new(&ArenaConfig::for_testing(4096))?;
//!
//! let id = manager.create(8, "double")?;
//! manager.set(id, "2.5")?;
//! assert_eq!(manager.get(id)?, "2.5");
//!
//! manager.increase_ref(id)?;
//! manager.decrease_ref(id)?;
//! manager.decrease_ref(id)?;
//! manager.flush_collection();
//!
//! assert_eq!(manager.summary().allocated_blocks, 0);
//! # Ok::<(), ArenaError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod arena;
pub mod collector;
pub mod config;
pub mod error;
pub mod manager;
pub mod prelude;
pub mod registry;
pub mod service;
pub mod snapshot;
pub mod testing;
pub mod types;

// Re-export key types at crate root for convenience
pub use collector::{CollectorState, CollectorStats};
pub use config::{ArenaConfig, CollectorConfig};
pub use error::{ArenaError, Result};
pub use manager::MemoryManager;
pub use registry::ValueKind;
pub use service::{CreateResponse, GetResponse, MemoryService, RefCountResponse, SetResponse};
pub use snapshot::{ArenaSummary, BlockInfo, DumpDirectory, NullSink, SnapshotSink, TracingSink};
pub use types::{ArenaOffset, BlockId};
