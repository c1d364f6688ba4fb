//! Prelude for convenient imports.
//!
//! # Example
//!
//! ```
//! use marena_core::prelude::*;
//! ```

// Core types
pub use crate::types::{ArenaOffset, BlockId};

// Error handling
pub use crate::error::{ArenaError, Result};

// Allocator
pub use crate::collector::{CollectorState, CollectorStats};
pub use crate::config::{ArenaConfig, CollectorConfig};
pub use crate::manager::MemoryManager;
pub use crate::registry::ValueKind;

// Observability
pub use crate::snapshot::{ArenaSummary, BlockInfo, DumpDirectory, NullSink, SnapshotSink, TracingSink};

// Service surface
pub use crate::service::{CreateResponse, GetResponse, MemoryService, RefCountResponse, SetResponse};
