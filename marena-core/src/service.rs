//! Transport-independent request/response surface.
//!
//! Each operation returns a serializable response carrying an `ok` flag and
//! a human-readable `message`. Failures report `-1` in the numeric field
//! and the error text in `message`; they never panic and never leave a
//! partial effect behind.

use crate::config::ArenaConfig;
use crate::error::{ArenaError, Result};
use crate::manager::MemoryManager;
use crate::snapshot::{ArenaSummary, BlockInfo, SnapshotSink};
use crate::types::BlockId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Response to `Create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateResponse {
    /// Id of the new block, or -1.
    pub id: i64,
    /// Whether the operation succeeded.
    pub ok: bool,
    /// Human-readable outcome.
    pub message: String,
}

/// Response to `Set`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetResponse {
    /// Whether the operation succeeded.
    pub ok: bool,
    /// Human-readable outcome.
    pub message: String,
}

/// Response to `Get`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetResponse {
    /// Textual value, empty on failure.
    pub value: String,
    /// Whether the operation succeeded.
    pub ok: bool,
    /// Human-readable outcome.
    pub message: String,
}

/// Response to `IncreaseRefCount` and `DecreaseRefCount`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefCountResponse {
    /// Count after the operation, or -1.
    pub new_count: i64,
    /// Whether the operation succeeded.
    pub ok: bool,
    /// Human-readable outcome.
    pub message: String,
}

/// The five arena operations over integer wire ids.
pub struct MemoryService {
    manager: Arc<MemoryManager>,
}

impl MemoryService {
    /// Build a service around a new manager.
    pub fn new(config: &ArenaConfig) -> Result<Self> {
        Ok(Self::from_manager(Arc::new(MemoryManager::new(config)?)))
    }

    /// Build a service around a new manager publishing to `sink`.
    pub fn with_sink(config: &ArenaConfig, sink: Arc<dyn SnapshotSink>) -> Result<Self> {
        Ok(Self::from_manager(Arc::new(MemoryManager::with_sink(
            config, sink,
        )?)))
    }

    /// Serve an existing manager.
    pub fn from_manager(manager: Arc<MemoryManager>) -> Self {
        Self { manager }
    }

    /// The underlying manager.
    pub fn manager(&self) -> &Arc<MemoryManager> {
        &self.manager
    }

    /// Create a block of `size` bytes for a value of type `type_tag`.
    pub fn create(&self, size: u64, type_tag: &str) -> CreateResponse {
        let result = usize::try_from(size)
            .map_err(|_| ArenaError::OutOfMemory {
                requested: usize::MAX,
                available: self.manager.summary().free_memory,
                capacity: self.manager.capacity(),
            })
            .and_then(|size| self.manager.create(size, type_tag));

        match result {
            Ok(id) => CreateResponse {
                id: id.to_wire(),
                ok: true,
                message: format!("Created {} ({} bytes, {})", id, size, type_tag),
            },
            Err(e) => CreateResponse {
                id: -1,
                ok: false,
                message: e.to_string(),
            },
        }
    }

    /// Store a textual value in a block.
    pub fn set(&self, id: i64, value: &str) -> SetResponse {
        match resolve(id).and_then(|id| self.manager.set(id, value)) {
            Ok(()) => SetResponse {
                ok: true,
                message: format!("Set block {} to {}", id, value),
            },
            Err(e) => SetResponse {
                ok: false,
                message: e.to_string(),
            },
        }
    }

    /// Read a block's value.
    pub fn get(&self, id: i64) -> GetResponse {
        match resolve(id).and_then(|id| self.manager.get(id)) {
            Ok(value) => GetResponse {
                value,
                ok: true,
                message: "OK".to_string(),
            },
            Err(e) => GetResponse {
                value: String::new(),
                ok: false,
                message: e.to_string(),
            },
        }
    }

    /// Add a reference to a block.
    pub fn increase_ref_count(&self, id: i64) -> RefCountResponse {
        ref_count_response(resolve(id).and_then(|id| self.manager.increase_ref(id)))
    }

    /// Drop a reference to a block.
    pub fn decrease_ref_count(&self, id: i64) -> RefCountResponse {
        ref_count_response(resolve(id).and_then(|id| self.manager.decrease_ref(id)))
    }

    /// Current aggregate state.
    pub fn summary(&self) -> ArenaSummary {
        self.manager.summary()
    }

    /// Metadata of every block, ordered by offset.
    pub fn blocks(&self) -> Vec<BlockInfo> {
        self.manager.blocks()
    }
}

/// Map a wire id to a handle; ids that can never be assigned are not found.
fn resolve(id: i64) -> Result<BlockId> {
    BlockId::from_wire(id).ok_or(ArenaError::NotFound {
        id: BlockId::new(id.max(0) as u64),
    })
}

fn ref_count_response(result: Result<u64>) -> RefCountResponse {
    match result {
        Ok(count) => RefCountResponse {
            new_count: i64::try_from(count).unwrap_or(i64::MAX),
            ok: true,
            message: format!("Reference count is {}", count),
        },
        Err(e) => RefCountResponse {
            new_count: -1,
            ok: false,
            message: e.to_string(),
        },
    }
}
