//! Error types for marena.
//!
//! Every error carries the identifiers involved (block id, type tag, sizes).

use crate::types::{ArenaOffset, BlockId};
use thiserror::Error;

/// The main error type for arena operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ArenaError {
    // =========================================================================
    // Caller Errors (E001-E099)
    // =========================================================================
    /// The type tag is not in the registry.
    #[error("E001: Unknown type '{type_tag}'")]
    InvalidType {
        /// The rejected type tag.
        type_tag: String,
    },

    /// The requested size differs from the type's fixed width.
    #[error("E002: Size mismatch for type '{type_tag}': expected {expected} bytes, got {requested}")]
    SizeMismatch {
        /// The type tag of the block.
        type_tag: String,
        /// The registry width of the type.
        expected: usize,
        /// The size the caller asked for.
        requested: usize,
    },

    /// Bump allocation would exceed the arena capacity.
    #[error(
        "E003: Out of memory: requested {requested} bytes, available {available} of {capacity} bytes"
    )]
    OutOfMemory {
        /// Number of bytes requested.
        requested: usize,
        /// Bytes left between the frontier and the end of the arena.
        available: usize,
        /// Total arena capacity.
        capacity: usize,
    },

    /// The block id is not in the table.
    #[error("E004: {id} not found")]
    NotFound {
        /// The missing block id.
        id: BlockId,
    },

    /// A textual value could not be converted to or from the block's type.
    #[error("E005: Cannot convert '{value}' for type '{type_tag}': {cause}")]
    Conversion {
        /// The type tag involved.
        type_tag: String,
        /// The offending textual value (or a byte rendering on decode).
        value: String,
        /// Reason for the failure.
        cause: String,
    },

    /// A decrement was attempted on a block whose count is already zero.
    #[error("E006: Reference count of {id} is already zero")]
    AlreadyZero {
        /// The block id.
        id: BlockId,
    },

    // =========================================================================
    // Internal Errors (E100-E199)
    // =========================================================================
    /// The backing buffer could not be reserved at startup.
    #[error("E101: Failed to reserve arena of {capacity} bytes: {cause}")]
    ArenaReserve {
        /// Requested capacity in bytes.
        capacity: usize,
        /// Reason for the failure.
        cause: String,
    },

    /// A raw copy fell outside the arena bounds.
    #[error("E102: Range at {offset} of {size} bytes exceeds limit {limit}")]
    InvalidRange {
        /// Start of the range.
        offset: ArenaOffset,
        /// Length of the range.
        size: usize,
        /// The bound that was exceeded.
        limit: usize,
    },

    /// Compaction could not be applied.
    #[error("E103: Compaction failed: {cause}")]
    CompactionFailed {
        /// Reason for the failure.
        cause: String,
    },

    /// A snapshot sink could not record state.
    #[error("E104: Snapshot failed: {cause}")]
    Snapshot {
        /// Reason for the failure.
        cause: String,
    },

    /// The collector was already stopped and cannot be restarted.
    #[error("E105: Collector has been stopped; create a new manager to resume collection")]
    CollectorStopped,

    /// The configuration is invalid.
    #[error("E106: Invalid configuration: {cause}")]
    Config {
        /// Reason why the configuration was rejected.
        cause: String,
    },

    /// The collector worker thread could not be started.
    #[error("E107: Failed to spawn collector thread: {cause}")]
    CollectorSpawn {
        /// Reason for the failure.
        cause: String,
    },
}

impl ArenaError {
    /// Get the stable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidType { .. } => "E001",
            Self::SizeMismatch { .. } => "E002",
            Self::OutOfMemory { .. } => "E003",
            Self::NotFound { .. } => "E004",
            Self::Conversion { .. } => "E005",
            Self::AlreadyZero { .. } => "E006",
            Self::ArenaReserve { .. } => "E101",
            Self::InvalidRange { .. } => "E102",
            Self::CompactionFailed { .. } => "E103",
            Self::Snapshot { .. } => "E104",
            Self::CollectorStopped => "E105",
            Self::Config { .. } => "E106",
            Self::CollectorSpawn { .. } => "E107",
        }
    }

    /// Check if this error was caused by the request rather than the allocator.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidType { .. }
                | Self::SizeMismatch { .. }
                | Self::OutOfMemory { .. }
                | Self::NotFound { .. }
                | Self::Conversion { .. }
                | Self::AlreadyZero { .. }
        )
    }

    /// Check if startup cannot proceed after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ArenaReserve { .. } | Self::Config { .. })
    }

    pub(crate) fn conversion(
        type_tag: impl Into<String>,
        value: impl Into<String>,
        cause: impl Into<String>,
    ) -> Self {
        Self::Conversion {
            type_tag: type_tag.into(),
            value: value.into(),
            cause: cause.into(),
        }
    }
}

/// Result type alias using `ArenaError`.
pub type Result<T> = std::result::Result<T, ArenaError>;
