//! Snapshot recording for tests.
//!
//! Records every call the allocator makes on its snapshot sink so tests can
//! assert on what was published and in which order.

use crate::error::{ArenaError, Result};
use crate::snapshot::{ArenaSummary, BlockInfo, SnapshotSink};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

/// A call recorded by [`RecordingSink`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecordedEvent {
    /// A summary was published.
    Summary {
        /// The published summary.
        summary: ArenaSummary,
    },

    /// A detailed dump was published.
    Dump {
        /// The published block listing.
        blocks: Vec<BlockInfo>,
    },
}

/// Sink that keeps every call in memory.
///
/// With [`RecordingSink::failing`] each call is still recorded but returns
/// an error, which the allocator must log and ignore.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: RwLock<Vec<RecordedEvent>>,
    fail: AtomicBool,
}

impl RecordingSink {
    /// Create a recording sink that accepts every call.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a recording sink whose calls all fail.
    pub fn failing() -> Self {
        let sink = Self::default();
        sink.set_failing(true);
        sink
    }

    /// Switch failure mode on or off.
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// All recorded events, oldest first.
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.read().clone()
    }

    /// Recorded summaries, oldest first.
    pub fn summaries(&self) -> Vec<ArenaSummary> {
        self.events
            .read()
            .iter()
            .filter_map(|e| match e {
                RecordedEvent::Summary { summary } => Some(*summary),
                RecordedEvent::Dump { .. } => None,
            })
            .collect()
    }

    /// Recorded dumps, oldest first.
    pub fn dumps(&self) -> Vec<Vec<BlockInfo>> {
        self.events
            .read()
            .iter()
            .filter_map(|e| match e {
                RecordedEvent::Dump { blocks } => Some(blocks.clone()),
                RecordedEvent::Summary { .. } => None,
            })
            .collect()
    }

    /// The summary with the highest version, if any.
    pub fn latest_summary(&self) -> Option<ArenaSummary> {
        self.summaries().into_iter().max_by_key(|s| s.version)
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.events.write().clear();
    }

    fn record(&self, event: RecordedEvent) -> Result<()> {
        self.events.write().push(event);

        if self.fail.load(Ordering::SeqCst) {
            return Err(ArenaError::Snapshot {
                cause: "recording sink configured to fail".to_string(),
            });
        }
        Ok(())
    }
}

impl SnapshotSink for RecordingSink {
    fn update_summary(&self, summary: &ArenaSummary) -> Result<()> {
        self.record(RecordedEvent::Summary { summary: *summary })
    }

    fn write_detailed_dump(&self, blocks: &[BlockInfo]) -> Result<()> {
        self.record(RecordedEvent::Dump {
            blocks: blocks.to_vec(),
        })
    }
}
