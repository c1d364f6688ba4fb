//! Shared helpers for marena-core integration tests.

#![allow(dead_code)]

use marena_core::testing::RecordingSink;
use marena_core::{ArenaConfig, MemoryManager};
use std::sync::Arc;

/// Manager with a recording sink and the collector worker running.
pub fn running_manager(capacity: u64) -> (MemoryManager, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::new());
    let manager = MemoryManager::with_sink(&ArenaConfig::for_testing(capacity), sink.clone())
        .expect("manager");
    (manager, sink)
}

/// Manager with a recording sink and no collector worker.
///
/// Queued ids are only processed by `flush_collection`.
pub fn manual_manager(capacity: u64) -> (MemoryManager, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::new());
    let config = ArenaConfig::for_testing(capacity).with_autostart(false);
    let manager = MemoryManager::with_sink(&config, sink.clone()).expect("manager");
    (manager, sink)
}
