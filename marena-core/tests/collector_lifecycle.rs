//! Integration tests for the collector and snapshot publishing.

mod common;

use common::{manual_manager, running_manager};
use marena_core::testing::{RecordingSink, assert_compact};
use marena_core::{ArenaConfig, ArenaError, CollectorState, MemoryManager};
use std::sync::Arc;

#[test]
fn test_start_is_idempotent() {
    let (manager, _) = running_manager(64);

    manager.start_collector().unwrap();
    manager.start_collector().unwrap();

    let id = manager.create(4, "int").unwrap();
    manager.decrease_ref(id).unwrap();
    manager.flush_collection();

    assert_eq!(manager.collector_stats().reclaimed, 1);
}

#[test]
fn test_stop_is_idempotent_and_terminal() {
    let (manager, _) = running_manager(64);

    manager.stop_collector();
    manager.stop_collector();
    assert_eq!(manager.collector_state(), CollectorState::Stopped);

    assert_eq!(
        manager.start_collector().unwrap_err(),
        ArenaError::CollectorStopped
    );
    assert_eq!(manager.collector_state(), CollectorState::Stopped);
}

#[test]
fn test_stop_drains_queue() {
    let (manager, _) = running_manager(256);

    let ids: Vec<_> = (0..16).map(|_| manager.create(2, "short").unwrap()).collect();
    for id in &ids {
        manager.decrease_ref(*id).unwrap();
    }

    manager.stop_collector();

    assert_eq!(manager.pending_collection(), 0);
    assert_eq!(manager.summary().allocated_blocks, 0);
    assert_eq!(manager.summary().used_memory, 0);
    assert_eq!(manager.collector_stats().reclaimed, 16);
}

#[test]
fn test_stop_without_worker_drains_inline() {
    let (manager, _) = manual_manager(64);
    let id = manager.create(8, "double").unwrap();
    manager.decrease_ref(id).unwrap();

    manager.stop_collector();

    assert_eq!(manager.collector_state(), CollectorState::Stopped);
    assert!(manager.get(id).is_err());
}

#[test]
fn test_flush_after_stop_still_reclaims() {
    let (manager, _) = running_manager(64);
    manager.stop_collector();

    let id = manager.create(4, "float").unwrap();
    manager.decrease_ref(id).unwrap();
    assert_eq!(manager.pending_collection(), 1);

    manager.flush_collection();
    assert_eq!(manager.pending_collection(), 0);
    assert!(manager.get(id).is_err());
    assert_eq!(manager.collector_state(), CollectorState::Stopped);
}

#[test]
fn test_drop_stops_collector() {
    let sink = Arc::new(RecordingSink::new());
    {
        let manager =
            MemoryManager::with_sink(&ArenaConfig::for_testing(64), sink.clone()).unwrap();
        let id = manager.create(4, "int").unwrap();
        manager.decrease_ref(id).unwrap();
    }

    // The final batch ran before drop returned.
    let last = sink.latest_summary().unwrap();
    assert_eq!(last.allocated_blocks, 0);
    assert_eq!(last.used_memory, 0);
}

#[test]
fn test_revived_block_survives_collection() {
    let (manager, _) = manual_manager(64);
    let id = manager.create(4, "int").unwrap();
    manager.set(id, "5").unwrap();

    manager.decrease_ref(id).unwrap();
    manager.increase_ref(id).unwrap();
    manager.flush_collection();

    assert_eq!(manager.get(id).unwrap(), "5");
    assert_eq!(manager.collector_stats().skipped, 1);
}

#[test]
fn test_summary_published_after_each_operation() {
    let (manager, sink) = manual_manager(64);

    let id = manager.create(4, "int").unwrap();
    manager.increase_ref(id).unwrap();
    manager.decrease_ref(id).unwrap();
    manager.decrease_ref(id).unwrap();
    manager.flush_collection();

    let summaries = sink.summaries();
    assert_eq!(summaries.len(), 5);
    assert!(summaries.windows(2).all(|w| w[0].version < w[1].version));

    assert_eq!(summaries[0].allocated_blocks, 1);
    assert_eq!(summaries[0].used_memory, 4);
    assert_eq!(summaries[4].allocated_blocks, 0);
    assert_eq!(summaries[4].free_memory, 64);
}

#[test]
fn test_dumps_follow_shape_changes() {
    let (manager, sink) = manual_manager(64);

    let a = manager.create(4, "int").unwrap();
    let b = manager.create(1, "char").unwrap();
    manager.increase_ref(b).unwrap();
    manager.decrease_ref(a).unwrap();
    manager.flush_collection();

    let dumps = sink.dumps();
    assert_eq!(dumps.len(), 3);
    assert_eq!(dumps[0].len(), 1);
    assert_eq!(dumps[1].len(), 2);

    let after_collection = &dumps[2];
    assert_eq!(after_collection.len(), 1);
    assert_eq!(after_collection[0].id, b);
    assert_eq!(after_collection[0].offset.as_usize(), 0);
    assert_eq!(after_collection[0].ref_count, 2);
}

#[test]
fn test_detailed_dumps_can_be_disabled() {
    let sink = Arc::new(RecordingSink::new());
    let config = ArenaConfig::for_testing(64)
        .with_autostart(false)
        .with_detailed_dumps(false);
    let manager = MemoryManager::with_sink(&config, sink.clone()).unwrap();

    manager.create(4, "int").unwrap();
    assert!(sink.dumps().is_empty());
    assert_eq!(sink.summaries().len(), 1);
}

#[test]
fn test_sink_failures_are_not_fatal() {
    let sink = Arc::new(RecordingSink::failing());
    let config = ArenaConfig::for_testing(64);
    let manager = MemoryManager::with_sink(&config, sink.clone()).unwrap();

    let id = manager.create(8, "long").unwrap();
    manager.set(id, "77").unwrap();
    assert_eq!(manager.increase_ref(id).unwrap(), 2);
    assert_eq!(manager.decrease_ref(id).unwrap(), 1);
    assert_eq!(manager.decrease_ref(id).unwrap(), 0);
    manager.flush_collection();

    assert!(manager.get(id).is_err());
    assert!(!sink.events().is_empty());
    assert_compact(&manager);
}
