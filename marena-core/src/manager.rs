//! The allocator facade.
//!
//! `MemoryManager` owns the arena and block table behind a single lock, the
//! collection queue, and the collector worker. Every operation validates its
//! input before touching shared state, and every operation that reads or
//! writes block bytes or metadata runs under that one lock, which also
//! covers the collector's reclamation and compaction pass.

use crate::arena::{Arena, BlockTable, CompactionResult, Defragmenter};
use crate::collector::{BatchOutcome, CollectionQueue, Collector, CollectorState, CollectorStats};
use crate::config::ArenaConfig;
use crate::error::{ArenaError, Result};
use crate::registry::ValueKind;
use crate::snapshot::{ArenaSummary, BlockInfo, DumpDirectory, SnapshotSink, TracingSink};
use crate::types::{ArenaOffset, BlockId};
use parking_lot::Mutex;
use std::sync::Arc;

/// Arena and table, guarded together.
pub(crate) struct Heap {
    arena: Arena,
    table: BlockTable,
    /// Snapshot publication counter.
    version: u64,
}

/// State captured under the lock and published after it is released.
pub(crate) struct Snapshot {
    summary: ArenaSummary,
    blocks: Option<Vec<BlockInfo>>,
}

impl Heap {
    fn new(capacity: usize) -> Result<Self> {
        Ok(Self {
            arena: Arena::with_capacity(capacity)?,
            table: BlockTable::new(),
            version: 0,
        })
    }

    /// Bump-allocate, compacting first if dead space is all that stands in the way.
    fn allocate(&mut self, size: usize) -> Result<ArenaOffset> {
        match self.arena.allocate(size) {
            Err(ArenaError::OutOfMemory { .. })
                if self.arena.frontier().as_usize() > self.table.total_bytes() =>
            {
                Defragmenter::run(&mut self.arena, &mut self.table)?;
                self.arena.allocate(size)
            }
            other => other,
        }
    }

    /// Zero a block's bytes and drop it from the table.
    fn deallocate(&mut self, id: BlockId) -> Result<()> {
        let block = self.table.get(id)?;
        let (offset, size) = (block.offset, block.size);

        self.arena.zero(offset, size)?;
        self.table.remove(id)?;
        Ok(())
    }

    fn summary(&self) -> ArenaSummary {
        let used = self.arena.frontier().as_usize();
        ArenaSummary {
            memory_size: self.arena.capacity(),
            used_memory: used,
            free_memory: self.arena.available(),
            allocated_blocks: self.table.len(),
            next_available_id: self.table.next_id(),
            version: self.version,
        }
    }

    fn block_infos(&self) -> Vec<BlockInfo> {
        self.table
            .blocks_by_offset()
            .into_iter()
            .map(|b| BlockInfo {
                id: b.id,
                offset: b.offset,
                size: b.size,
                type_tag: b.kind.tag().to_string(),
                ref_count: b.ref_count,
            })
            .collect()
    }

    fn snapshot(&mut self, with_blocks: bool) -> Snapshot {
        self.version += 1;
        Snapshot {
            summary: self.summary(),
            blocks: with_blocks.then(|| self.block_infos()),
        }
    }
}

/// State shared between callers and the collector worker.
pub(crate) struct Shared {
    heap: Mutex<Heap>,
    pub(crate) queue: CollectionQueue,
    sink: Arc<dyn SnapshotSink>,
    detailed_dumps: bool,
}

impl Shared {
    /// Hand a captured snapshot to the sink; failures are logged only.
    fn publish(&self, snapshot: Snapshot) {
        if let Err(e) = self.sink.update_summary(&snapshot.summary) {
            tracing::warn!(error = %e, version = snapshot.summary.version, "Failed to update summary");
        }

        if let Some(blocks) = snapshot.blocks {
            if let Err(e) = self.sink.write_detailed_dump(&blocks) {
                tracing::warn!(error = %e, blocks = blocks.len(), "Failed to write detailed dump");
            }
        }
    }

    /// Reclaim every still-unreferenced block in `ids`, then compact once.
    pub(crate) fn collect_batch(&self, ids: &[BlockId]) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        let mut guard = self.heap.lock();
        let heap = &mut *guard;

        for &id in ids {
            match heap.table.get(id).map(|b| b.is_unreferenced()) {
                Ok(true) => match heap.deallocate(id) {
                    Ok(()) => {
                        outcome.reclaimed += 1;
                        tracing::debug!(block_id = %id, "Reclaimed block");
                    }
                    Err(e) => {
                        tracing::error!(block_id = %id, error = %e, "Failed to reclaim block");
                    }
                },
                Ok(false) => {
                    outcome.skipped += 1;
                    tracing::debug!(block_id = %id, "Block referenced again, skipping");
                }
                Err(_) => {
                    outcome.skipped += 1;
                    tracing::debug!(block_id = %id, "Block already reclaimed, skipping");
                }
            }
        }

        if outcome.reclaimed > 0 {
            match Defragmenter::run(&mut heap.arena, &mut heap.table) {
                Ok(result) => outcome.compacted = result.performed,
                Err(e) => tracing::error!(error = %e, "Compaction failed; layout left unchanged"),
            }
        }

        let snapshot = heap.snapshot(self.detailed_dumps && outcome.reclaimed > 0);
        drop(guard);

        self.publish(snapshot);
        outcome
    }
}

/// A reference-counted, compacting memory arena.
///
/// # Example
///
/// ```
/// use marena_core::{ArenaConfig, MemoryManager};
///
/// let manager = MemoryManager::new(&ArenaConfig::for_testing(1024))?;
///
/// let id = manager.create(4, "int")?;
/// manager.set(id, "42")?;
/// assert_eq!(manager.get(id)?, "42");
///
/// // Dropping the last reference hands the block to the collector.
/// assert_eq!(manager.decrease_ref(id)?, 0);
/// manager.flush_collection();
/// assert!(manager.get(id).is_err());
/// # Ok::<(), marena_core::ArenaError>(())
/// ```
pub struct MemoryManager {
    shared: Arc<Shared>,
    collector: Collector,
}

impl MemoryManager {
    /// Create a manager from configuration.
    ///
    /// Summaries and dumps go to `config.dump_directory` if set, otherwise
    /// to tracing events.
    pub fn new(config: &ArenaConfig) -> Result<Self> {
        config.validate()?;
        let sink: Arc<dyn SnapshotSink> = match &config.dump_directory {
            Some(directory) => Arc::new(DumpDirectory::create(
                directory,
                capacity_of(config)?,
            )?),
            None => Arc::new(TracingSink),
        };
        Self::with_sink(config, sink)
    }

    /// Create a manager that publishes state to `sink`.
    pub fn with_sink(config: &ArenaConfig, sink: Arc<dyn SnapshotSink>) -> Result<Self> {
        config.validate()?;
        let capacity = capacity_of(config)?;

        let shared = Arc::new(Shared {
            heap: Mutex::new(Heap::new(capacity)?),
            queue: CollectionQueue::new(),
            sink,
            detailed_dumps: config.detailed_dumps,
        });

        let manager = Self {
            shared,
            collector: Collector::new(config.collector.thread_name.clone()),
        };

        tracing::info!(capacity, "Memory manager ready");

        if config.collector.autostart {
            manager.start_collector()?;
        }

        Ok(manager)
    }

    /// Create a block of `size` bytes holding a `type_tag` value.
    ///
    /// The block starts with a reference count of one and reads back as the
    /// zero value of its type until `set` is called.
    pub fn create(&self, size: usize, type_tag: &str) -> Result<BlockId> {
        let kind = ValueKind::from_tag(type_tag)?;
        if kind.width() != size {
            return Err(ArenaError::SizeMismatch {
                type_tag: type_tag.to_string(),
                expected: kind.width(),
                requested: size,
            });
        }

        let (id, offset, snapshot) = {
            let mut heap = self.shared.heap.lock();
            let offset = heap.allocate(size)?;
            let id = heap.table.insert(offset, size, kind);
            let snapshot = heap.snapshot(self.shared.detailed_dumps);
            (id, offset, snapshot)
        };

        tracing::debug!(block_id = %id, %offset, size, type_tag, "Created block");
        self.shared.publish(snapshot);
        Ok(id)
    }

    /// Store the textual value `text` in a block.
    ///
    /// Nothing is written if `text` does not encode for the block's type.
    pub fn set(&self, id: BlockId, text: &str) -> Result<()> {
        let mut heap = self.shared.heap.lock();
        let block = heap.table.get(id)?;
        let (offset, size) = (block.offset, block.size);

        let bytes = block.kind.encode(text, size)?;
        heap.arena.write(offset, &bytes)
    }

    /// Read a block's value in its canonical textual form.
    pub fn get(&self, id: BlockId) -> Result<String> {
        let heap = self.shared.heap.lock();
        let block = heap.table.get(id)?;
        let bytes = heap.arena.read(block.offset, block.size)?;
        block.kind.decode(bytes)
    }

    /// Add a reference to a block and return the new count.
    pub fn increase_ref(&self, id: BlockId) -> Result<u64> {
        let (count, snapshot) = {
            let mut heap = self.shared.heap.lock();
            let block = heap.table.get_mut(id)?;
            block.ref_count += 1;
            let count = block.ref_count;
            (count, heap.snapshot(false))
        };

        tracing::trace!(block_id = %id, ref_count = count, "Increased reference count");
        self.shared.publish(snapshot);
        Ok(count)
    }

    /// Drop a reference to a block and return the new count.
    ///
    /// Reaching zero schedules the block for collection; it stays readable
    /// until the collector reclaims it. A block already at zero is left
    /// unchanged and reported as `AlreadyZero`.
    pub fn decrease_ref(&self, id: BlockId) -> Result<u64> {
        let (count, snapshot) = {
            let mut heap = self.shared.heap.lock();
            let block = heap.table.get_mut(id)?;
            if block.ref_count == 0 {
                return Err(ArenaError::AlreadyZero { id });
            }
            block.ref_count -= 1;
            let count = block.ref_count;
            (count, heap.snapshot(false))
        };

        if count == 0 {
            self.shared.queue.enqueue(id);
            tracing::debug!(block_id = %id, "Block unreferenced, queued for collection");
        } else {
            tracing::trace!(block_id = %id, ref_count = count, "Decreased reference count");
        }

        self.shared.publish(snapshot);
        Ok(count)
    }

    /// Metadata of one block.
    pub fn block(&self, id: BlockId) -> Result<BlockInfo> {
        let heap = self.shared.heap.lock();
        let block = heap.table.get(id)?;
        Ok(BlockInfo {
            id: block.id,
            offset: block.offset,
            size: block.size,
            type_tag: block.kind.tag().to_string(),
            ref_count: block.ref_count,
        })
    }

    /// Metadata of every block, ordered by offset.
    pub fn blocks(&self) -> Vec<BlockInfo> {
        self.shared.heap.lock().block_infos()
    }

    /// Current aggregate state.
    pub fn summary(&self) -> ArenaSummary {
        self.shared.heap.lock().summary()
    }

    /// Arena capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.shared.heap.lock().arena.capacity()
    }

    /// Run the defragmenter now, outside the collector.
    pub fn defragment(&self) -> Result<CompactionResult> {
        let mut guard = self.shared.heap.lock();
        let heap = &mut *guard;
        Defragmenter::run(&mut heap.arena, &mut heap.table)
    }

    /// Start the collector worker. Starting a running collector does nothing.
    ///
    /// Fails with `CollectorStopped` once the collector has been stopped.
    pub fn start_collector(&self) -> Result<()> {
        self.collector.start(&self.shared)
    }

    /// Stop the collector after draining its queue. Stopping twice does nothing.
    pub fn stop_collector(&self) {
        self.collector.stop(&self.shared);
    }

    /// Current collector state.
    pub fn collector_state(&self) -> CollectorState {
        self.shared.queue.state()
    }

    /// Counters accumulated by the collector.
    pub fn collector_stats(&self) -> CollectorStats {
        self.shared.queue.stats()
    }

    /// Number of ids waiting for the collector.
    pub fn pending_collection(&self) -> usize {
        self.shared.queue.len()
    }

    /// Block until every id queued before this call has been processed.
    ///
    /// Without a running worker the queue is drained on the calling thread.
    pub fn flush_collection(&self) {
        self.shared.queue.flush(&self.shared);
    }
}

impl Drop for MemoryManager {
    fn drop(&mut self) {
        self.collector.stop(&self.shared);
    }
}

fn capacity_of(config: &ArenaConfig) -> Result<usize> {
    usize::try_from(config.capacity()).map_err(|_| ArenaError::Config {
        cause: format!(
            "capacity {} does not fit this platform's address space",
            config.capacity()
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingSink;

    fn manager(capacity: u64) -> MemoryManager {
        MemoryManager::with_sink(
            &ArenaConfig::for_testing(capacity).with_autostart(false),
            Arc::new(RecordingSink::new()),
        )
        .unwrap()
    }

    #[test]
    fn create_validates_type_and_size() {
        let mm = manager(64);

        assert!(matches!(
            mm.create(4, "string"),
            Err(ArenaError::InvalidType { .. })
        ));
        assert_eq!(
            mm.create(8, "int").unwrap_err(),
            ArenaError::SizeMismatch {
                type_tag: "int".to_string(),
                expected: 4,
                requested: 8
            }
        );
        assert_eq!(mm.summary().allocated_blocks, 0);
    }

    #[test]
    fn create_out_of_memory() {
        let mm = manager(10);
        mm.create(8, "double").unwrap();

        let err = mm.create(4, "int").unwrap_err();
        assert!(matches!(err, ArenaError::OutOfMemory { available: 2, .. }));
        assert_eq!(mm.summary().used_memory, 8);
    }

    #[test]
    fn unset_block_reads_zero() {
        let mm = manager(64);

        let int = mm.create(4, "int").unwrap();
        let flag = mm.create(1, "bool").unwrap();
        let real = mm.create(8, "double").unwrap();

        assert_eq!(mm.get(int).unwrap(), "0");
        assert_eq!(mm.get(flag).unwrap(), "false");
        assert_eq!(mm.get(real).unwrap(), "0");
    }

    #[test]
    fn failed_set_leaves_bytes_unchanged() {
        let mm = manager(64);
        let id = mm.create(4, "int").unwrap();
        mm.set(id, "17").unwrap();

        assert!(matches!(
            mm.set(id, "notanumber"),
            Err(ArenaError::Conversion { .. })
        ));
        assert_eq!(mm.get(id).unwrap(), "17");
    }

    #[test]
    fn set_rejects_overflowing_floats() {
        let mm = manager(64);
        let f = mm.create(4, "float").unwrap();
        let d = mm.create(8, "double").unwrap();
        mm.set(f, "1.5").unwrap();
        mm.set(d, "2.5").unwrap();

        assert!(matches!(
            mm.set(f, "1e39"),
            Err(ArenaError::Conversion { .. })
        ));
        assert!(matches!(
            mm.set(d, "1e400"),
            Err(ArenaError::Conversion { .. })
        ));
        assert_eq!(mm.get(f).unwrap(), "1.5");
        assert_eq!(mm.get(d).unwrap(), "2.5");
    }

    #[test]
    fn ref_counting() {
        let mm = manager(64);
        let id = mm.create(2, "short").unwrap();

        assert_eq!(mm.increase_ref(id).unwrap(), 2);
        assert_eq!(mm.decrease_ref(id).unwrap(), 1);
        assert_eq!(mm.decrease_ref(id).unwrap(), 0);
        assert_eq!(mm.pending_collection(), 1);

        assert_eq!(
            mm.decrease_ref(id).unwrap_err(),
            ArenaError::AlreadyZero { id }
        );
        assert_eq!(mm.block(id).unwrap().ref_count, 0);
        assert_eq!(mm.pending_collection(), 1);
    }

    #[test]
    fn unknown_ids() {
        let mm = manager(64);
        let missing = BlockId::new(999);

        assert_eq!(mm.get(missing).unwrap_err(), ArenaError::NotFound { id: missing });
        assert!(mm.set(missing, "1").is_err());
        assert!(mm.increase_ref(missing).is_err());
        assert!(mm.decrease_ref(missing).is_err());
    }

    #[test]
    fn inline_collection_reclaims_and_compacts() {
        let mm = manager(64);
        let a = mm.create(8, "long").unwrap();
        let b = mm.create(8, "long").unwrap();
        mm.set(b, "-5").unwrap();

        mm.decrease_ref(a).unwrap();
        mm.flush_collection();

        assert!(matches!(mm.get(a), Err(ArenaError::NotFound { .. })));
        assert_eq!(mm.get(b).unwrap(), "-5");
        assert_eq!(mm.block(b).unwrap().offset, ArenaOffset::ZERO);
        assert_eq!(mm.summary().used_memory, 8);

        let stats = mm.collector_stats();
        assert_eq!(stats.reclaimed, 1);
        assert_eq!(stats.compactions, 1);
    }

    #[test]
    fn revived_block_is_skipped() {
        let mm = manager(64);
        let id = mm.create(4, "float").unwrap();

        mm.decrease_ref(id).unwrap();
        mm.increase_ref(id).unwrap();
        mm.flush_collection();

        assert_eq!(mm.get(id).unwrap(), "0");
        assert_eq!(mm.collector_stats().skipped, 1);
        assert_eq!(mm.collector_stats().reclaimed, 0);
    }

    #[test]
    fn allocation_compacts_dead_space_before_failing() {
        let mm = manager(16);
        let a = mm.create(8, "double").unwrap();
        let b = mm.create(8, "double").unwrap();
        mm.set(b, "2.5").unwrap();

        // Simulate reclamation without compaction.
        {
            let mut heap = mm.shared.heap.lock();
            heap.table.get_mut(a).unwrap().ref_count = 0;
            heap.deallocate(a).unwrap();
        }

        let c = mm.create(8, "double").unwrap();
        assert_eq!(mm.get(b).unwrap(), "2.5");
        assert_eq!(mm.get(c).unwrap(), "0");
        assert_eq!(mm.summary().used_memory, 16);
    }

    #[test]
    fn summary_tracks_operations() {
        let mm = manager(32);
        mm.create(4, "int").unwrap();
        mm.create(1, "char").unwrap();

        let summary = mm.summary();
        assert_eq!(summary.memory_size, 32);
        assert_eq!(summary.used_memory, 5);
        assert_eq!(summary.free_memory, 27);
        assert_eq!(summary.allocated_blocks, 2);
        assert_eq!(summary.next_available_id, BlockId::new(3));
    }
}
