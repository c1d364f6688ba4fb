//! Background reclamation of unreferenced blocks.
//!
//! `decrease_ref` pushes a block id onto the [`CollectionQueue`] when its
//! count reaches zero. A single worker thread drains the queue in batches:
//! each batch takes the heap lock once, reclaims every id that is still
//! unreferenced, and compacts the arena if anything was reclaimed.
//!
//! Only one batch is in flight at a time, whether it runs on the worker or
//! inline in `flush_collection`, so ids are processed in the order they
//! were queued.

use crate::error::{ArenaError, Result};
use crate::manager::Shared;
use crate::types::BlockId;
use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Lifecycle state of the collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectorState {
    /// Waiting for work.
    Idle,
    /// Processing a batch.
    Draining,
    /// Stopped for good; queued ids are drained inline by `flush_collection`.
    Stopped,
}

impl std::fmt::Display for CollectorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Draining => write!(f, "draining"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// Counters accumulated over the collector's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectorStats {
    /// Batches processed.
    pub batches: u64,
    /// Blocks reclaimed.
    pub reclaimed: u64,
    /// Queued ids that were referenced again or already gone.
    pub skipped: u64,
    /// Batches that moved at least one block or shrank the frontier.
    pub compactions: u64,
}

/// What one batch did.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct BatchOutcome {
    pub reclaimed: usize,
    pub skipped: usize,
    pub compacted: bool,
}

struct QueueState {
    pending: VecDeque<BlockId>,
    state: CollectorState,
    stop_requested: bool,
    worker_active: bool,
    batch_in_flight: bool,
    /// Ids ever queued.
    enqueued: u64,
    /// Ids ever processed.
    processed: u64,
    stats: CollectorStats,
}

/// FIFO of block ids awaiting reclamation.
pub(crate) struct CollectionQueue {
    inner: Mutex<QueueState>,
    /// Signals the worker: new ids, a finished batch, or a stop request.
    wake: Condvar,
    /// Signals flushers: a batch finished.
    progress: Condvar,
}

impl CollectionQueue {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(QueueState {
                pending: VecDeque::new(),
                state: CollectorState::Idle,
                stop_requested: false,
                worker_active: false,
                batch_in_flight: false,
                enqueued: 0,
                processed: 0,
                stats: CollectorStats::default(),
            }),
            wake: Condvar::new(),
            progress: Condvar::new(),
        }
    }

    pub(crate) fn enqueue(&self, id: BlockId) {
        let mut q = self.inner.lock();
        q.pending.push_back(id);
        q.enqueued += 1;
        drop(q);
        self.wake.notify_one();
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.lock().pending.len()
    }

    pub(crate) fn state(&self) -> CollectorState {
        self.inner.lock().state
    }

    pub(crate) fn stats(&self) -> CollectorStats {
        self.inner.lock().stats
    }

    /// Wait for the next batch. Returns `None` once a stop was requested
    /// and nothing is left to drain.
    fn next_batch(&self) -> Option<Vec<BlockId>> {
        let mut q = self.inner.lock();
        while q.batch_in_flight || (q.pending.is_empty() && !q.stop_requested) {
            self.wake.wait(&mut q);
        }

        if q.pending.is_empty() {
            return None;
        }

        q.batch_in_flight = true;
        q.state = CollectorState::Draining;
        Some(q.pending.drain(..).collect())
    }

    fn finish_batch(&self, processed: usize, outcome: BatchOutcome) {
        let mut q = self.inner.lock();
        q.batch_in_flight = false;
        q.processed += processed as u64;
        q.stats.batches += 1;
        q.stats.reclaimed += outcome.reclaimed as u64;
        q.stats.skipped += outcome.skipped as u64;
        if outcome.compacted {
            q.stats.compactions += 1;
        }
        if q.state == CollectorState::Draining {
            q.state = CollectorState::Idle;
        }
        drop(q);

        self.wake.notify_all();
        self.progress.notify_all();
    }

    /// Block until every id queued before the call has been processed,
    /// draining inline when no worker is running.
    pub(crate) fn flush(&self, shared: &Shared) {
        let mut q = self.inner.lock();
        let target = q.enqueued;

        while q.processed < target {
            if q.worker_active || q.batch_in_flight || q.pending.is_empty() {
                self.progress.wait(&mut q);
                continue;
            }

            let batch: Vec<_> = q.pending.drain(..).collect();
            q.batch_in_flight = true;
            if q.state != CollectorState::Stopped {
                q.state = CollectorState::Draining;
            }
            drop(q);

            let outcome = shared.collect_batch(&batch);
            self.finish_batch(batch.len(), outcome);
            q = self.inner.lock();
        }
    }
}

/// Owner of the worker thread.
pub(crate) struct Collector {
    thread_name: String,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Collector {
    pub(crate) fn new(thread_name: String) -> Self {
        Self {
            thread_name,
            handle: Mutex::new(None),
        }
    }

    pub(crate) fn start(&self, shared: &Arc<Shared>) -> Result<()> {
        let mut handle = self.handle.lock();

        {
            let mut q = shared.queue.inner.lock();
            if q.state == CollectorState::Stopped || q.stop_requested {
                return Err(ArenaError::CollectorStopped);
            }
            if q.worker_active {
                return Ok(());
            }
            q.worker_active = true;
        }

        let worker = Arc::clone(shared);
        let spawned = thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(move || run(worker));

        match spawned {
            Ok(h) => {
                *handle = Some(h);
                tracing::info!(thread = %self.thread_name, "Collector started");
                Ok(())
            }
            Err(e) => {
                shared.queue.inner.lock().worker_active = false;
                Err(ArenaError::CollectorSpawn {
                    cause: e.to_string(),
                })
            }
        }
    }

    /// Drain the queue, stop the worker and wait for it to exit.
    pub(crate) fn stop(&self, shared: &Shared) {
        let mut handle = self.handle.lock();

        {
            let mut q = shared.queue.inner.lock();
            if q.state == CollectorState::Stopped {
                return;
            }
            q.stop_requested = true;
        }
        shared.queue.wake.notify_all();

        match handle.take() {
            Some(h) => {
                if h.join().is_err() {
                    tracing::error!("Collector thread panicked");
                }
            }
            None => shared.queue.flush(shared),
        }

        let mut q = shared.queue.inner.lock();
        q.worker_active = false;
        q.state = CollectorState::Stopped;
        drop(q);
        shared.queue.progress.notify_all();

        tracing::info!("Collector stopped");
    }
}

fn run(shared: Arc<Shared>) {
    tracing::debug!("Collector running");

    while let Some(batch) = shared.queue.next_batch() {
        let size = batch.len();
        let outcome = shared.collect_batch(&batch);
        shared.queue.finish_batch(size, outcome);

        tracing::debug!(
            batch = size,
            reclaimed = outcome.reclaimed,
            skipped = outcome.skipped,
            compacted = outcome.compacted,
            "Processed collection batch"
        );
    }

    let mut q = shared.queue.inner.lock();
    q.worker_active = false;
    drop(q);
    shared.queue.progress.notify_all();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_batch_drains_in_order() {
        let queue = CollectionQueue::new();
        queue.enqueue(BlockId::new(3));
        queue.enqueue(BlockId::new(1));
        queue.enqueue(BlockId::new(2));

        let batch = queue.next_batch().unwrap();
        assert_eq!(batch, vec![BlockId::new(3), BlockId::new(1), BlockId::new(2)]);
        assert_eq!(queue.state(), CollectorState::Draining);
        assert_eq!(queue.len(), 0);

        queue.finish_batch(
            3,
            BatchOutcome {
                reclaimed: 2,
                skipped: 1,
                compacted: true,
            },
        );
        assert_eq!(queue.state(), CollectorState::Idle);
        assert_eq!(
            queue.stats(),
            CollectorStats {
                batches: 1,
                reclaimed: 2,
                skipped: 1,
                compactions: 1
            }
        );
    }

    #[test]
    fn stop_request_ends_empty_queue() {
        let queue = CollectionQueue::new();
        queue.inner.lock().stop_requested = true;
        assert!(queue.next_batch().is_none());
    }

    #[test]
    fn stop_request_still_drains_pending() {
        let queue = CollectionQueue::new();
        queue.enqueue(BlockId::new(7));
        queue.inner.lock().stop_requested = true;

        assert_eq!(queue.next_batch(), Some(vec![BlockId::new(7)]));
        queue.finish_batch(1, BatchOutcome::default());
        assert!(queue.next_batch().is_none());
    }

    #[test]
    fn state_display() {
        assert_eq!(CollectorState::Idle.to_string(), "idle");
        assert_eq!(CollectorState::Stopped.to_string(), "stopped");
    }
}
