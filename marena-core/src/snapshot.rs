//! Observability sinks for arena state.
//!
//! The allocator publishes a summary after every operation that changes the
//! block set or a reference count, and a detailed block listing after every
//! change to the block set. Sinks are observers: their failures are logged
//! by the allocator and never reach the caller.

use crate::error::{ArenaError, Result};
use crate::types::{ArenaOffset, BlockId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Name of the summary file inside a dump directory.
pub const SUMMARY_FILE: &str = "summary.json";

/// Aggregate arena state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArenaSummary {
    /// Total arena capacity in bytes.
    pub memory_size: usize,
    /// Bytes below the frontier.
    pub used_memory: usize,
    /// Bytes above the frontier.
    pub free_memory: usize,
    /// Number of blocks in the table.
    pub allocated_blocks: usize,
    /// Id the next `create` will return.
    pub next_available_id: BlockId,
    /// Monotonic publication counter; later summaries have higher versions.
    pub version: u64,
}

impl ArenaSummary {
    /// Summary of an empty arena.
    pub fn empty(memory_size: usize) -> Self {
        Self {
            memory_size,
            used_memory: 0,
            free_memory: memory_size,
            allocated_blocks: 0,
            next_available_id: BlockId::FIRST,
            version: 0,
        }
    }
}

/// Metadata of one block, as published in detailed dumps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInfo {
    /// Block handle.
    pub id: BlockId,
    /// Offset in the arena.
    pub offset: ArenaOffset,
    /// Payload size in bytes.
    pub size: usize,
    /// Type tag of the stored value.
    pub type_tag: String,
    /// Outstanding references.
    pub ref_count: u64,
}

/// Receiver of arena state for observability.
pub trait SnapshotSink: Send + Sync {
    /// Record the aggregate arena state.
    fn update_summary(&self, summary: &ArenaSummary) -> Result<()>;

    /// Record the full block listing, ordered by offset.
    fn write_detailed_dump(&self, blocks: &[BlockInfo]) -> Result<()>;
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl SnapshotSink for NullSink {
    fn update_summary(&self, _summary: &ArenaSummary) -> Result<()> {
        Ok(())
    }

    fn write_detailed_dump(&self, _blocks: &[BlockInfo]) -> Result<()> {
        Ok(())
    }
}

/// Sink that renders state as tracing events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl SnapshotSink for TracingSink {
    fn update_summary(&self, summary: &ArenaSummary) -> Result<()> {
        tracing::info!(
            used = summary.used_memory,
            free = summary.free_memory,
            blocks = summary.allocated_blocks,
            next_id = %summary.next_available_id,
            version = summary.version,
            "Arena summary"
        );
        Ok(())
    }

    fn write_detailed_dump(&self, blocks: &[BlockInfo]) -> Result<()> {
        for block in blocks {
            tracing::trace!(
                block_id = %block.id,
                offset = %block.offset,
                size = block.size,
                type_tag = %block.type_tag,
                ref_count = block.ref_count,
                "Arena block"
            );
        }
        Ok(())
    }
}

/// Sink that writes JSON files into a directory.
///
/// `summary.json` is rewritten atomically on each update; each detailed
/// dump lands in its own timestamped `dump_*.json` file.
pub struct DumpDirectory {
    directory: PathBuf,
    /// Highest summary version written so far.
    last_version: Mutex<Option<u64>>,
    /// Sequence number for dump file names.
    next_dump: AtomicU64,
}

impl DumpDirectory {
    /// Open (creating if needed) a dump directory for an arena of `memory_size` bytes.
    ///
    /// An initial empty summary is written if none exists yet.
    pub fn create(directory: impl Into<PathBuf>, memory_size: usize) -> Result<Self> {
        let directory = directory.into();

        fs::create_dir_all(&directory).map_err(|e| ArenaError::Snapshot {
            cause: format!(
                "Failed to create dump directory {}: {}",
                directory.display(),
                e
            ),
        })?;

        let sink = Self {
            directory,
            last_version: Mutex::new(None),
            next_dump: AtomicU64::new(1),
        };

        if !sink.summary_path().exists() {
            sink.write_json(&sink.summary_path(), &ArenaSummary::empty(memory_size))?;
        }

        tracing::info!(directory = %sink.directory.display(), "Opened dump directory");
        Ok(sink)
    }

    /// Directory the sink writes into.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Path of the summary file.
    pub fn summary_path(&self) -> PathBuf {
        self.directory.join(SUMMARY_FILE)
    }

    /// Read back the last summary written.
    pub fn load_summary(&self) -> Result<ArenaSummary> {
        let bytes = fs::read(self.summary_path()).map_err(|e| ArenaError::Snapshot {
            cause: format!("Failed to read summary: {}", e),
        })?;
        serde_json::from_slice(&bytes).map_err(|e| ArenaError::Snapshot {
            cause: format!("Failed to parse summary: {}", e),
        })
    }

    fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        let temp_path = path.with_extension("json.tmp");

        let file = File::create(&temp_path).map_err(|e| ArenaError::Snapshot {
            cause: format!("Failed to create {}: {}", temp_path.display(), e),
        })?;
        let mut writer = BufWriter::new(file);

        serde_json::to_writer_pretty(&mut writer, value).map_err(|e| ArenaError::Snapshot {
            cause: format!("Failed to serialize {}: {}", path.display(), e),
        })?;
        writer.flush().map_err(|e| ArenaError::Snapshot {
            cause: format!("Failed to flush {}: {}", temp_path.display(), e),
        })?;

        fs::rename(&temp_path, path).map_err(|e| ArenaError::Snapshot {
            cause: format!("Failed to rename {}: {}", temp_path.display(), e),
        })
    }
}

impl SnapshotSink for DumpDirectory {
    fn update_summary(&self, summary: &ArenaSummary) -> Result<()> {
        // Held across the write so concurrent publishers cannot interleave.
        let mut last = self.last_version.lock();
        if last.is_some_and(|v| v > summary.version) {
            return Ok(());
        }

        self.write_json(&self.summary_path(), summary)?;
        *last = Some(summary.version);
        Ok(())
    }

    fn write_detailed_dump(&self, blocks: &[BlockInfo]) -> Result<()> {
        #[derive(Serialize)]
        struct Dump<'a> {
            created_at: String,
            blocks: &'a [BlockInfo],
        }

        let now = chrono::Utc::now();
        let seq = self.next_dump.fetch_add(1, Ordering::Relaxed);
        let path = self.directory.join(format!(
            "dump_{}_{:06}.json",
            now.format("%Y%m%d_%H%M%S_%3f"),
            seq
        ));

        self.write_json(
            &path,
            &Dump {
                created_at: now.to_rfc3339(),
                blocks,
            },
        )?;

        tracing::debug!(path = %path.display(), blocks = blocks.len(), "Wrote detailed dump");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn summary(version: u64, used: usize) -> ArenaSummary {
        ArenaSummary {
            memory_size: 64,
            used_memory: used,
            free_memory: 64 - used,
            allocated_blocks: 1,
            next_available_id: BlockId::new(2),
            version,
        }
    }

    #[test]
    fn creates_initial_summary() {
        let dir = tempdir().unwrap();
        let sink = DumpDirectory::create(dir.path().join("dumps"), 64).unwrap();

        let loaded = sink.load_summary().unwrap();
        assert_eq!(loaded, ArenaSummary::empty(64));
    }

    #[test]
    fn summary_updates_and_skips_stale_versions() {
        let dir = tempdir().unwrap();
        let sink = DumpDirectory::create(dir.path(), 64).unwrap();

        sink.update_summary(&summary(5, 8)).unwrap();
        sink.update_summary(&summary(3, 4)).unwrap();

        let loaded = sink.load_summary().unwrap();
        assert_eq!(loaded.version, 5);
        assert_eq!(loaded.used_memory, 8);
    }

    #[test]
    fn detailed_dumps_are_separate_files() {
        let dir = tempdir().unwrap();
        let sink = DumpDirectory::create(dir.path(), 64).unwrap();

        let blocks = vec![BlockInfo {
            id: BlockId::new(1),
            offset: ArenaOffset::ZERO,
            size: 4,
            type_tag: "int".to_string(),
            ref_count: 1,
        }];
        sink.write_detailed_dump(&blocks).unwrap();
        sink.write_detailed_dump(&[]).unwrap();

        let dumps: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .flatten()
            .filter(|e| e.file_name().to_string_lossy().starts_with("dump_"))
            .collect();
        assert_eq!(dumps.len(), 2);

        let first = dumps
            .iter()
            .map(|e| fs::read_to_string(e.path()).unwrap())
            .find(|s| s.contains("\"int\""))
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&first).unwrap();
        assert_eq!(value["blocks"][0]["id"], 1);
        assert_eq!(value["blocks"][0]["ref_count"], 1);
    }

    #[test]
    fn existing_summary_is_preserved() {
        let dir = tempdir().unwrap();
        {
            let sink = DumpDirectory::create(dir.path(), 64).unwrap();
            sink.update_summary(&summary(9, 16)).unwrap();
        }

        let reopened = DumpDirectory::create(dir.path(), 64).unwrap();
        assert_eq!(reopened.load_summary().unwrap().version, 9);
    }
}
