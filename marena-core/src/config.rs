//! Arena configuration.
//!
//! Loaded from YAML or built in code:
//!
//! ```yaml
//! memory_mb: 64
//! dump_directory: /var/lib/marena/dumps
//! detailed_dumps: true
//! collector:
//!   thread_name: marena-collector
//!   autostart: true
//! ```

use crate::error::{ArenaError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One mebibyte.
pub const MIB: u64 = 1024 * 1024;

/// Default arena size: 16 MB.
pub const DEFAULT_MEMORY_MB: u64 = 16;

/// Maximum arena size: 4 GB.
pub const MAX_MEMORY_MB: u64 = 4 * 1024;

/// Configuration for a memory manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Arena capacity in megabytes.
    pub memory_mb: u64,

    /// Exact capacity in bytes; overrides `memory_mb` when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity_bytes: Option<u64>,

    /// Directory for summary and dump files. No files are written when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dump_directory: Option<PathBuf>,

    /// Whether to publish full block listings after shape changes.
    pub detailed_dumps: bool,

    /// Collector worker settings.
    pub collector: CollectorConfig,
}

/// Collector worker settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Name of the worker thread.
    pub thread_name: String,
    /// Start the worker when the manager is constructed.
    pub autostart: bool,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            thread_name: "marena-collector".to_string(),
            autostart: true,
        }
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            memory_mb: DEFAULT_MEMORY_MB,
            capacity_bytes: None,
            dump_directory: None,
            detailed_dumps: true,
            collector: CollectorConfig::default(),
        }
    }
}

impl ArenaConfig {
    /// Create a small configuration for tests with an exact byte capacity.
    pub fn for_testing(capacity_bytes: u64) -> Self {
        Self::default().with_capacity_bytes(capacity_bytes)
    }

    /// Parse a configuration from YAML text.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml).map_err(|e| ArenaError::Config {
            cause: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| ArenaError::Config {
            cause: format!("Failed to read {}: {}", path.display(), e),
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Set the capacity in megabytes.
    pub fn with_memory_mb(mut self, memory_mb: u64) -> Self {
        self.memory_mb = memory_mb.min(MAX_MEMORY_MB);
        self.capacity_bytes = None;
        self
    }

    /// Set an exact capacity in bytes.
    pub fn with_capacity_bytes(mut self, capacity: u64) -> Self {
        self.capacity_bytes = Some(capacity.min(MAX_MEMORY_MB * MIB));
        self
    }

    /// Write summaries and dumps into `directory`.
    pub fn with_dump_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.dump_directory = Some(directory.into());
        self
    }

    /// Enable or disable detailed block dumps.
    pub fn with_detailed_dumps(mut self, enabled: bool) -> Self {
        self.detailed_dumps = enabled;
        self
    }

    /// Choose whether the collector starts with the manager.
    pub fn with_autostart(mut self, autostart: bool) -> Self {
        self.collector.autostart = autostart;
        self
    }

    /// Arena capacity in bytes.
    pub fn capacity(&self) -> u64 {
        self.capacity_bytes
            .unwrap_or_else(|| self.memory_mb.min(MAX_MEMORY_MB) * MIB)
            .min(MAX_MEMORY_MB * MIB)
    }

    /// Check the configuration for values the manager cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.capacity() == 0 {
            return Err(ArenaError::Config {
                cause: "arena capacity must be greater than zero".to_string(),
            });
        }
        if self.collector.thread_name.is_empty() {
            return Err(ArenaError::Config {
                cause: "collector thread name must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
