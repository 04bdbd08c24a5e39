//! Configuration for leafdb
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{LeafError, Result};

/// Main configuration for a leafdb instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all databases
    /// Internal structure:
    ///   {data_dir}/
    ///     └── {database}/
    ///           ├── {table}.prof   (schema + write cursor)
    ///           ├── {table}.dat    (record blocks)
    ///           └── {table}.ind    (index shape, tombstones, entries)
    pub data_dir: PathBuf,

    /// Sync strategy: whether writes are fsynced before returning
    pub sync_strategy: SyncStrategy,

    // -------------------------------------------------------------------------
    // Index Configuration
    // -------------------------------------------------------------------------
    /// B+ tree order (max children per internal node)
    pub tree_order: usize,

    // -------------------------------------------------------------------------
    // Engine Configuration
    // -------------------------------------------------------------------------
    /// Number of open table handles kept in the LRU cache
    pub cache_capacity: usize,
}

/// File sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// fsync data, metadata and index files after every mutation
    EveryWrite,

    /// Leave flushing to the OS page cache
    OsBuffered,
}

impl SyncStrategy {
    pub fn syncs(self) -> bool {
        matches!(self, SyncStrategy::EveryWrite)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            sync_strategy: SyncStrategy::EveryWrite,
            tree_order: 3,
            cache_capacity: 3,
        }
    }
}

impl Config {
    /// Smallest order that still lets a node split into two non-empty halves
    pub const MIN_TREE_ORDER: usize = 3;

    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings the storage layer cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.tree_order < Self::MIN_TREE_ORDER {
            return Err(LeafError::Config(format!(
                "tree order must be at least {}, got {}",
                Self::MIN_TREE_ORDER,
                self.tree_order
            )));
        }
        if self.cache_capacity == 0 {
            return Err(LeafError::Config(
                "cache capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all databases)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the file sync strategy
    pub fn sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    /// Set the B+ tree order
    pub fn tree_order(mut self, order: usize) -> Self {
        self.config.tree_order = order;
        self
    }

    /// Set the number of cached table handles
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.config.cache_capacity = capacity;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
