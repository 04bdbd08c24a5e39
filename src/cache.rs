//! Table handle cache
//!
//! Bounded LRU of open tables keyed by `(database, table)`. Handles are
//! shared as `Arc<Mutex<Table>>`, so a statement holds its table exclusively
//! for the whole index mutation, record write and persist.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::table::Table;

/// Shared, exclusively lockable table
pub type TableHandle = Arc<Mutex<Table>>;

/// Least-recently-used cache of open tables
///
/// Entries are ordered most recent first. Capacity is small (a handful of
/// tables), so lookups scan linearly.
pub struct TableCache {
    capacity: usize,
    entries: VecDeque<(TableKey, TableHandle)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct TableKey {
    database: String,
    table: String,
}

impl TableKey {
    fn matches(&self, database: &str, table: &str) -> bool {
        self.database == database && self.table == table
    }
}

impl TableCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: VecDeque::with_capacity(capacity),
        }
    }

    /// Look up a handle and mark it most recently used
    pub fn get(&mut self, database: &str, table: &str) -> Option<TableHandle> {
        let pos = self.position(database, table)?;
        let entry = self.entries.remove(pos)?;
        let handle = Arc::clone(&entry.1);
        self.entries.push_front(entry);
        Some(handle)
    }

    /// Insert a handle as most recently used, evicting the least recent
    /// entry when full. Returns the evicted handle, if any.
    pub fn insert(&mut self, database: &str, table: &str, handle: TableHandle) -> Option<TableHandle> {
        if let Some(pos) = self.position(database, table) {
            self.entries.remove(pos);
        }

        let key = TableKey {
            database: database.to_string(),
            table: table.to_string(),
        };
        self.entries.push_front((key, handle));

        if self.entries.len() > self.capacity {
            let (key, evicted) = self.entries.pop_back()?;
            tracing::debug!("Evicted table {}.{} from cache", key.database, key.table);
            return Some(evicted);
        }
        None
    }

    /// Remove one table's handle
    pub fn remove(&mut self, database: &str, table: &str) -> Option<TableHandle> {
        let pos = self.position(database, table)?;
        self.entries.remove(pos).map(|(_, handle)| handle)
    }

    /// Remove every handle belonging to `database`
    pub fn remove_database(&mut self, database: &str) -> Vec<TableHandle> {
        let mut removed = Vec::new();
        self.entries.retain(|(key, handle)| {
            if key.database == database {
                removed.push(Arc::clone(handle));
                false
            } else {
                true
            }
        });
        removed
    }

    pub fn contains(&self, database: &str, table: &str) -> bool {
        self.position(database, table).is_some()
    }

    /// Cached `(database, table)` pairs, most recent first
    pub fn keys(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .map(|(key, _)| (key.database.clone(), key.table.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, database: &str, table: &str) -> Option<usize> {
        self.entries.iter().position(|(key, _)| key.matches(database, table))
    }
}
