//! Index handle
//!
//! Couples the in-memory tree with the tombstone array, the record store
//! and the `.ind` file. Every mutating call persists the index before it
//! returns.

use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;

use crate::error::{LeafError, Result};
use crate::storage::{RecordStore, TableFiles};

use super::codec;
use super::node::Entry;
use super::{BPlusTree, IndexKey, Operator, SlotId};

/// Primary-key index over one table's records
///
/// ## Invariants:
/// - `tombstones.len()` equals the store's slot count
/// - Every key in the tree maps to a slot whose tombstone is `true`
pub struct Index<K: IndexKey> {
    tree: BPlusTree<K>,
    tombstones: Vec<bool>,
    store: RecordStore,
    /// `.ind` path
    path: PathBuf,
    sync: bool,
}

impl<K: IndexKey> Index<K> {
    /// Create the data and index files for a table whose `.prof` exists
    pub fn create(files: &TableFiles, order: usize, sync: bool) -> Result<Self> {
        let tree = BPlusTree::new(order)?;
        let store = RecordStore::create(&files.data, &files.meta, sync)?;

        let index = Self {
            tree,
            tombstones: Vec::new(),
            store,
            path: files.index.clone(),
            sync,
        };
        index.persist()?;
        Ok(index)
    }

    /// Reload an index from disk
    ///
    /// A tombstone array shorter than the store (a crash between the record
    /// write and the index persist) is padded with dead slots.
    pub fn open(files: &TableFiles, order: usize, sync: bool) -> Result<Self> {
        let store = RecordStore::open(&files.data, &files.meta, sync)?;
        let image = fs::read(&files.index)?;
        let (tree, mut tombstones) = codec::decode::<K>(&image, order)?;

        let slots = store.slot_count();
        if tombstones.len() > slots {
            return Err(LeafError::Corruption(format!(
                "{} tombstones for {} slots",
                tombstones.len(),
                slots
            )));
        }
        if tombstones.len() < slots && !tree.is_empty() {
            tracing::warn!(
                "Index {} tracks {} of {} slots, padding with dead slots",
                files.index.display(),
                tombstones.len(),
                slots
            );
        }
        tombstones.resize(slots, false);

        tracing::debug!(
            "Reloaded index {} ({} keys, height {})",
            files.index.display(),
            tree.len(),
            tree.height()
        );

        Ok(Self {
            tree,
            tombstones,
            store,
            path: files.index.clone(),
            sync,
        })
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Insert or overwrite the record for `key`
    ///
    /// An existing key is rewritten in place and keeps its slot; a new key
    /// is appended and grows the tombstone array.
    pub fn insert(&mut self, key: K, payload: &[u8]) -> Result<SlotId> {
        if let Some(slot) = self.tree.get(&key) {
            self.store.update(slot, payload)?;
            self.persist()?;
            return Ok(slot);
        }

        let slot = self.store.append(payload)?;
        self.tree.insert(key, slot);
        self.tombstones.resize(self.store.slot_count(), false);
        self.tombstones[slot as usize] = true;
        self.persist()?;
        Ok(slot)
    }

    /// Remove `key` and zero its record; returns whether it was present
    pub fn delete(&mut self, key: &K) -> Result<bool> {
        Ok(self.delete_many(std::slice::from_ref(key))? == 1)
    }

    /// Remove several keys with one batched record wipe and one persist
    ///
    /// Absent and repeated keys are skipped. Returns the number removed.
    pub fn delete_many(&mut self, keys: &[K]) -> Result<usize> {
        let mut slots = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(slot) = self.tree.get(key) {
                if !slots.contains(&slot) {
                    slots.push(slot);
                }
            }
        }
        if slots.is_empty() {
            return Ok(0);
        }

        self.store.delete_many(&slots)?;

        for key in keys {
            if let Some(slot) = self.tree.remove(key) {
                self.tombstones[slot as usize] = false;
            }
        }
        self.persist()?;
        Ok(slots.len())
    }

    /// Rewrite several records in place (keys unchanged)
    pub fn update_many(&mut self, slots: &[SlotId], payloads: &[Vec<u8>]) -> Result<()> {
        self.store.update_many(slots, payloads)?;
        self.persist()
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Payload stored for `key`
    pub fn find(&mut self, key: &K) -> Result<Option<Vec<u8>>> {
        match self.tree.get(key) {
            Some(slot) => self.store.read(slot).map(Some),
            None => Ok(None),
        }
    }

    /// Payloads of every key satisfying `key' <op> key`, ascending
    pub fn find_range(&mut self, key: &K, op: Operator) -> Result<Vec<Vec<u8>>> {
        let slots: Vec<SlotId> = self.tree.range(key, op).into_iter().map(|e| e.slot).collect();
        self.store.read_many(&slots)
    }

    /// Entries satisfying `key' <op> key`, ascending
    pub fn range_entries(&self, key: &K, op: Operator) -> Vec<Entry<K>> {
        self.tree.range(key, op)
    }

    /// Every entry in chain order
    pub fn entries(&self) -> Vec<Entry<K>> {
        self.tree.iter().cloned().collect()
    }

    /// Read several records by slot
    pub fn read_many(&mut self, slots: &[SlotId]) -> Result<Vec<Vec<u8>>> {
        self.store.read_many(slots)
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Write the `.ind` image (via a temp file and rename)
    pub fn persist(&self) -> Result<()> {
        let image = codec::encode(&self.tree, &self.tombstones);
        let tmp = self.path.with_extension("ind.tmp");

        let mut file = File::create(&tmp)?;
        file.write_all(&image)?;
        if self.sync {
            file.sync_all()?;
        }
        drop(file);
        fs::rename(&tmp, &self.path)?;

        tracing::trace!(
            "Persisted index {} ({} bytes)",
            self.path.display(),
            image.len()
        );
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    pub fn tree(&self) -> &BPlusTree<K> {
        &self.tree
    }

    pub fn tombstones(&self) -> &[bool] {
        &self.tombstones
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }
}
