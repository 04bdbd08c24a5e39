//! Record Store
//!
//! Slot-addressed record file plus the write cursor kept in `.prof`.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::{LeafError, Result};
use crate::index::SlotId;
use crate::schema::meta;

use super::{decode_blocks, encode_blocks, BLOCK_SIZE, PAGE_SIZE};

/// Stores records in fixed 255-byte slots
///
/// ## Invariants:
/// - `cursor` is a multiple of `BLOCK_SIZE` and is the only allocation point
/// - Slots below `cursor / BLOCK_SIZE` exist in the file
/// - Space freed by `delete` is never reused
///
/// Reads take `&mut self` because they seek the shared file handle.
pub struct RecordStore {
    /// Data file path (`.dat`)
    path: PathBuf,
    /// Data file handle
    data: File,
    /// Metadata file handle, used for the cursor word only
    meta: File,
    /// Next free byte offset in the data file
    cursor: u32,
    /// fsync after every mutation
    sync: bool,
}

impl RecordStore {
    /// Create a fresh data file next to an existing metadata file
    ///
    /// The data file starts as one zeroed page and the cursor is reset to 0.
    pub fn create(path: &Path, meta_path: &Path, sync: bool) -> Result<Self> {
        let data = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;
        data.set_len(PAGE_SIZE)?;

        let mut meta_file = OpenOptions::new().read(true).write(true).open(meta_path)?;
        meta::write_cursor(&mut meta_file, 0)?;

        let store = Self {
            path: path.to_path_buf(),
            data,
            meta: meta_file,
            cursor: 0,
            sync,
        };
        store.sync_files()?;

        tracing::debug!("Created record store {}", store.path.display());
        Ok(store)
    }

    /// Open an existing data file and load the cursor
    pub fn open(path: &Path, meta_path: &Path, sync: bool) -> Result<Self> {
        let data = OpenOptions::new().read(true).write(true).open(path)?;
        let mut meta_file = OpenOptions::new().read(true).write(true).open(meta_path)?;
        let cursor = meta::read_cursor(&mut meta_file)?;

        if cursor as usize % BLOCK_SIZE != 0 {
            return Err(LeafError::Corruption(format!(
                "write cursor {} is not block aligned",
                cursor
            )));
        }
        let file_len = data.metadata()?.len();
        if u64::from(cursor) > file_len {
            return Err(LeafError::Corruption(format!(
                "write cursor {} beyond data file end {}",
                cursor, file_len
            )));
        }

        Ok(Self {
            path: path.to_path_buf(),
            data,
            meta: meta_file,
            cursor,
            sync,
        })
    }

    /// Number of slots allocated so far (live, dead and continuation)
    pub fn slot_count(&self) -> usize {
        self.cursor as usize / BLOCK_SIZE
    }

    /// Current write cursor (byte offset)
    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // =========================================================================
    // Single Record Operations
    // =========================================================================

    /// Append a record at the cursor and return its first slot
    ///
    /// Steps:
    /// 1. Encode the payload into blocks
    /// 2. Grow the file to the next page boundary if needed
    /// 3. Write the blocks at the cursor
    /// 4. Advance and persist the cursor
    pub fn append(&mut self, payload: &[u8]) -> Result<SlotId> {
        let image = encode_blocks(payload)?;
        let slot = self.slot_count() as SlotId;
        let offset = u64::from(self.cursor);
        let end = offset + image.len() as u64;

        let new_cursor = u32::try_from(end).map_err(|_| {
            LeafError::CapacityExceeded(format!("data file would exceed {} bytes", u32::MAX))
        })?;

        self.ensure_len(end)?;
        self.write_at(offset, &image)?;

        self.cursor = new_cursor;
        meta::write_cursor(&mut self.meta, self.cursor)?;
        self.sync_files()?;

        tracing::trace!(
            "Appended {} bytes at slot {} ({} blocks)",
            payload.len(),
            slot,
            image.len() / BLOCK_SIZE
        );
        Ok(slot)
    }

    /// Read the payload stored at a slot
    pub fn read(&mut self, slot: SlotId) -> Result<Vec<u8>> {
        let span = self.span(slot)?;
        let mut raw = vec![0u8; span * BLOCK_SIZE];
        self.read_at(Self::offset(slot), &mut raw)?;
        decode_blocks(&raw)
    }

    /// Number of blocks owned by the record at `slot`
    pub fn span(&mut self, slot: SlotId) -> Result<usize> {
        if slot as usize >= self.slot_count() {
            return Err(LeafError::VacantSlot(slot));
        }

        let mut first = [0u8; 1];
        self.read_at(Self::offset(slot), &mut first)?;
        let span = first[0] as usize;
        if span == 0 {
            return Err(LeafError::VacantSlot(slot));
        }
        if slot as usize + span > self.slot_count() {
            return Err(LeafError::Corruption(format!(
                "record at slot {} spans {} blocks past the write cursor",
                slot, span
            )));
        }
        Ok(span)
    }

    /// Overwrite the record at `slot` in place
    ///
    /// The new encoding must fit in the blocks the record already owns;
    /// any surplus old blocks are zeroed.
    pub fn update(&mut self, slot: SlotId, payload: &[u8]) -> Result<()> {
        let image = self.prepare_update(slot, payload)?;
        self.write_at(Self::offset(slot), &image)?;
        self.sync_files()
    }

    /// Zero-fill every block of the record at `slot`
    pub fn delete(&mut self, slot: SlotId) -> Result<()> {
        let span = self.span(slot)?;
        self.write_at(Self::offset(slot), &vec![0u8; span * BLOCK_SIZE])?;
        self.sync_files()
    }

    // =========================================================================
    // Batch Operations
    // =========================================================================

    /// Read several records, in the order given
    pub fn read_many(&mut self, slots: &[SlotId]) -> Result<Vec<Vec<u8>>> {
        slots.iter().map(|&slot| self.read(slot)).collect()
    }

    /// Overwrite several records
    ///
    /// Every record is checked before any block is written, so a capacity
    /// failure leaves the file untouched.
    pub fn update_many(&mut self, slots: &[SlotId], payloads: &[Vec<u8>]) -> Result<()> {
        if slots.len() != payloads.len() {
            return Err(LeafError::InvalidArgument(format!(
                "{} slots but {} payloads",
                slots.len(),
                payloads.len()
            )));
        }

        let mut images = Vec::with_capacity(slots.len());
        for (&slot, payload) in slots.iter().zip(payloads) {
            images.push(self.prepare_update(slot, payload)?);
        }

        for (&slot, image) in slots.iter().zip(&images) {
            self.write_at(Self::offset(slot), image)?;
        }
        self.sync_files()
    }

    /// Zero-fill several records
    pub fn delete_many(&mut self, slots: &[SlotId]) -> Result<()> {
        let mut spans = Vec::with_capacity(slots.len());
        for &slot in slots {
            spans.push(self.span(slot)?);
        }

        for (&slot, span) in slots.iter().zip(spans) {
            self.write_at(Self::offset(slot), &vec![0u8; span * BLOCK_SIZE])?;
        }
        self.sync_files()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn offset(slot: SlotId) -> u64 {
        u64::from(slot) * BLOCK_SIZE as u64
    }

    /// Encode `payload` for an in-place rewrite of `slot`, padded to the old span
    fn prepare_update(&mut self, slot: SlotId, payload: &[u8]) -> Result<Vec<u8>> {
        let old_span = self.span(slot)?;
        let mut image = encode_blocks(payload)?;
        let new_span = image.len() / BLOCK_SIZE;

        if new_span > old_span {
            return Err(LeafError::CapacityExceeded(format!(
                "record at slot {} owns {} blocks, update needs {}",
                slot, old_span, new_span
            )));
        }

        image.resize(old_span * BLOCK_SIZE, 0);
        Ok(image)
    }

    /// Extend the file to the page boundary covering `end`
    fn ensure_len(&mut self, end: u64) -> Result<()> {
        let len = self.data.metadata()?.len();
        if end > len {
            let pages = end.div_ceil(PAGE_SIZE);
            self.data.set_len(pages * PAGE_SIZE)?;
        }
        Ok(())
    }

    fn write_at(&mut self, offset: u64, bytes: &[u8]) -> Result<()> {
        self.data.seek(SeekFrom::Start(offset))?;
        self.data.write_all(bytes)?;
        Ok(())
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        self.data.seek(SeekFrom::Start(offset))?;
        self.data.read_exact(buf)?;
        Ok(())
    }

    fn sync_files(&self) -> Result<()> {
        if self.sync {
            self.data.sync_all()?;
            self.meta.sync_all()?;
        }
        Ok(())
    }
}
