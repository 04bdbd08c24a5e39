//! Storage Module
//!
//! Paged record file holding one variable-length record per key.
//!
//! ## Responsibilities
//! - Append records at the persisted write cursor
//! - Read, overwrite in place and zero-fill records by slot
//! - Split records longer than one block across consecutive slots
//! - Grow the data file one 8 KiB page at a time
//!
//! ## File Format (`.dat`)
//! ```text
//! ┌────────────────────────────────────────┐
//! │ Block (255 bytes), slot s at s * 255   │
//! │ ┌────────┬──────────┬────────┬───────┐ │
//! │ │Span (1)│ Len (2)  │Next (1)│ Data  │ │
//! │ └────────┴──────────┴────────┴───────┘ │
//! │ ... (repeated, file padded to 8 KiB)   │
//! └────────────────────────────────────────┘
//! ```
//!
//! - Span: blocks owned by the record on its first block, 0 elsewhere
//!   and on dead slots
//! - Len: payload bytes in this block (u16 LE, at most 251)
//! - Next: 1 if the record continues in the following block

use std::path::{Path, PathBuf};

mod block;
mod store;

pub use block::{decode_blocks, encode_blocks, span_for};
pub use store::RecordStore;

/// Size of one block (one slot)
pub const BLOCK_SIZE: usize = 255;

/// Per-block header: span + length + next marker
pub const BLOCK_HEADER: usize = 4;

/// Payload bytes available in one block
pub const BLOCK_PAYLOAD: usize = BLOCK_SIZE - BLOCK_HEADER;

/// Largest number of blocks a single record may span
pub const MAX_SPAN: usize = u8::MAX as usize;

/// Data file growth granularity
pub const PAGE_SIZE: u64 = 8 * 1024;

/// Paths of the three files backing one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableFiles {
    /// Schema and write cursor (`.prof`)
    pub meta: PathBuf,
    /// Record blocks (`.dat`)
    pub data: PathBuf,
    /// Tree shape, tombstones and entries (`.ind`)
    pub index: PathBuf,
}

impl TableFiles {
    pub fn new(dir: &Path, table: &str) -> Self {
        Self {
            meta: dir.join(format!("{}.prof", table)),
            data: dir.join(format!("{}.dat", table)),
            index: dir.join(format!("{}.ind", table)),
        }
    }

    pub fn all(&self) -> [&Path; 3] {
        [&self.meta, &self.data, &self.index]
    }
}
