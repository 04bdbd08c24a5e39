//! # leafdb
//!
//! An embedded table storage engine with:
//! - A persistent B+ tree primary-key index with a linked leaf chain
//! - A paged record file with multi-block records
//! - Typed schemas, row encoding and predicate evaluation
//! - A bounded LRU cache of open table handles
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Statements (CLI / parser)                   │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                        Engine                                │
//! │        (databases, LRU table cache, per-table locks)         │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                         Table                                │
//! │          (schema, row codec, predicate routing)              │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │    Index    │          │ RecordStore │
//!   │ (B+ tree)   │─ slots ─▶│  (.dat)     │
//!   │  (.ind)     │          └─────────────┘
//!   └─────────────┘
//! ```
//!
//! Each table is three files in `{data_dir}/{database}/`: `.prof` (schema and
//! write cursor), `.dat` (records) and `.ind` (index).

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod schema;
pub mod storage;
pub mod index;
pub mod table;
pub mod cache;
pub mod statement;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{LeafError, Result};
pub use config::{Config, SyncStrategy};
pub use engine::Engine;
pub use index::{BPlusTree, Index, Operator, SlotId};
pub use schema::{ColumnDef, ColumnType, Schema, Value};
pub use statement::{Outcome, Statement};
pub use table::{Predicate, ResultSet, Table};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of leafdb
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
