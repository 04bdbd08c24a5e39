//! Index Module
//!
//! Persistent B+ tree mapping primary keys to record slots.
//!
//! ## Responsibilities
//! - Point lookups and operator range scans over typed keys
//! - Insert with node splitting, delete with borrow/merge rebalancing
//! - Leaf chain for ordered scans
//! - Tombstone array marking live slots
//! - Serialization of shape, tombstones and entries to `.ind`
//!
//! ## Layering
//! ```text
//! ┌──────────────────────────────┐
//! │  Index<K>  (manager)         │  insert / delete / find / persist
//! ├───────────────┬──────────────┤
//! │ BPlusTree<K>  │ RecordStore  │
//! │  + LeafChain  │  (.dat)      │
//! └───────────────┴──────────────┘
//! ```

mod chain;
mod codec;
mod key;
mod manager;
mod node;
mod operator;
mod tree;

pub use chain::{LeafChain, HEAD, TAIL};
pub use codec::{decode, encode, EMPTY_MARKER};
pub use key::IndexKey;
pub use manager::Index;
pub use node::{Entry, Node};
pub use operator::Operator;
pub use tree::BPlusTree;

/// Record position: block number in the data file
pub type SlotId = u32;

/// Position of a node in the tree's arena
pub type NodeId = usize;

/// Position of a link in the leaf chain
pub type ChainId = usize;
