//! Tree nodes
//!
//! Nodes live in an arena owned by the tree and refer to each other by id.

use super::{ChainId, NodeId, SlotId};

/// A key and the slot of its record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry<K> {
    pub key: K,
    pub slot: SlotId,
}

impl<K> Entry<K> {
    pub fn new(key: K, slot: SlotId) -> Self {
        Self { key, slot }
    }
}

/// Internal or leaf node
///
/// Internal nodes hold `keys.len() + 1` children. Child `i` covers keys in
/// `[keys[i-1], keys[i])`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node<K> {
    Internal { keys: Vec<K>, children: Vec<NodeId> },
    Leaf { entries: Vec<Entry<K>>, chain: ChainId },
}

impl<K> Node<K> {
    /// Number of keys (internal) or entries (leaf)
    pub fn len(&self) -> usize {
        match self {
            Node::Internal { keys, .. } => keys.len(),
            Node::Leaf { entries, .. } => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Leaf entries; empty for internal nodes
    pub fn entries(&self) -> &[Entry<K>] {
        match self {
            Node::Leaf { entries, .. } => entries,
            Node::Internal { .. } => &[],
        }
    }

    /// Child ids; empty for leaves
    pub fn children(&self) -> &[NodeId] {
        match self {
            Node::Internal { children, .. } => children,
            Node::Leaf { .. } => &[],
        }
    }
}
