//! Leaf chain
//!
//! Doubly-linked list of leaves in key order, used for ordered scans.
//! Links are stored in a vector and addressed by `ChainId`; ids 0 and 1 are
//! the head and tail sentinels and never hold a leaf. Unlinked ids go on a
//! free list and are handed out again by the next split.
//!
//! ```text
//!   HEAD(0) ⇄ leaf(2) ⇄ leaf(5) ⇄ leaf(3) ⇄ TAIL(1)
//! ```

use super::{ChainId, NodeId};

/// Sentinel before the first leaf
pub const HEAD: ChainId = 0;

/// Sentinel after the last leaf
pub const TAIL: ChainId = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Link {
    leaf: Option<NodeId>,
    prev: ChainId,
    next: ChainId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafChain {
    /// Slot per chain id; `None` once unlinked
    links: Vec<Option<Link>>,
    /// Unlinked ids awaiting reuse
    free: Vec<ChainId>,
}

impl Default for LeafChain {
    fn default() -> Self {
        Self::new()
    }
}

impl LeafChain {
    /// Empty chain: head linked straight to tail
    pub fn new() -> Self {
        let head = Link {
            leaf: None,
            prev: HEAD,
            next: TAIL,
        };
        let tail = Link {
            leaf: None,
            prev: HEAD,
            next: TAIL,
        };
        Self {
            links: vec![Some(head), Some(tail)],
            free: Vec::new(),
        }
    }

    /// Link `leaf` right after `after`, reusing a freed id when one exists
    pub fn insert_after(&mut self, after: ChainId, leaf: NodeId) -> ChainId {
        let next = self.next(after);
        let link = Some(Link {
            leaf: Some(leaf),
            prev: after,
            next,
        });

        let id = match self.free.pop() {
            Some(id) => {
                self.links[id] = link;
                id
            }
            None => {
                self.links.push(link);
                self.links.len() - 1
            }
        };
        self.link_mut(after).next = id;
        self.link_mut(next).prev = id;
        id
    }

    /// Remove a leaf link and free its id
    pub fn unlink(&mut self, id: ChainId) {
        debug_assert!(id != HEAD && id != TAIL);
        if let Some(link) = self.links.get_mut(id).and_then(Option::take) {
            self.link_mut(link.prev).next = link.next;
            self.link_mut(link.next).prev = link.prev;
            self.free.push(id);
        }
    }

    /// Leaf stored at `id`, `None` for sentinels and unlinked ids
    pub fn leaf(&self, id: ChainId) -> Option<NodeId> {
        self.links.get(id).copied().flatten().and_then(|l| l.leaf)
    }

    pub fn next(&self, id: ChainId) -> ChainId {
        self.links[id].map_or(TAIL, |l| l.next)
    }

    /// Leaves from head to tail
    pub fn leaves(&self) -> Leaves<'_> {
        Leaves {
            chain: self,
            at: self.next(HEAD),
        }
    }

    /// Leaves from `id` (inclusive) to tail
    pub fn leaves_from(&self, id: ChainId) -> Leaves<'_> {
        Leaves { chain: self, at: id }
    }

    /// Number of linked leaves
    pub fn len(&self) -> usize {
        self.links.len() - 2 - self.free.len()
    }

    /// Ids allocated so far, sentinels included
    pub fn capacity(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.next(HEAD) == TAIL
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn link_mut(&mut self, id: ChainId) -> &mut Link {
        match self.links[id].as_mut() {
            Some(link) => link,
            None => panic!("chain id {} is not linked", id),
        }
    }
}

/// Iterator over leaf node ids in chain order
pub struct Leaves<'a> {
    chain: &'a LeafChain,
    at: ChainId,
}

impl Iterator for Leaves<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        while self.at != TAIL {
            let id = self.at;
            self.at = self.chain.next(id);
            if let Some(leaf) = self.chain.leaf(id) {
                return Some(leaf);
            }
        }
        None
    }
}
