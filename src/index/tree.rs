//! B+ Tree
//!
//! Ordered map from keys to record slots. Nodes live in an arena
//! (`Vec<Option<Node>>` plus a free list); leaves are additionally threaded
//! through a [`LeafChain`] so ordered scans never touch internal nodes.
//!
//! ## Shape rules (order `m`)
//! - Every non-root node holds between `min_len` and `m - 1` keys/entries
//! - Internal nodes have one more child than keys
//! - All leaves sit at the same depth
//! - An overfull node (m entries) splits at `half = (m - 1) / 2`

mod delete;

use crate::config::Config;
use crate::error::{LeafError, Result};

use super::chain::{LeafChain, HEAD};
use super::node::{Entry, Node};
use super::{ChainId, NodeId, Operator, SlotId};

/// In-memory B+ tree over `(key, slot)` pairs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BPlusTree<K> {
    /// Max children per internal node
    order: usize,
    /// Node arena; `None` marks a freed id
    nodes: Vec<Option<Node<K>>>,
    /// Freed ids available for reuse
    free: Vec<NodeId>,
    root: Option<NodeId>,
    chain: LeafChain,
    /// Number of entries
    len: usize,
}

enum InsertOutcome<K> {
    /// Key already present with this slot; nothing changed
    Exists(SlotId),
    /// Inserted; carries the separator and new right sibling if the node split
    Inserted(Option<(K, NodeId)>),
}

impl<K: Ord + Clone> BPlusTree<K> {
    /// Create an empty tree of the given order
    pub fn new(order: usize) -> Result<Self> {
        if order < Config::MIN_TREE_ORDER {
            return Err(LeafError::Config(format!(
                "tree order must be at least {}, got {}",
                Config::MIN_TREE_ORDER,
                order
            )));
        }
        Ok(Self {
            order,
            nodes: Vec::new(),
            free: Vec::new(),
            root: None,
            chain: LeafChain::new(),
            len: 0,
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn order(&self) -> usize {
        self.order
    }

    /// Max keys/entries per node
    pub fn max_len(&self) -> usize {
        self.order - 1
    }

    /// Min keys/entries per non-root node: `ceil(m/2) - 1`
    pub fn min_len(&self) -> usize {
        (self.order + 1) / 2 - 1
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn chain(&self) -> &LeafChain {
        &self.chain
    }

    /// Number of levels (0 for an empty tree)
    pub fn height(&self) -> usize {
        let mut height = 0;
        let mut at = self.root;
        while let Some(id) = at {
            height += 1;
            at = self.node(id).children().first().copied();
        }
        height
    }

    /// Number of leaves
    pub fn leaf_count(&self) -> usize {
        self.chain.len()
    }

    pub fn node(&self, id: NodeId) -> &Node<K> {
        match self.nodes.get(id) {
            Some(Some(node)) => node,
            _ => panic!("node {} is not allocated", id),
        }
    }

    /// Chain position of a leaf
    pub fn leaf_chain(&self, leaf: NodeId) -> ChainId {
        match self.node(leaf) {
            Node::Leaf { chain, .. } => *chain,
            Node::Internal { .. } => panic!("node {} is not a leaf", leaf),
        }
    }

    /// Node ids grouped by level, root first
    pub fn levels(&self) -> Vec<Vec<NodeId>> {
        let mut levels = Vec::new();
        let mut current: Vec<NodeId> = self.root.into_iter().collect();
        while !current.is_empty() {
            let next = current
                .iter()
                .flat_map(|&id| self.node(id).children().iter().copied())
                .collect();
            levels.push(std::mem::replace(&mut current, next));
        }
        levels
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Slot for `key`, if present
    pub fn get(&self, key: &K) -> Option<SlotId> {
        let leaf = self.find_leaf(key)?;
        let entries = self.node(leaf).entries();
        entries
            .binary_search_by(|e| e.key.cmp(key))
            .ok()
            .map(|i| entries[i].slot)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// All entries in ascending key order, via the leaf chain
    pub fn iter(&self) -> impl Iterator<Item = &Entry<K>> + '_ {
        self.chain
            .leaves()
            .flat_map(move |leaf| self.node(leaf).entries().iter())
    }

    /// Entries whose key satisfies `entry.key <op> key`, ascending
    ///
    /// `>`/`>=` start at the leaf that would hold `key` and walk the chain
    /// to the tail; `<`/`<=` walk from the head until the first miss.
    pub fn range(&self, key: &K, op: Operator) -> Vec<Entry<K>> {
        match op {
            Operator::Eq => self
                .get(key)
                .map(|slot| vec![Entry::new(key.clone(), slot)])
                .unwrap_or_default(),
            Operator::Gt | Operator::Ge => {
                let Some(leaf) = self.find_leaf(key) else {
                    return Vec::new();
                };
                self.chain
                    .leaves_from(self.leaf_chain(leaf))
                    .flat_map(|leaf| self.node(leaf).entries().iter())
                    .skip_while(|e| !op.matches(e.key.cmp(key)))
                    .cloned()
                    .collect()
            }
            Operator::Lt | Operator::Le => self
                .iter()
                .take_while(|e| op.matches(e.key.cmp(key)))
                .cloned()
                .collect(),
        }
    }

    // =========================================================================
    // Insertion
    // =========================================================================

    /// Insert `key -> slot`
    ///
    /// Returns the existing slot (and changes nothing) if the key is present.
    pub fn insert(&mut self, key: K, slot: SlotId) -> Option<SlotId> {
        let Some(root) = self.root else {
            let leaf = self.alloc(Node::Leaf {
                entries: vec![Entry::new(key, slot)],
                chain: HEAD,
            });
            let chain = self.chain.insert_after(HEAD, leaf);
            self.set_leaf_chain(leaf, chain);
            self.root = Some(leaf);
            self.len = 1;
            return None;
        };

        match self.insert_rec(root, key, slot) {
            InsertOutcome::Exists(existing) => Some(existing),
            InsertOutcome::Inserted(split) => {
                self.len += 1;
                if let Some((separator, right)) = split {
                    let new_root = self.alloc(Node::Internal {
                        keys: vec![separator],
                        children: vec![root, right],
                    });
                    self.root = Some(new_root);
                }
                None
            }
        }
    }

    fn insert_rec(&mut self, id: NodeId, key: K, slot: SlotId) -> InsertOutcome<K> {
        let max = self.max_len();

        let (idx, child) = match self.node_mut(id) {
            Node::Leaf { entries, .. } => {
                match entries.binary_search_by(|e| e.key.cmp(&key)) {
                    Ok(i) => return InsertOutcome::Exists(entries[i].slot),
                    Err(i) => entries.insert(i, Entry::new(key, slot)),
                }
                if entries.len() <= max {
                    return InsertOutcome::Inserted(None);
                }
                return InsertOutcome::Inserted(Some(self.split(id)));
            }
            Node::Internal { keys, children } => {
                let idx = keys.partition_point(|k| k <= &key);
                (idx, children[idx])
            }
        };

        let (separator, right) = match self.insert_rec(child, key, slot) {
            InsertOutcome::Inserted(Some(split)) => split,
            other => return other,
        };

        if let Node::Internal { keys, children } = self.node_mut(id) {
            keys.insert(idx, separator);
            children.insert(idx + 1, right);
            if keys.len() <= max {
                return InsertOutcome::Inserted(None);
            }
        }
        InsertOutcome::Inserted(Some(self.split(id)))
    }

    /// Split an overfull node; returns the separator and the new right node
    ///
    /// A leaf keeps `[0, half)` and copies the right half's first key up.
    /// An internal node keeps `[0, half)`, moves key `half` up and hands
    /// `(half, m)` to the right.
    fn split(&mut self, id: NodeId) -> (K, NodeId) {
        let half = (self.order - 1) / 2;

        match self.node_mut(id) {
            Node::Leaf { entries, chain } => {
                let right_entries = entries.split_off(half);
                let left_chain = *chain;
                let separator = right_entries[0].key.clone();

                let right = self.alloc(Node::Leaf {
                    entries: right_entries,
                    chain: HEAD,
                });
                let right_chain = self.chain.insert_after(left_chain, right);
                self.set_leaf_chain(right, right_chain);
                (separator, right)
            }
            Node::Internal { keys, children } => {
                let mut right_keys = keys.split_off(half);
                let right_children = children.split_off(half + 1);
                let separator = right_keys.remove(0);

                let right = self.alloc(Node::Internal {
                    keys: right_keys,
                    children: right_children,
                });
                (separator, right)
            }
        }
    }

    // =========================================================================
    // Validation
    // =========================================================================

    /// Check every structural invariant, reporting the first violation
    ///
    /// Checks node sizes, key order, separator bounds, uniform leaf depth,
    /// the entry count and that the leaf chain visits exactly the leaves
    /// in order.
    pub fn validate(&self) -> Result<()> {
        let Some(root) = self.root else {
            if self.len != 0 || !self.chain.is_empty() {
                return Err(LeafError::Corruption(format!(
                    "empty tree reports {} entries or a non-empty chain",
                    self.len
                )));
            }
            return Ok(());
        };

        let mut walk = Walk {
            leaf_depth: None,
            leaves: Vec::new(),
            entries: 0,
        };
        self.validate_node(root, None, None, 0, &mut walk)?;

        if walk.entries != self.len {
            return Err(LeafError::Corruption(format!(
                "tree holds {} entries but reports {}",
                walk.entries, self.len
            )));
        }

        let chained: Vec<NodeId> = self.chain.leaves().collect();
        if chained != walk.leaves {
            return Err(LeafError::Corruption(
                "leaf chain does not match in-order leaves".to_string(),
            ));
        }
        for &leaf in &walk.leaves {
            if self.chain.leaf(self.leaf_chain(leaf)) != Some(leaf) {
                return Err(LeafError::Corruption(format!(
                    "leaf {} has a stale chain id",
                    leaf
                )));
            }
        }

        Ok(())
    }

    fn validate_node(
        &self,
        id: NodeId,
        lo: Option<&K>,
        hi: Option<&K>,
        depth: usize,
        walk: &mut Walk,
    ) -> Result<()> {
        let node = match self.nodes.get(id) {
            Some(Some(node)) => node,
            _ => {
                return Err(LeafError::Corruption(format!(
                    "node {} referenced but not allocated",
                    id
                )))
            }
        };

        let is_root = Some(id) == self.root;
        let len = node.len();
        let min = if is_root { 1 } else { self.min_len() };
        if len < min || len > self.max_len() {
            return Err(LeafError::Corruption(format!(
                "node {} holds {} keys, allowed {}..={}",
                id,
                len,
                min,
                self.max_len()
            )));
        }

        let keys: Vec<&K> = match node {
            Node::Internal { keys, .. } => keys.iter().collect(),
            Node::Leaf { entries, .. } => entries.iter().map(|e| &e.key).collect(),
        };
        if keys.windows(2).any(|w| w[0] >= w[1]) {
            return Err(LeafError::Corruption(format!("node {} keys out of order", id)));
        }
        let below = lo.is_some_and(|lo| keys.first().is_some_and(|k| *k < lo));
        let above = hi.is_some_and(|hi| keys.last().is_some_and(|k| *k >= hi));
        if below || above {
            return Err(LeafError::Corruption(format!(
                "node {} keys escape their separator bounds",
                id
            )));
        }

        match node {
            Node::Internal { keys, children } => {
                if children.len() != keys.len() + 1 {
                    return Err(LeafError::Corruption(format!(
                        "internal node {} has {} keys and {} children",
                        id,
                        keys.len(),
                        children.len()
                    )));
                }
                for (i, &child) in children.iter().enumerate() {
                    let child_lo = if i == 0 { lo } else { Some(&keys[i - 1]) };
                    let child_hi = if i == keys.len() { hi } else { Some(&keys[i]) };
                    self.validate_node(child, child_lo, child_hi, depth + 1, walk)?;
                }
            }
            Node::Leaf { entries, .. } => {
                match walk.leaf_depth {
                    None => walk.leaf_depth = Some(depth),
                    Some(d) if d != depth => {
                        return Err(LeafError::Corruption(format!(
                            "leaf {} at depth {}, expected {}",
                            id, depth, d
                        )))
                    }
                    Some(_) => {}
                }
                walk.leaves.push(id);
                walk.entries += entries.len();
            }
        }

        Ok(())
    }

    // =========================================================================
    // Arena Helpers
    // =========================================================================

    /// Assemble a tree from already-linked parts (used when reloading)
    pub(super) fn from_parts(
        order: usize,
        nodes: Vec<Option<Node<K>>>,
        root: Option<NodeId>,
        chain: LeafChain,
    ) -> Result<Self> {
        let mut tree = Self::new(order)?;
        tree.len = nodes.iter().flatten().map(|n| n.entries().len()).sum();
        tree.nodes = nodes;
        tree.root = root;
        tree.chain = chain;
        tree.validate()?;
        Ok(tree)
    }

    /// Reset to the freshly constructed empty state
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.root = None;
        self.chain = LeafChain::new();
        self.len = 0;
    }

    fn find_leaf(&self, key: &K) -> Option<NodeId> {
        let mut id = self.root?;
        loop {
            match self.node(id) {
                Node::Internal { keys, children } => {
                    id = children[keys.partition_point(|k| k <= key)];
                }
                Node::Leaf { .. } => return Some(id),
            }
        }
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node<K> {
        match self.nodes.get_mut(id) {
            Some(Some(node)) => node,
            _ => panic!("node {} is not allocated", id),
        }
    }

    fn alloc(&mut self, node: Node<K>) -> NodeId {
        match self.free.pop() {
            Some(id) => {
                self.nodes[id] = Some(node);
                id
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        }
    }

    /// Remove a node from the arena for the duration of an edit
    fn take(&mut self, id: NodeId) -> Node<K> {
        match self.nodes.get_mut(id).and_then(Option::take) {
            Some(node) => node,
            None => panic!("node {} is not allocated", id),
        }
    }

    fn put(&mut self, id: NodeId, node: Node<K>) {
        self.nodes[id] = Some(node);
    }

    /// Free a node id for reuse, returning the node
    fn release(&mut self, id: NodeId) -> Node<K> {
        let node = self.take(id);
        self.free.push(id);
        node
    }

    fn set_leaf_chain(&mut self, leaf: NodeId, id: ChainId) {
        if let Node::Leaf { chain, .. } = self.node_mut(leaf) {
            *chain = id;
        }
    }
}

/// Accumulator for `validate`
struct Walk {
    leaf_depth: Option<usize>,
    leaves: Vec<NodeId>,
    entries: usize,
}
