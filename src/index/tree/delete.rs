//! B+ tree deletion
//!
//! Removal descends recursively and reports a tagged outcome to the parent,
//! which then repairs an underflowing child.
//!
//! Repair order for a child below `min_len`:
//! 1. Borrow the first entry of the right sibling if it has a surplus
//! 2. Borrow the last entry of the left sibling if it has a surplus
//! 3. Merge with the right sibling, or with the left one at the last position
//!
//! A separator equal to the removed key is replaced by the smallest key of
//! the subtree to its right.

use super::BPlusTree;
use crate::index::node::Node;
use crate::index::{NodeId, SlotId};

/// Result of removing a key from a subtree
enum RemoveOutcome {
    /// Key not present; tree untouched
    Missing,
    /// Removed; the subtree root still satisfies its size bound
    Done(SlotId),
    /// Removed; the subtree root fell below `min_len`
    NeedsRebalance(SlotId),
}

enum RootFix {
    Reset,
    Promote(NodeId),
    Keep,
}

impl<K: Ord + Clone> BPlusTree<K> {
    /// Remove `key`, returning the slot it mapped to
    pub fn remove(&mut self, key: &K) -> Option<SlotId> {
        let root = self.root?;

        let slot = match self.remove_rec(root, key) {
            RemoveOutcome::Missing => return None,
            RemoveOutcome::Done(slot) | RemoveOutcome::NeedsRebalance(slot) => slot,
        };

        self.len -= 1;
        self.fix_root();
        Some(slot)
    }

    fn remove_rec(&mut self, id: NodeId, key: &K) -> RemoveOutcome {
        let min = self.min_len();

        let (idx, child) = match self.node_mut(id) {
            Node::Leaf { entries, .. } => {
                let Ok(pos) = entries.binary_search_by(|e| e.key.cmp(key)) else {
                    return RemoveOutcome::Missing;
                };
                let slot = entries.remove(pos).slot;
                return if entries.len() < min {
                    RemoveOutcome::NeedsRebalance(slot)
                } else {
                    RemoveOutcome::Done(slot)
                };
            }
            Node::Internal { keys, children } => {
                let idx = keys.partition_point(|k| k <= key);
                (idx, children[idx])
            }
        };

        let slot = match self.remove_rec(child, key) {
            RemoveOutcome::Missing => return RemoveOutcome::Missing,
            RemoveOutcome::Done(slot) => {
                self.replace_separator(id, key);
                return RemoveOutcome::Done(slot);
            }
            RemoveOutcome::NeedsRebalance(slot) => slot,
        };

        // Before and after: an empty leaf has no successor yet, and an
        // internal merge pulls the separator down into the child.
        self.replace_separator(id, key);
        self.rebalance_child(id, idx);
        self.replace_separator(id, key);

        if self.node(id).len() < min {
            RemoveOutcome::NeedsRebalance(slot)
        } else {
            RemoveOutcome::Done(slot)
        }
    }

    /// Replace a separator equal to `key` with the in-order successor
    fn replace_separator(&mut self, id: NodeId, key: &K) {
        let Node::Internal { keys, children } = self.node(id) else {
            return;
        };
        let Ok(pos) = keys.binary_search(key) else {
            return;
        };
        let Some(successor) = self.leftmost_key(children[pos + 1]).cloned() else {
            return;
        };
        if let Node::Internal { keys, .. } = self.node_mut(id) {
            keys[pos] = successor;
        }
    }

    /// Smallest key stored under `id`, if any
    fn leftmost_key(&self, mut id: NodeId) -> Option<&K> {
        loop {
            match self.node(id) {
                Node::Internal { children, .. } => id = children[0],
                Node::Leaf { entries, .. } => return entries.first().map(|e| &e.key),
            }
        }
    }

    fn rebalance_child(&mut self, parent: NodeId, idx: usize) {
        let min = self.min_len();
        let children = self.node(parent).children().to_vec();
        let child = children[idx];

        if self.node(child).len() >= min {
            return;
        }

        let right = children.get(idx + 1).copied();
        let left = idx.checked_sub(1).map(|i| children[i]);

        if let Some(right) = right.filter(|&r| self.node(r).len() > min) {
            self.borrow_from_right(parent, idx, child, right);
        } else if let Some(left) = left.filter(|&l| self.node(l).len() > min) {
            self.borrow_from_left(parent, idx, left, child);
        } else if let Some(right) = right {
            self.merge(parent, idx, child, right);
        } else if let Some(left) = left {
            self.merge(parent, idx - 1, left, child);
        }
    }

    /// Move the right sibling's first entry (or child) into `child`
    fn borrow_from_right(&mut self, parent: NodeId, idx: usize, child: NodeId, right: NodeId) {
        let mut child_node = self.take(child);
        let mut right_node = self.take(right);

        let separator = match (&mut child_node, &mut right_node) {
            (Node::Leaf { entries: ce, .. }, Node::Leaf { entries: re, .. }) => {
                ce.push(re.remove(0));
                re[0].key.clone()
            }
            (
                Node::Internal { keys: ck, children: cc },
                Node::Internal { keys: rk, children: rc },
            ) => {
                ck.push(self.separator(parent, idx));
                cc.push(rc.remove(0));
                rk.remove(0)
            }
            _ => unreachable!("siblings {} and {} differ in kind", child, right),
        };

        self.put(child, child_node);
        self.put(right, right_node);
        self.set_separator(parent, idx, separator);
    }

    /// Move the left sibling's last entry (or child) into `child`
    fn borrow_from_left(&mut self, parent: NodeId, idx: usize, left: NodeId, child: NodeId) {
        let mut left_node = self.take(left);
        let mut child_node = self.take(child);

        let separator = match (&mut left_node, &mut child_node) {
            (Node::Leaf { entries: le, .. }, Node::Leaf { entries: ce, .. }) => {
                if let Some(entry) = le.pop() {
                    ce.insert(0, entry);
                }
                Some(ce[0].key.clone())
            }
            (
                Node::Internal { keys: lk, children: lc },
                Node::Internal { keys: ck, children: cc },
            ) => match (lk.pop(), lc.pop()) {
                (Some(up), Some(moved)) => {
                    ck.insert(0, self.separator(parent, idx - 1));
                    cc.insert(0, moved);
                    Some(up)
                }
                _ => None,
            },
            _ => unreachable!("siblings {} and {} differ in kind", left, child),
        };

        self.put(left, left_node);
        self.put(child, child_node);
        if let Some(separator) = separator {
            self.set_separator(parent, idx - 1, separator);
        }
    }

    /// Fold `right` into `left` and drop separator `sep_idx` from the parent
    fn merge(&mut self, parent: NodeId, sep_idx: usize, left: NodeId, right: NodeId) {
        let right_node = self.release(right);

        let separator = match self.node_mut(parent) {
            Node::Internal { keys, children } => {
                children.remove(sep_idx + 1);
                keys.remove(sep_idx)
            }
            Node::Leaf { .. } => unreachable!("parent {} is a leaf", parent),
        };

        let unlinked = match (self.node_mut(left), right_node) {
            (Node::Leaf { entries: le, .. }, Node::Leaf { entries: re, chain }) => {
                le.extend(re);
                Some(chain)
            }
            (
                Node::Internal { keys: lk, children: lc },
                Node::Internal { keys: rk, children: rc },
            ) => {
                lk.push(separator);
                lk.extend(rk);
                lc.extend(rc);
                None
            }
            _ => unreachable!("siblings {} and {} differ in kind", left, right),
        };

        if let Some(chain) = unlinked {
            self.chain.unlink(chain);
        }
    }

    /// Shrink the root after a removal
    ///
    /// An empty root leaf resets the whole tree; an internal root left with
    /// a single child hands the root role to that child.
    fn fix_root(&mut self) {
        while let Some(root) = self.root {
            let fix = match self.node(root) {
                Node::Leaf { entries, .. } if entries.is_empty() => RootFix::Reset,
                Node::Internal { keys, children } if keys.is_empty() => {
                    RootFix::Promote(children[0])
                }
                _ => RootFix::Keep,
            };

            match fix {
                RootFix::Reset => {
                    self.clear();
                    return;
                }
                RootFix::Promote(child) => {
                    self.release(root);
                    self.root = Some(child);
                }
                RootFix::Keep => return,
            }
        }
    }

    fn separator(&self, parent: NodeId, idx: usize) -> K {
        match self.node(parent) {
            Node::Internal { keys, .. } => keys[idx].clone(),
            Node::Leaf { .. } => unreachable!("parent {} is a leaf", parent),
        }
    }

    fn set_separator(&mut self, parent: NodeId, idx: usize, key: K) {
        if let Node::Internal { keys, .. } = self.node_mut(parent) {
            keys[idx] = key;
        }
    }
}
