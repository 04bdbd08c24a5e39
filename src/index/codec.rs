//! Index file codec (`.ind`)
//!
//! ## File Format
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ Line a: tree shape, level order                              │
//! │   root-leaf tree:   "$ 1,2 "                                 │
//! │   deeper trees:     "7 # 3 9,12 $ 1,2 3,5 7,8 9,10 12,15 # " │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Line b: one byte (0/1) per slot                              │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Line c: per leaf entry in chain order                        │
//! │ ┌──────────────┬─────────────────┬──────────────┐            │
//! │ │ Len (4, LE)  │ Key (Len - 4)   │ Slot (4, LE) │            │
//! │ └──────────────┴─────────────────┴──────────────┘            │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each line ends with `\n`. Keys of one node are joined by `,` and the
//! node ends with a space. `# ` opens an internal level below the root,
//! `$ ` opens the leaf level, and a closing `# ` follows the leaf level
//! whenever the tree has more than one level.
//!
//! An empty tree is stored as the single byte `!`.

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{LeafError, Result};

use super::chain::{LeafChain, HEAD};
use super::node::{Entry, Node};
use super::{BPlusTree, IndexKey, NodeId};

/// Whole-file image of an empty tree
pub const EMPTY_MARKER: &[u8] = b"!";

const INTERNAL_LEVEL: &str = "#";
const LEAF_LEVEL: &str = "$";

// =============================================================================
// Encoding
// =============================================================================

/// Encode a tree and its tombstones into the `.ind` image
pub fn encode<K: IndexKey>(tree: &BPlusTree<K>, tombstones: &[bool]) -> Vec<u8> {
    if tree.is_empty() {
        return EMPTY_MARKER.to_vec();
    }

    let mut buf = BytesMut::new();

    // Line a
    let levels = tree.levels();
    let multi_level = levels.len() > 1;
    for (depth, level) in levels.iter().enumerate() {
        let leaf_level = depth == levels.len() - 1;
        if leaf_level {
            buf.put_slice(b"$ ");
        } else if depth > 0 {
            buf.put_slice(b"# ");
        }
        for &id in level {
            buf.put_slice(node_token(tree.node(id)).as_bytes());
            buf.put_u8(b' ');
        }
    }
    if multi_level {
        buf.put_slice(b"# ");
    }
    buf.put_u8(b'\n');

    // Line b
    for &live in tombstones {
        buf.put_u8(u8::from(live));
    }
    buf.put_u8(b'\n');

    // Line c
    for entry in tree.iter() {
        buf.put_u32_le((entry.key.encoded_len() + 4) as u32);
        entry.key.encode_into(&mut buf);
        buf.put_u32_le(entry.slot);
    }
    buf.put_u8(b'\n');

    buf.to_vec()
}

fn node_token<K: IndexKey>(node: &Node<K>) -> String {
    match node {
        Node::Internal { keys, .. } => keys.iter().map(K::to_token).collect::<Vec<_>>().join(","),
        Node::Leaf { entries, .. } => entries
            .iter()
            .map(|e| e.key.to_token())
            .collect::<Vec<_>>()
            .join(","),
    }
}

// =============================================================================
// Decoding
// =============================================================================

/// Rebuild a tree and its tombstones from an `.ind` image
///
/// Steps:
/// 1. Split the image into its three lines
/// 2. Group shape tokens into levels and build nodes level by level
/// 3. Link the leaves into a fresh chain (chain ids 2, 3, ...)
/// 4. Restore tombstones from line b
/// 5. Fill leaf slots from line c, checking each key against the shape
/// 6. Validate the resulting tree
pub fn decode<K: IndexKey>(image: &[u8], order: usize) -> Result<(BPlusTree<K>, Vec<bool>)> {
    if image == EMPTY_MARKER {
        return Ok((BPlusTree::new(order)?, Vec::new()));
    }

    let (shape, rest) = split_line(image, "shape")?;
    let (tombstone_line, entry_line) = split_line(rest, "tombstone")?;
    let entry_line = entry_line
        .strip_suffix(b"\n")
        .ok_or_else(|| corrupt("entry section is not newline terminated"))?;

    let shape = std::str::from_utf8(shape).map_err(|_| corrupt("shape line is not UTF-8"))?;
    let levels = parse_levels(shape)?;

    let tombstones = tombstone_line
        .iter()
        .map(|&b| match b {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(corrupt(format!("tombstone byte {}", other))),
        })
        .collect::<Result<Vec<bool>>>()?;

    let (mut nodes, leaves) = build_nodes::<K>(&levels, order)?;
    fill_slots(&mut nodes, &leaves, entry_line, &tombstones)?;

    let mut chain = LeafChain::new();
    let mut prev = HEAD;
    for &leaf in &leaves {
        prev = chain.insert_after(prev, leaf);
        if let Some(Node::Leaf { chain: id, .. }) = nodes[leaf].as_mut() {
            *id = prev;
        }
    }

    let tree = BPlusTree::from_parts(order, nodes, Some(0), chain)?;
    Ok((tree, tombstones))
}

/// Shape tokens grouped by level, root level first
struct Level<'a> {
    leaf: bool,
    nodes: Vec<&'a str>,
}

fn parse_levels(shape: &str) -> Result<Vec<Level<'_>>> {
    let mut levels: Vec<Level> = Vec::new();
    let mut closed = false;

    for token in shape.split(' ').filter(|t| !t.is_empty()) {
        if closed {
            return Err(corrupt(format!("token '{}' after the closing marker", token)));
        }
        let leaf_seen = levels.last().is_some_and(|l| l.leaf);

        match token {
            LEAF_LEVEL if leaf_seen => return Err(corrupt("second leaf level")),
            LEAF_LEVEL => levels.push(Level {
                leaf: true,
                nodes: Vec::new(),
            }),
            INTERNAL_LEVEL if leaf_seen => closed = true,
            INTERNAL_LEVEL if levels.is_empty() => {
                return Err(corrupt("shape opens with an internal level marker"))
            }
            INTERNAL_LEVEL => levels.push(Level {
                leaf: false,
                nodes: Vec::new(),
            }),
            _ if levels.is_empty() => levels.push(Level {
                leaf: false,
                nodes: vec![token],
            }),
            _ => {
                if let Some(level) = levels.last_mut() {
                    level.nodes.push(token);
                }
            }
        }
    }

    if !levels.last().is_some_and(|l| l.leaf) {
        return Err(corrupt("shape has no leaf level"));
    }
    if levels.len() > 1 && !closed {
        return Err(corrupt("multi-level shape is missing its closing marker"));
    }
    if levels.len() == 1 && closed {
        return Err(corrupt("single-level shape carries a closing marker"));
    }
    if levels[0].nodes.len() != 1 {
        return Err(corrupt(format!("root level holds {} nodes", levels[0].nodes.len())));
    }
    if levels.iter().any(|l| l.nodes.is_empty()) {
        return Err(corrupt("empty level in shape"));
    }

    Ok(levels)
}

/// Build the node arena in level order; node 0 is the root
///
/// Returns the arena and the leaf ids from left to right.
fn build_nodes<K: IndexKey>(
    levels: &[Level<'_>],
    order: usize,
) -> Result<(Vec<Option<Node<K>>>, Vec<NodeId>)> {
    let mut nodes: Vec<Option<Node<K>>> = Vec::new();
    let mut next_level_start = 0;

    for (depth, level) in levels.iter().enumerate() {
        let level_start = next_level_start;
        next_level_start = level_start + level.nodes.len();
        let mut next_child = next_level_start;

        for token in &level.nodes {
            let keys = token
                .split(',')
                .map(K::from_token)
                .collect::<Result<Vec<K>>>()?;
            if keys.len() >= order {
                return Err(corrupt(format!(
                    "node with {} keys exceeds order {}",
                    keys.len(),
                    order
                )));
            }

            let node = if level.leaf {
                Node::Leaf {
                    entries: keys.into_iter().map(|k| Entry::new(k, 0)).collect(),
                    chain: HEAD,
                }
            } else {
                let children = (next_child..next_child + keys.len() + 1).collect();
                next_child += keys.len() + 1;
                Node::Internal { keys, children }
            };
            nodes.push(Some(node));
        }

        if let Some(below) = levels.get(depth + 1) {
            if next_child - next_level_start != below.nodes.len() {
                return Err(corrupt(format!(
                    "level {} expects {} children, next level holds {}",
                    depth,
                    next_child - next_level_start,
                    below.nodes.len()
                )));
            }
        }
    }

    let leaf_start = nodes.len() - levels[levels.len() - 1].nodes.len();
    let leaves = (leaf_start..nodes.len()).collect();
    Ok((nodes, leaves))
}

/// Read line c and assign slots to leaf entries in chain order
fn fill_slots<K: IndexKey>(
    nodes: &mut [Option<Node<K>>],
    leaves: &[NodeId],
    mut line: &[u8],
    tombstones: &[bool],
) -> Result<()> {
    for &leaf in leaves {
        let Some(Node::Leaf { entries, .. }) = nodes[leaf].as_mut() else {
            continue;
        };

        for entry in entries.iter_mut() {
            if line.remaining() < 4 {
                return Err(corrupt("entry section truncated"));
            }
            let len = line.get_u32_le() as usize;
            if len < 4 || line.remaining() < len {
                return Err(corrupt(format!("entry length {} out of bounds", len)));
            }

            let key = K::decode_from(&line[..len - 4])?;
            line.advance(len - 4);
            let slot = line.get_u32_le();

            if key != entry.key {
                return Err(corrupt(format!(
                    "entry key {:?} does not match shape key {:?}",
                    key, entry.key
                )));
            }
            if !tombstones.get(slot as usize).copied().unwrap_or(false) {
                return Err(corrupt(format!("entry {:?} points at dead slot {}", key, slot)));
            }
            entry.slot = slot;
        }
    }

    if line.has_remaining() {
        return Err(corrupt(format!("{} trailing bytes in entry section", line.remaining())));
    }
    Ok(())
}

fn split_line<'a>(bytes: &'a [u8], what: &str) -> Result<(&'a [u8], &'a [u8])> {
    let end = bytes
        .iter()
        .position(|&b| b == b'\n')
        .ok_or_else(|| corrupt(format!("{} line is not newline terminated", what)))?;
    Ok((&bytes[..end], &bytes[end + 1..]))
}

fn corrupt(message: impl Into<String>) -> LeafError {
    LeafError::Corruption(message.into())
}
