// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Adaptive radix tree: keyed in-memory indexing with path compression and
//! four fan-out classes. Keys are arbitrary byte strings that must not
//! contain an embedded NUL byte (see [`node::key_byte`]).

mod node;

use std::sync::Arc;

use node::{common_prefix_len, key_byte, Children, InnerNode, Leaf, Node};

use crate::error::CoreError;
use crate::value::{Value, ValueConfig};

/// A keyed, typed index over [`Value`] entries.
///
/// Insertion, lookup, and deletion are all O(k) in the key length rather
/// than the entry count. Default-constructed empty; entries are dropped
/// (running any attached destroyer) on [`Art::clear`] or [`Drop`].
#[derive(Default)]
pub struct Art {
    root: Option<Box<Node>>,
    size: usize,
}

enum InsertOutcome {
    Inserted,
    Replaced(Box<Leaf>),
}

impl Art {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Insert or replace `key` with `value`, with no custom destroyer or
    /// stringifier attached.
    pub fn insert(&mut self, key: &[u8], value: Value) -> Result<(), CoreError> {
        self.insert_with_config(key, value, ValueConfig::default())
    }

    /// Insert or replace `key` with `value`, attaching `config`'s destroyer
    /// and stringifier. If an entry already existed at `key`, its own
    /// destroyer (if any) runs on the replaced value before it is dropped.
    pub fn insert_with_config(
        &mut self,
        key: &[u8],
        value: Value,
        config: ValueConfig,
    ) -> Result<(), CoreError> {
        if key.is_empty() {
            return Err(CoreError::NullKey);
        }
        if matches!(value, Value::None) {
            return Err(CoreError::NoneTag);
        }
        let mut leaf = Leaf::new(key.to_vec().into_boxed_slice(), value);
        leaf.destroy = config.destroy;
        leaf.stringify = config.stringify;
        match insert_rec(&mut self.root, key, 0, leaf) {
            InsertOutcome::Inserted => self.size += 1,
            InsertOutcome::Replaced(old) => {
                if let Some(destroy) = &old.destroy {
                    destroy(&old.value);
                }
            }
        }
        Ok(())
    }

    pub fn search(&self, key: &[u8]) -> Option<&Value> {
        search_rec(self.root.as_deref(), key, 0).map(|leaf| &leaf.value)
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        search_rec(self.root.as_deref(), key, 0).is_some()
    }

    /// Renders a value via its attached stringifier, falling back to
    /// [`std::fmt::Debug`] when none was configured.
    pub fn stringify(&self, key: &[u8]) -> Option<String> {
        search_rec(self.root.as_deref(), key, 0).map(|leaf| match &leaf.stringify {
            Some(f) => f(&leaf.value),
            None => format!("{:?}", leaf.value),
        })
    }

    /// Remove `key`, running its destroyer (if any) before returning whether
    /// an entry was present.
    pub fn delete(&mut self, key: &[u8]) -> Result<bool, CoreError> {
        if key.is_empty() {
            return Err(CoreError::NullKey);
        }
        match delete_rec(&mut self.root, key, 0) {
            Some(leaf) => {
                if let Some(destroy) = &leaf.destroy {
                    destroy(&leaf.value);
                }
                self.size -= 1;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Drop every entry, running attached destroyers.
    pub fn clear(&mut self) {
        let mut stack = Vec::new();
        if let Some(root) = self.root.take() {
            stack.push(root);
        }
        while let Some(node) = stack.pop() {
            match *node {
                Node::Leaf(leaf) => {
                    if let Some(destroy) = &leaf.destroy {
                        destroy(&leaf.value);
                    }
                }
                Node::Inner(inner) => {
                    let InnerNode { children, .. } = *inner;
                    push_owned_children(children, &mut stack);
                }
            }
        }
        self.size = 0;
    }

    /// A read-only, lexicographically ordered traversal using an explicit
    /// stack (no native recursion, so traversal depth cannot overflow the
    /// call stack even for long, highly compressed keys).
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            stack: self.root.as_deref().into_iter().collect(),
        }
    }

    /// A removal-capable cursor. Snapshots the current key order up front
    /// (an O(n) walk, same cost any full traversal would pay) so that
    /// [`ArtIterator::remove`] can delete the current entry without
    /// invalidating the remaining cursor positions or requiring unsafe
    /// pointers into a live tree.
    pub fn iterator(&mut self) -> ArtIterator<'_> {
        ArtIterator::new(self)
    }
}

impl Drop for Art {
    fn drop(&mut self) {
        self.clear();
    }
}

fn push_owned_children(mut children: Children, stack: &mut Vec<Box<Node>>) {
    // Re-derive ownership order from sorted_pairs' byte order so the
    // destructive drain below still empties in ascending order; the exact
    // order doesn't matter for correctness, only that every child is visited.
    let bytes: Vec<u8> = children.sorted_pairs().iter().map(|(b, _)| *b).collect();
    for byte in bytes {
        if let Some(child) = children.remove(byte) {
            stack.push(child);
        }
    }
}

fn insert_rec(slot: &mut Option<Box<Node>>, key: &[u8], depth: usize, new_leaf: Leaf) -> InsertOutcome {
    if slot.is_none() {
        *slot = Some(Box::new(Node::Leaf(Box::new(new_leaf))));
        return InsertOutcome::Inserted;
    }
    let mut current = slot.take().expect("checked above");
    match current.as_mut() {
        Node::Leaf(existing) => {
            if existing.key.as_ref() == key {
                let old = std::mem::replace(existing.as_mut(), new_leaf);
                *slot = Some(current);
                InsertOutcome::Replaced(Box::new(old))
            } else {
                let common = common_prefix_len(&existing.key, key, depth);
                let prefix = key[depth..depth + common].to_vec();
                let existing_byte = key_byte(&existing.key, depth + common);
                let new_byte = key_byte(key, depth + common);
                let mut inner = InnerNode::new(prefix);
                inner.add_child(existing_byte, current);
                inner.add_child(new_byte, Box::new(Node::Leaf(Box::new(new_leaf))));
                *slot = Some(Box::new(Node::Inner(Box::new(inner))));
                InsertOutcome::Inserted
            }
        }
        Node::Inner(inner) => {
            let common = common_prefix_len(&inner.prefix, key, depth);
            if common < inner.prefix.len() {
                let old_prefix = std::mem::take(&mut inner.prefix);
                let new_prefix = old_prefix[..common].to_vec();
                let remaining_byte = old_prefix[common];
                inner.prefix = old_prefix[common + 1..].to_vec();
                let mut new_inner = InnerNode::new(new_prefix);
                new_inner.add_child(remaining_byte, current);
                let new_byte = key_byte(key, depth + common);
                new_inner.add_child(new_byte, Box::new(Node::Leaf(Box::new(new_leaf))));
                *slot = Some(Box::new(Node::Inner(Box::new(new_inner))));
                InsertOutcome::Inserted
            } else {
                let ndepth = depth + common;
                let byte = key_byte(key, ndepth);
                let outcome = if let Some(child_slot) = inner.children.get_mut_slot(byte) {
                    insert_rec(child_slot, key, ndepth + 1, new_leaf)
                } else {
                    inner.add_child(byte, Box::new(Node::Leaf(Box::new(new_leaf))));
                    InsertOutcome::Inserted
                };
                *slot = Some(current);
                outcome
            }
        }
    }
}

fn search_rec<'a>(node: Option<&'a Node>, key: &[u8], depth: usize) -> Option<&'a Leaf> {
    match node? {
        Node::Leaf(leaf) => (leaf.key.as_ref() == key).then_some(leaf.as_ref()),
        Node::Inner(inner) => {
            let common = common_prefix_len(&inner.prefix, key, depth);
            if common < inner.prefix.len() {
                return None;
            }
            let ndepth = depth + common;
            let byte = key_byte(key, ndepth);
            search_rec(inner.children.get(byte), key, ndepth + 1)
        }
    }
}

fn delete_rec(slot: &mut Option<Box<Node>>, key: &[u8], depth: usize) -> Option<Box<Leaf>> {
    let matches_leaf = matches!(
        slot,
        Some(node) if matches!(node.as_ref(), Node::Leaf(l) if l.key.as_ref() == key)
    );
    if matches_leaf {
        return slot.take().map(|boxed| match *boxed {
            Node::Leaf(l) => l,
            Node::Inner(_) => unreachable!("checked above"),
        });
    }
    match slot {
        None => None,
        Some(node) => match node.as_mut() {
            Node::Leaf(_) => None,
            Node::Inner(inner) => {
                let common = common_prefix_len(&inner.prefix, key, depth);
                if common < inner.prefix.len() {
                    return None;
                }
                let ndepth = depth + common;
                let byte = key_byte(key, ndepth);
                let child_slot = inner.children.get_mut_slot(byte)?;
                let removed = delete_rec(child_slot, key, ndepth + 1);
                if removed.is_some() && child_slot.is_none() {
                    inner.children.remove(byte);
                }
                removed
            }
        },
    }
}

/// Read-only in-order traversal. See [`Art::iter`].
pub struct Iter<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a [u8], &'a Value);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node) = self.stack.pop() {
            match node {
                Node::Leaf(leaf) => return Some((leaf.key.as_ref(), &leaf.value)),
                Node::Inner(inner) => {
                    let pairs = inner.children.sorted_pairs();
                    for (_, child) in pairs.into_iter().rev() {
                        self.stack.push(child);
                    }
                }
            }
        }
        None
    }
}

/// A removal-capable cursor over a snapshot of the tree's key order at the
/// time it was created. See [`Art::iterator`].
pub struct ArtIterator<'a> {
    art: &'a mut Art,
    keys: Vec<Arc<[u8]>>,
    pos: usize,
    current: Option<Arc<[u8]>>,
}

impl<'a> ArtIterator<'a> {
    fn new(art: &'a mut Art) -> Self {
        let keys: Vec<Arc<[u8]>> = art.iter().map(|(k, _)| Arc::from(k)).collect();
        Self {
            art,
            keys,
            pos: 0,
            current: None,
        }
    }

    pub fn has_next(&self) -> bool {
        self.pos < self.keys.len()
    }

    /// Advance the cursor, returning the next `(key, value)` pair. Keys
    /// deleted since the snapshot was taken (via [`Self::remove`] on an
    /// earlier position) are skipped rather than yielded as stale.
    pub fn next(&mut self) -> Option<(Arc<[u8]>, Value)> {
        while self.pos < self.keys.len() {
            let key = self.keys[self.pos].clone();
            self.pos += 1;
            if let Some(value) = self.art.search(&key).cloned() {
                self.current = Some(key.clone());
                return Some((key, value));
            }
        }
        self.current = None;
        None
    }

    /// Remove the entry last returned by [`Self::next`] from the underlying
    /// tree without invalidating the remaining cursor positions.
    pub fn remove(&mut self) -> bool {
        match self.current.take() {
            Some(key) => self.art.delete(&key).unwrap_or(false),
            None => false,
        }
    }
}

#[cfg(test)]
#[path = "art_tests.rs"]
mod tests;
