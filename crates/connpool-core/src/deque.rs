// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A bounded, taggable work queue.
//!
//! The source keeps an intrusive doubly-linked list so that a handle to any
//! node can be unlinked in O(1) without a list scan. Safe Rust has no
//! non-owning intrusive pointers, so this stores entries in a slot arena
//! (`Vec<Slot>` plus a free list) linked by index instead of by pointer —
//! the same O(1) link/unlink shape, reached without `unsafe`.

use std::cmp::Ordering;

use parking_lot::Mutex;

use crate::error::CoreError;
use crate::value::Value;

/// A handle returned by [`Deque::add_head`] / [`Deque::add_tail`], usable
/// with [`Deque::get`] and [`Deque::remove`] for O(1) direct access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(usize);

struct Entry {
    value: Value,
    tag: Option<String>,
}

struct Slot {
    entry: Option<Entry>,
    prev: Option<usize>,
    next: Option<usize>,
}

struct Inner {
    slots: Vec<Slot>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl Inner {
    fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    fn alloc(&mut self, entry: Entry) -> usize {
        let idx = match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Slot {
                    entry: Some(entry),
                    prev: None,
                    next: None,
                };
                idx
            }
            None => {
                self.slots.push(Slot {
                    entry: Some(entry),
                    prev: None,
                    next: None,
                });
                self.slots.len() - 1
            }
        };
        idx
    }

    fn push_front(&mut self, entry: Entry) -> usize {
        let idx = self.alloc(entry);
        match self.head {
            Some(old_head) => {
                self.slots[idx].next = Some(old_head);
                self.slots[old_head].prev = Some(idx);
                self.head = Some(idx);
            }
            None => {
                self.head = Some(idx);
                self.tail = Some(idx);
            }
        }
        self.len += 1;
        idx
    }

    fn push_back(&mut self, entry: Entry) -> usize {
        let idx = self.alloc(entry);
        match self.tail {
            Some(old_tail) => {
                self.slots[idx].prev = Some(old_tail);
                self.slots[old_tail].next = Some(idx);
                self.tail = Some(idx);
            }
            None => {
                self.head = Some(idx);
                self.tail = Some(idx);
            }
        }
        self.len += 1;
        idx
    }

    /// Unlink `idx` from the chain and return its entry, in O(1).
    fn unlink(&mut self, idx: usize) -> Option<Entry> {
        let slot = self.slots.get_mut(idx)?;
        let entry = slot.entry.take()?;
        let (prev, next) = (slot.prev, slot.next);
        match prev {
            Some(p) => self.slots[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.slots[n].prev = prev,
            None => self.tail = prev,
        }
        self.slots[idx].prev = None;
        self.slots[idx].next = None;
        self.free.push(idx);
        self.len -= 1;
        Some(entry)
    }

    fn iter_indices(&self) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.len);
        let mut cur = self.head;
        while let Some(idx) = cur {
            out.push(idx);
            cur = self.slots[idx].next;
        }
        out
    }
}

/// A bounded (when `capacity` is set) FIFO/LIFO work queue of tagged values.
pub struct Deque {
    inner: Mutex<Inner>,
    capacity: Option<usize>,
    /// Recorded for API fidelity with the source's optional-locking flag;
    /// the arena above is always guarded by a `parking_lot::Mutex`, which is
    /// cheap enough uncontended that a second lock-free code path isn't
    /// worth the duplication.
    thread_safe: bool,
}

impl Deque {
    pub fn new(thread_safe: bool) -> Self {
        Self {
            inner: Mutex::new(Inner::new()),
            capacity: None,
            thread_safe,
        }
    }

    pub fn with_capacity(thread_safe: bool, capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::new()),
            capacity: Some(capacity),
            thread_safe,
        }
    }

    pub fn is_thread_safe(&self) -> bool {
        self.thread_safe
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_capacity(&self, inner: &Inner) -> Result<(), CoreError> {
        match self.capacity {
            Some(cap) if inner.len >= cap => Err(CoreError::AllocationFailed),
            _ => Ok(()),
        }
    }

    /// Push to the front (LIFO pop order relative to `poll`).
    pub fn add_head(&self, value: Value, tag: Option<String>) -> Result<Handle, CoreError> {
        let mut inner = self.inner.lock();
        self.check_capacity(&inner)?;
        Ok(Handle(inner.push_front(Entry { value, tag })))
    }

    /// Push to the back (FIFO order relative to `poll`).
    pub fn add_tail(&self, value: Value, tag: Option<String>) -> Result<Handle, CoreError> {
        let mut inner = self.inner.lock();
        self.check_capacity(&inner)?;
        Ok(Handle(inner.push_back(Entry { value, tag })))
    }

    /// Pop from the front.
    pub fn poll(&self) -> Option<Value> {
        let mut inner = self.inner.lock();
        let idx = inner.head?;
        inner.unlink(idx).map(|e| e.value)
    }

    /// Pop from the back.
    pub fn poll_last(&self) -> Option<Value> {
        let mut inner = self.inner.lock();
        let idx = inner.tail?;
        inner.unlink(idx).map(|e| e.value)
    }

    /// Inspect the front entry without removing it.
    pub fn peek(&self) -> Option<Value> {
        let inner = self.inner.lock();
        let idx = inner.head?;
        inner.slots[idx].entry.as_ref().map(|e| e.value.clone())
    }

    /// Inspect the back entry without removing it.
    pub fn peek_last(&self) -> Option<Value> {
        let inner = self.inner.lock();
        let idx = inner.tail?;
        inner.slots[idx].entry.as_ref().map(|e| e.value.clone())
    }

    /// Direct O(1) access to an entry by handle, without removing it.
    pub fn get(&self, handle: Handle) -> Option<Value> {
        let inner = self.inner.lock();
        inner
            .slots
            .get(handle.0)
            .and_then(|s| s.entry.as_ref())
            .map(|e| e.value.clone())
    }

    /// The first entry (front to back) whose tag equals `tag`, without
    /// removing it. Distinct from [`Deque::remove_by_tag`], which removes
    /// every match.
    pub fn get_by_tag(&self, tag: &str) -> Option<Value> {
        let inner = self.inner.lock();
        inner.iter_indices().into_iter().find_map(|idx| {
            let entry = inner.slots[idx].entry.as_ref()?;
            (entry.tag.as_deref() == Some(tag)).then(|| entry.value.clone())
        })
    }

    /// Direct O(1) removal of an entry by handle.
    pub fn remove(&self, handle: Handle) -> Option<Value> {
        let mut inner = self.inner.lock();
        inner.unlink(handle.0).map(|e| e.value)
    }

    /// Remove every entry whose tag equals `tag`, returning how many were
    /// removed.
    pub fn remove_by_tag(&self, tag: &str) -> usize {
        let mut inner = self.inner.lock();
        let matching: Vec<usize> = inner
            .iter_indices()
            .into_iter()
            .filter(|&idx| inner.slots[idx].entry.as_ref().and_then(|e| e.tag.as_deref()) == Some(tag))
            .collect();
        for idx in &matching {
            inner.unlink(*idx);
        }
        matching.len()
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        *inner = Inner::new();
    }

    /// Snapshot of every value, front to back.
    pub fn to_vec(&self) -> Vec<Value> {
        let inner = self.inner.lock();
        inner
            .iter_indices()
            .into_iter()
            .filter_map(|idx| inner.slots[idx].entry.as_ref().map(|e| e.value.clone()))
            .collect()
    }

    /// Reorder the queue in place according to `cmp`.
    pub fn sort_by<F>(&self, mut cmp: F)
    where
        F: FnMut(&Value, &Value) -> Ordering,
    {
        let mut inner = self.inner.lock();
        let indices = inner.iter_indices();
        let mut entries: Vec<Entry> = indices
            .iter()
            .map(|&idx| inner.slots[idx].entry.take().expect("index came from iter_indices"))
            .collect();
        entries.sort_by(|a, b| cmp(&a.value, &b.value));
        *inner = Inner::new();
        for entry in entries {
            inner.push_back(entry);
        }
    }

    /// A cursor over a front-to-back snapshot of the queue, capable of
    /// removing the current entry mid-traversal.
    pub fn iterator(&self) -> DequeIterator<'_> {
        DequeIterator::new(self)
    }
}

/// A removal-capable cursor over a [`Deque`]. Mirrors `connpool_core::art`'s
/// `ArtIterator`: the key order is snapshotted up front (one O(n) pass, the
/// same cost any full traversal pays), and entries removed since the
/// snapshot — whether through [`DequeIterator::remove`] or directly through
/// the deque — are skipped rather than yielded as stale.
pub struct DequeIterator<'a> {
    deque: &'a Deque,
    handles: Vec<Handle>,
    pos: usize,
    current: Option<Handle>,
}

impl<'a> DequeIterator<'a> {
    fn new(deque: &'a Deque) -> Self {
        let handles = deque.inner.lock().iter_indices().into_iter().map(Handle).collect();
        Self {
            deque,
            handles,
            pos: 0,
            current: None,
        }
    }

    pub fn has_next(&self) -> bool {
        self.pos < self.handles.len()
    }

    /// Advance the cursor, returning the next live `(Handle, Value)` pair.
    pub fn next(&mut self) -> Option<(Handle, Value)> {
        while self.pos < self.handles.len() {
            let handle = self.handles[self.pos];
            self.pos += 1;
            if let Some(value) = self.deque.get(handle) {
                self.current = Some(handle);
                return Some((handle, value));
            }
        }
        self.current = None;
        None
    }

    /// Removes the entry most recently returned by [`Self::next`].
    pub fn remove(&mut self) -> Option<Value> {
        let handle = self.current.take()?;
        self.deque.remove(handle)
    }
}

#[cfg(test)]
#[path = "deque_tests.rs"]
mod tests;
