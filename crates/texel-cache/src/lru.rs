//! Keyed recency list with O(1) touch, insert and remove.
//!
//! Nodes live in a slab and link to each other by index, so moving an entry
//! to the front never reallocates and no unsafe pointer juggling is needed.
//! Front is the most recently used end, back the least recently used.

use std::collections::HashMap;
use std::hash::Hash;

struct Node<K, V> {
    key: K,
    /// `None` while the slot sits on the free list.
    value: Option<V>,
    /// Neighbour toward the front (more recent).
    prev: Option<usize>,
    /// Neighbour toward the back (less recent).
    next: Option<usize>,
}

pub(crate) struct LruList<K, V> {
    nodes: Vec<Node<K, V>>,
    free: Vec<usize>,
    index: HashMap<K, usize>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl<K: Copy + Eq + Hash, V> LruList<K, V> {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
            head: None,
            tail: None,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    #[inline]
    pub fn contains_key(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Insert at the front, replacing (and returning) any previous value for `key`.
    pub fn push_front(&mut self, key: K, value: V) -> Option<V> {
        let old = self.remove(&key);

        let node = Node {
            key,
            value: Some(value),
            prev: None,
            next: None,
        };
        let idx = match self.free.pop() {
            Some(idx) => {
                self.nodes[idx] = node;
                idx
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        };

        self.link_front(idx);
        self.index.insert(key, idx);
        old
    }

    /// Move `key` to the front and return its value.
    pub fn touch(&mut self, key: &K) -> Option<&V> {
        let idx = *self.index.get(key)?;
        if self.head != Some(idx) {
            self.unlink(idx);
            self.link_front(idx);
        }
        self.nodes[idx].value.as_ref()
    }

    /// Look up `key` without changing its position.
    pub fn get(&self, key: &K) -> Option<&V> {
        let idx = *self.index.get(key)?;
        self.nodes[idx].value.as_ref()
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        let idx = self.index.remove(key)?;
        self.unlink(idx);
        self.free.push(idx);
        self.nodes[idx].value.take()
    }

    /// Remove and return the least recently used entry.
    pub fn pop_back(&mut self) -> Option<(K, V)> {
        let key = self.nodes[self.tail?].key;
        self.remove(&key).map(|value| (key, value))
    }

    /// Front (most recent) to back.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            list: self,
            cursor: self.head,
            toward_back: true,
        }
    }

    /// Back (least recent) to front: eviction order.
    pub fn iter_back(&self) -> Iter<'_, K, V> {
        Iter {
            list: self,
            cursor: self.tail,
            toward_back: false,
        }
    }

    fn link_front(&mut self, idx: usize) {
        self.nodes[idx].prev = None;
        self.nodes[idx].next = self.head;
        match self.head {
            Some(old_head) => self.nodes[old_head].prev = Some(idx),
            None => self.tail = Some(idx),
        }
        self.head = Some(idx);
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = (self.nodes[idx].prev, self.nodes[idx].next);
        match prev {
            Some(p) => self.nodes[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.nodes[n].prev = prev,
            None => self.tail = prev,
        }
        self.nodes[idx].prev = None;
        self.nodes[idx].next = None;
    }
}

impl<K: Copy + Eq + Hash, V> Default for LruList<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) struct Iter<'a, K, V> {
    list: &'a LruList<K, V>,
    cursor: Option<usize>,
    toward_back: bool,
}

impl<'a, K: Copy, V> Iterator for Iter<'a, K, V> {
    type Item = (K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let node = &self.list.nodes[self.cursor?];
        self.cursor = if self.toward_back { node.next } else { node.prev };
        node.value.as_ref().map(|value| (node.key, value))
    }
}
