//! Caller-side retention of texture handles.

use crate::handle::{HandleId, TextureHandle};
use crate::lru::LruList;

/// Least-recently-used list of handles a caller wants to keep alive.
///
/// Independent of the residency cache and its budget: this only bounds how
/// many handles the caller holds.
///
/// The list owns strong [`TextureHandle`] clones. While a handle sits here
/// its texture stays registered with the [`TextureContext`] even if every
/// other clone is dropped, so it can still be bound and reloaded. It is not
/// kept resident: the residency cache evicts it like any other entry.
/// Purging or removing a handle gives up that hold; the texture is
/// collected once the last clone goes.
///
/// [`TextureContext`]: crate::TextureContext
#[derive(Default)]
pub struct HandleLru {
    list: LruList<HandleId, TextureHandle>,
    capacity: Option<usize>,
}

impl HandleLru {
    pub fn new() -> Self {
        Self::default()
    }

    /// A list that never holds more than `capacity` handles.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            list: LruList::new(),
            capacity: Some(capacity),
        }
    }

    /// Put `handle` at the most recent end, moving it if already present.
    ///
    /// Returns the handles purged to stay within capacity, oldest first.
    pub fn add(&mut self, handle: TextureHandle) -> Vec<TextureHandle> {
        self.list.push_front(handle.id(), handle);

        let mut purged = Vec::new();
        if let Some(capacity) = self.capacity {
            while self.list.len() > capacity {
                match self.purge_oldest() {
                    Some(oldest) => purged.push(oldest),
                    None => break,
                }
            }
        }
        purged
    }

    pub fn remove(&mut self, handle: &TextureHandle) -> bool {
        self.list.remove(&handle.id()).is_some()
    }

    /// Take the least recently added handle out of the list.
    pub fn purge_oldest(&mut self) -> Option<TextureHandle> {
        self.list.pop_back().map(|(_, handle)| handle)
    }

    pub fn contains(&self, handle: &TextureHandle) -> bool {
        self.list.contains_key(&handle.id())
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Most recent first.
    pub fn iter(&self) -> impl Iterator<Item = &TextureHandle> + '_ {
        self.list.iter().map(|(_, handle)| handle)
    }
}
