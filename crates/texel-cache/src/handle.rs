//! Caller-facing texture handles and their deduplication.
//!
//! A [`TextureHandle`] is what widgets hold on to. It owns no pixels: the
//! residency cache looks its entry up by [`HandleId`]. When the last clone
//! of a handle drops, wherever that happens, its id is posted to the
//! owning [`TextureContext`](crate::TextureContext), which removes the entry
//! on its next call.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use crossbeam_channel::{unbounded, Receiver, Sender};
use texel_core::TextureKey;
use tracing::trace;

/// Identity of a texture handle, unique within one registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(u64);

impl HandleId {
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

struct HandleInner {
    id: HandleId,
    key: Option<TextureKey>,
    tiled: bool,
    released: Sender<HandleId>,
}

impl Drop for HandleInner {
    fn drop(&mut self) {
        // The context may already be gone; then there is nothing to clean up.
        let _ = self.released.send(self.id);
    }
}

/// Shared reference to a cached texture. Cloning is cheap.
#[derive(Clone)]
pub struct TextureHandle(Arc<HandleInner>);

impl TextureHandle {
    #[inline]
    pub fn id(&self) -> HandleId {
        self.0.id
    }

    /// Canonical key for file-backed, deduplicated handles.
    pub fn key(&self) -> Option<&TextureKey> {
        self.0.key.as_ref()
    }

    pub fn path(&self) -> Option<&Path> {
        self.0.key.as_ref().map(|key| key.path.as_path())
    }

    #[inline]
    pub fn is_tiled(&self) -> bool {
        self.0.tiled
    }

    /// Number of live clones of this handle.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }
}

impl PartialEq for TextureHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for TextureHandle {}

impl Hash for TextureHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Debug for TextureHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextureHandle")
            .field("id", &self.0.id)
            .field("key", &self.0.key)
            .field("tiled", &self.0.tiled)
            .finish()
    }
}

/// Hands out handles and keeps at most one live handle per canonical key.
///
/// The registry only holds weak references: it never keeps a texture alive.
pub struct HandleRegistry {
    live: HashMap<TextureKey, Weak<HandleInner>>,
    next_id: u64,
    handles: usize,
    released_tx: Sender<HandleId>,
    released_rx: Receiver<HandleId>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        let (released_tx, released_rx) = unbounded();
        Self {
            live: HashMap::new(),
            next_id: 0,
            handles: 0,
            released_tx,
            released_rx,
        }
    }

    /// The live handle for `key`, if one exists. A handle whose last
    /// owner is dropping it is never returned.
    pub fn lookup(&self, key: &TextureKey) -> Option<TextureHandle> {
        self.live.get(key)?.upgrade().map(TextureHandle)
    }

    /// Create a new handle. It is not deduplicated until [`remember`](Self::remember)ed.
    pub fn create(&mut self, key: Option<TextureKey>, tiled: bool) -> TextureHandle {
        self.next_id += 1;
        self.handles += 1;
        let handle = TextureHandle(Arc::new(HandleInner {
            id: HandleId(self.next_id),
            key,
            tiled,
            released: self.released_tx.clone(),
        }));
        trace!(id = ?handle.id(), key = ?handle.key(), "created handle");
        handle
    }

    /// Make `handle` the one future lookups of its key return.
    pub fn remember(&mut self, handle: &TextureHandle) {
        let Some(key) = handle.key() else {
            return;
        };
        self.live.retain(|_, weak| weak.strong_count() > 0);
        self.live.insert(key.clone(), Arc::downgrade(&handle.0));
    }

    /// Ids of handles dropped since the last call.
    pub fn drain_released(&mut self) -> Vec<HandleId> {
        let released: Vec<HandleId> = self.released_rx.try_iter().collect();
        if !released.is_empty() {
            self.handles -= released.len();
            self.live.retain(|_, weak| weak.strong_count() > 0);
        }
        released
    }

    /// Handles created and not yet released.
    pub fn live_handles(&self) -> usize {
        self.handles
    }

    /// Keys currently deduplicated.
    pub fn deduplicated_keys(&self) -> usize {
        self.live
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}

impl Default for HandleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Absolute, symlink-free form of `path`, or `None` if it is empty or
/// does not resolve.
pub fn canonicalize(path: impl AsRef<Path>) -> Option<PathBuf> {
    let path = path.as_ref();
    if path.as_os_str().is_empty() {
        return None;
    }
    std::fs::canonicalize(path).ok()
}
