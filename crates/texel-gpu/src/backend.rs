//! The narrow interface the residency cache uses to reach the GPU.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use texel_core::{PixelBuffer, Result, TexelError};

/// Opaque handle to a texture living on the GPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u64);

/// Uploads, binds and releases textures.
///
/// Calls come from the thread that owns the texture cache. Failures are not
/// retried; a texture that failed to upload simply renders as the placeholder.
pub trait GpuBackend: Send + Sync {
    /// Copy RGBA8 pixels into a new GPU texture.
    fn upload(&self, pixels: &PixelBuffer, tiled: bool) -> Result<TextureId>;

    /// Make `texture` the one the next draw samples from.
    fn bind(&self, texture: TextureId);

    /// Free the GPU memory behind `texture`. Unknown ids are ignored.
    fn release(&self, texture: TextureId);
}

/// Upload/bind/release counters of a [`HeadlessBackend`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeadlessStats {
    pub uploads: u64,
    pub binds: u64,
    pub releases: u64,
    /// Textures currently allocated
    pub live: usize,
    /// Bytes currently allocated
    pub live_bytes: usize,
}

#[derive(Default)]
struct HeadlessState {
    live: HashMap<TextureId, usize>,
    bound: Option<TextureId>,
    stats: HeadlessStats,
    fail_uploads: bool,
}

/// A GPU backend that allocates ids instead of textures.
///
/// Used when there is no window or adapter, e.g. batch tools and tests.
#[derive(Default)]
pub struct HeadlessBackend {
    next_id: AtomicU64,
    state: Mutex<HeadlessState>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent upload fail, as a lost device would.
    pub fn set_fail_uploads(&self, fail: bool) {
        self.state.lock().fail_uploads = fail;
    }

    pub fn stats(&self) -> HeadlessStats {
        self.state.lock().stats
    }

    /// The most recently bound texture.
    pub fn bound(&self) -> Option<TextureId> {
        self.state.lock().bound
    }

    pub fn is_live(&self, texture: TextureId) -> bool {
        self.state.lock().live.contains_key(&texture)
    }
}

impl GpuBackend for HeadlessBackend {
    fn upload(&self, pixels: &PixelBuffer, _tiled: bool) -> Result<TextureId> {
        let mut state = self.state.lock();
        if state.fail_uploads {
            return Err(TexelError::Gpu("upload failed: device lost".to_string()));
        }
        if pixels.size().is_empty() {
            return Err(TexelError::InvalidParameter(
                "cannot upload an empty texture".to_string(),
            ));
        }

        let id = TextureId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let bytes = pixels.memory_size();
        state.live.insert(id, bytes);
        state.stats.uploads += 1;
        state.stats.live = state.live.len();
        state.stats.live_bytes += bytes;
        Ok(id)
    }

    fn bind(&self, texture: TextureId) {
        let mut state = self.state.lock();
        state.bound = Some(texture);
        state.stats.binds += 1;
    }

    fn release(&self, texture: TextureId) {
        let mut state = self.state.lock();
        let Some(bytes) = state.live.remove(&texture) else {
            return;
        };
        state.stats.live_bytes -= bytes;
        if state.bound == Some(texture) {
            state.bound = None;
        }
        state.stats.releases += 1;
        state.stats.live = state.live.len();
    }
}
