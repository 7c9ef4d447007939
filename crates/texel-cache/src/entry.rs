//! Per-texture residency record.
//!
//! A [`CacheEntry`] is shared between the owning thread and the loader
//! thread, always behind an `Arc`. Its mutable parts sit behind one mutex,
//! so the pixels the loader stores are visible to the owning thread the
//! moment it next looks at the entry's state.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use texel_core::{PixelBuffer, Result, Size, TexelError, TextureSource};
use texel_gpu::{GpuBackend, TextureId};
use texel_media::TextureDecoder;
use tracing::{trace, warn};

use crate::handle::HandleId;

/// Where an entry's pixels currently live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryState {
    /// Nothing resident.
    Unloaded,
    /// Decoded pixels in RAM, not yet on the GPU.
    RamLoaded,
    /// Uploaded to the GPU.
    Uploaded,
}

/// Result of a decode performed by the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoadResult {
    Stored,
    /// The source or target size changed mid-decode; the pixels were dropped.
    Stale,
}

struct EntryData {
    source: TextureSource,
    pixels: Option<PixelBuffer>,
    texture: Option<TextureId>,
    size: Size,
    target: Option<Size>,
    /// Bumped whenever the source or target size changes.
    generation: u64,
    failed: bool,
}

pub struct CacheEntry {
    id: HandleId,
    tiled: bool,
    data: Mutex<EntryData>,
    pending: AtomicBool,
    retired: AtomicBool,
}

impl CacheEntry {
    pub fn new(id: HandleId, source: TextureSource, tiled: bool) -> Self {
        Self {
            id,
            tiled,
            data: Mutex::new(EntryData {
                source,
                pixels: None,
                texture: None,
                size: Size::ZERO,
                target: None,
                generation: 0,
                failed: false,
            }),
            pending: AtomicBool::new(false),
            retired: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn id(&self) -> HandleId {
        self.id
    }

    #[inline]
    pub fn tiled(&self) -> bool {
        self.tiled
    }

    pub fn state(&self) -> EntryState {
        let data = self.data.lock();
        if data.texture.is_some() {
            EntryState::Uploaded
        } else if data.pixels.is_some() {
            EntryState::RamLoaded
        } else {
            EntryState::Unloaded
        }
    }

    /// Whether pixels are resident in RAM or on the GPU.
    pub fn is_loaded(&self) -> bool {
        self.state() != EntryState::Unloaded
    }

    /// Intrinsic size of the decoded image; zero until the first decode.
    pub fn size(&self) -> Size {
        self.data.lock().size
    }

    /// Size a scalable source was asked to rasterise at.
    pub fn target_size(&self) -> Option<Size> {
        self.data.lock().target
    }

    pub fn source(&self) -> TextureSource {
        self.data.lock().source.clone()
    }

    pub fn has_source(&self) -> bool {
        !self.data.lock().source.is_empty()
    }

    /// The last decode failed; no further decode is attempted until the
    /// source or target size changes.
    pub fn has_failed(&self) -> bool {
        self.data.lock().failed
    }

    /// Bytes this entry keeps resident (RAM pixels or GPU texture).
    pub fn vram_usage(&self) -> usize {
        let data = self.data.lock();
        if data.texture.is_some() || data.pixels.is_some() {
            data.size.byte_size()
        } else {
            0
        }
    }

    /// Bytes this entry costs when resident, whether or not it is.
    pub fn full_size(&self) -> usize {
        self.data.lock().size.byte_size()
    }

    /// Queued for, or in the middle of, a decode.
    #[inline]
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Claim the entry for the loader. False if it was already claimed.
    pub(crate) fn mark_pending(&self) -> bool {
        self.pending
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn clear_pending(&self) {
        self.pending.store(false, Ordering::Release);
    }

    /// Its handle is gone; any decode still queued is skipped.
    pub fn is_retired(&self) -> bool {
        self.retired.load(Ordering::Acquire)
    }

    pub(crate) fn retire(&self) {
        self.retired.store(true, Ordering::Release);
    }

    /// Swap the source, dropping whatever was resident for the old one.
    ///
    /// Happens under the lock that bumps the generation: a decode of the old
    /// source either lands first and is dropped here, or lands after and is
    /// stale.
    pub(crate) fn set_source(&self, source: TextureSource, gpu: &dyn GpuBackend) {
        let mut data = self.data.lock();
        data.source = source;
        data.size = Size::ZERO;
        data.generation += 1;
        data.failed = false;
        Self::drop_resident(&mut data, gpu);
    }

    /// Returns true if the target actually changed, in which case the
    /// pixels rasterised at the old size are dropped.
    pub(crate) fn set_target_size(&self, target: Size, gpu: &dyn GpuBackend) -> bool {
        let mut data = self.data.lock();
        if data.target == Some(target) {
            return false;
        }
        data.target = Some(target);
        data.generation += 1;
        data.failed = false;
        Self::drop_resident(&mut data, gpu);
        true
    }

    fn drop_resident(data: &mut EntryData, gpu: &dyn GpuBackend) {
        if let Some(texture) = data.texture.take() {
            gpu.release(texture);
        }
        data.pixels = None;
    }

    /// Decode the source into RAM. Runs on the loader thread without
    /// holding the entry lock during the decode itself.
    pub(crate) fn load(&self, decoder: &dyn TextureDecoder) -> Result<LoadResult> {
        let (source, target, generation) = {
            let data = self.data.lock();
            (data.source.clone(), data.target, data.generation)
        };

        // a panicking decoder counts as a failed decode
        let decoded = panic::catch_unwind(AssertUnwindSafe(|| decoder.decode(&source, target)))
            .unwrap_or_else(|payload| {
                Err(TexelError::Decode(format!(
                    "decoder panicked: {}",
                    panic_message(payload.as_ref())
                )))
            });

        let mut data = self.data.lock();
        if data.generation != generation || self.is_retired() {
            return Ok(LoadResult::Stale);
        }
        match decoded {
            Ok(pixels) => {
                data.size = pixels.size();
                data.pixels = Some(pixels);
                Ok(LoadResult::Stored)
            }
            Err(e) => {
                data.failed = true;
                Err(e)
            }
        }
    }

    /// Upload RAM pixels if needed, then bind. False when nothing is ready.
    ///
    /// The RAM copy is dropped once the GPU holds the texture.
    pub fn upload_and_bind(&self, gpu: &dyn GpuBackend) -> bool {
        let mut data = self.data.lock();
        if let Some(texture) = data.texture {
            gpu.bind(texture);
            return true;
        }
        let Some(pixels) = data.pixels.as_ref() else {
            return false;
        };
        match gpu.upload(pixels, self.tiled) {
            Ok(texture) => {
                trace!(id = ?self.id, ?texture, "uploaded");
                data.texture = Some(texture);
                data.pixels = None;
                gpu.bind(texture);
                true
            }
            Err(e) => {
                warn!(id = ?self.id, "texture upload failed: {}", e);
                false
            }
        }
    }

    /// Drop the GPU texture and RAM pixels. Returns the bytes freed.
    pub fn release(&self, gpu: &dyn GpuBackend) -> usize {
        let mut data = self.data.lock();
        let resident = data.texture.is_some() || data.pixels.is_some();
        Self::drop_resident(&mut data, gpu);
        if resident {
            data.size.byte_size()
        } else {
            0
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}

impl std::fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheEntry")
            .field("id", &self.id)
            .field("tiled", &self.tiled)
            .field("state", &self.state())
            .field("pending", &self.is_pending())
            .finish()
    }
}
