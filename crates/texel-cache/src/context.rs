//! The owning context through which all texture access goes.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use texel_core::{
    is_scalable_path, CacheSettings, PixelBuffer, Result, Size, TextureKey, TextureSource,
    VramBudget,
};
use texel_gpu::GpuBackend;
use texel_media::TextureDecoder;
use tracing::{debug, trace};

use crate::handle::{canonicalize, HandleRegistry, TextureHandle};
use crate::residency::{BindResult, CacheStats, LoadOutcome, ResidencyCache};

/// Owns the residency cache, the handle registry and the loader thread.
///
/// Driven from a single thread (normally the render thread). Handles may be
/// cloned and dropped anywhere; releases are picked up at the start of the
/// next call.
pub struct TextureContext {
    settings: CacheSettings,
    registry: HandleRegistry,
    cache: ResidencyCache,
}

impl TextureContext {
    pub fn new(
        settings: CacheSettings,
        decoder: Arc<dyn TextureDecoder>,
        gpu: Arc<dyn GpuBackend>,
    ) -> Result<Self> {
        let budget = settings.budget();
        Self::with_budget(settings, budget, decoder, gpu)
    }

    /// Use an existing live budget instead of one derived from `settings`.
    pub fn with_budget(
        settings: CacheSettings,
        budget: VramBudget,
        decoder: Arc<dyn TextureDecoder>,
        gpu: Arc<dyn GpuBackend>,
    ) -> Result<Self> {
        let cache = ResidencyCache::new(&settings, budget, decoder, gpu)?;
        Ok(Self {
            settings,
            registry: HandleRegistry::new(),
            cache,
        })
    }

    /// Handle for the image at `path`, sharing a live one when possible.
    ///
    /// Never fails: a path that does not resolve gives a handle with no
    /// content, which renders as the placeholder. Vector images are never
    /// shared because each caller may rasterise them at a different size.
    pub fn get(&mut self, path: impl AsRef<Path>, tiled: bool) -> TextureHandle {
        self.collect_released();
        let path = path.as_ref();

        let Some(canonical) = canonicalize(path) else {
            debug!("Texture path '{}' does not resolve", path.display());
            let handle = self.registry.create(None, tiled);
            self.cache.register(handle.id(), TextureSource::Empty, tiled);
            return handle;
        };

        let key = TextureKey::new(canonical.clone(), tiled);
        if let Some(handle) = self.registry.lookup(&key) {
            trace!(id = ?handle.id(), "reusing live texture");
            return handle;
        }

        let scalable = is_scalable_path(&canonical);
        let handle = self.registry.create(Some(key), tiled);
        let entry = self
            .cache
            .register(handle.id(), TextureSource::Path(canonical), tiled);
        self.cache.request_load(&entry);
        if !scalable {
            self.registry.remember(&handle);
        }
        handle
    }

    /// Handle backed by already-decoded pixels. Never shared.
    pub fn from_pixels(&mut self, pixels: PixelBuffer, tiled: bool) -> TextureHandle {
        self.from_source(TextureSource::Pixels(Arc::new(pixels)), tiled)
    }

    /// Handle backed by encoded image bytes. Never shared.
    pub fn from_memory(&mut self, bytes: impl Into<Arc<[u8]>>, tiled: bool) -> TextureHandle {
        self.from_source(TextureSource::Memory(bytes.into()), tiled)
    }

    fn from_source(&mut self, source: TextureSource, tiled: bool) -> TextureHandle {
        self.collect_released();
        let handle = self.registry.create(None, tiled);
        let entry = self.cache.register(handle.id(), source, tiled);
        self.cache.request_load(&entry);
        handle
    }

    /// Replace the content behind `handle` with `pixels`.
    pub fn replace_pixels(&mut self, handle: &TextureHandle, pixels: PixelBuffer) -> LoadOutcome {
        self.replace_source(handle, TextureSource::Pixels(Arc::new(pixels)))
    }

    /// Replace the content behind `handle` with encoded image bytes.
    pub fn replace_memory(
        &mut self,
        handle: &TextureHandle,
        bytes: impl Into<Arc<[u8]>>,
    ) -> LoadOutcome {
        self.replace_source(handle, TextureSource::Memory(bytes.into()))
    }

    fn replace_source(&mut self, handle: &TextureHandle, source: TextureSource) -> LoadOutcome {
        self.collect_released();
        let Some(entry) = self.cache.touch(handle.id()) else {
            return LoadOutcome::Unavailable;
        };
        entry.set_source(source, self.cache.gpu());
        self.cache.request_load(&entry)
    }

    /// Bind `handle`'s texture. False means draw the placeholder.
    pub fn bind(&mut self, handle: &TextureHandle) -> bool {
        self.collect_released();
        self.cache.bind(handle.id())
    }

    /// Bind `handle`'s texture, or the placeholder if it is not ready.
    pub fn bind_or_placeholder(&mut self, handle: &TextureHandle) -> BindResult {
        self.collect_released();
        self.cache.bind_or_placeholder(handle.id())
    }

    /// Decode a vector source again at `width` x `height`.
    ///
    /// Raster sources ignore this, as does a size equal to the current one.
    pub fn rasterize_at(&mut self, handle: &TextureHandle, width: u32, height: u32) -> LoadOutcome {
        self.collect_released();
        let Some(entry) = self.cache.get(handle.id()) else {
            return LoadOutcome::Unavailable;
        };
        if !entry.source().is_scalable() {
            return self.cache.request_load(&entry);
        }
        if entry.set_target_size(Size::new(width, height), self.cache.gpu()) {
            debug!(id = ?handle.id(), width, height, "rasterising at new size");
        }
        self.cache.request_load(&entry)
    }

    /// Intrinsic pixel size; zero until the first decode completes.
    pub fn size(&self, handle: &TextureHandle) -> Size {
        self.cache
            .get(handle.id())
            .map(|entry| entry.size())
            .unwrap_or(Size::ZERO)
    }

    /// Size a vector source was asked to rasterise at.
    pub fn source_size(&self, handle: &TextureHandle) -> Option<Size> {
        self.cache.get(handle.id())?.target_size()
    }

    pub fn is_tiled(&self, handle: &TextureHandle) -> bool {
        handle.is_tiled()
    }

    /// Whether `handle`'s pixels are in RAM or on the GPU.
    pub fn is_loaded(&self, handle: &TextureHandle) -> bool {
        self.cache
            .get(handle.id())
            .is_some_and(|entry| entry.is_loaded())
    }

    /// Bytes every texture would take if all were resident.
    pub fn total_size(&self) -> usize {
        self.cache.total_size()
    }

    /// Bytes currently resident.
    pub fn committed_size(&self) -> usize {
        self.cache.committed_size()
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Remove the entries of handles dropped since the last call.
    pub fn collect_released(&mut self) -> usize {
        let released = self.registry.drain_released();
        for id in &released {
            self.cache.remove(*id);
        }
        if !released.is_empty() {
            trace!(count = released.len(), "collected released textures");
        }
        released.len()
    }

    /// Drop every resident texture while keeping all handles valid.
    pub fn release_all(&mut self) -> usize {
        self.collect_released();
        self.cache.release_all()
    }

    /// Queue every texture for decoding again, most recently used first.
    pub fn reload_all(&mut self) -> usize {
        self.collect_released();
        self.cache.reload_all()
    }

    /// Block until queued decodes are done, or `timeout` passes.
    pub fn wait_for_loads(&self, timeout: Duration) -> bool {
        self.cache.wait_for_loads(timeout)
    }

    /// Handles handed out and not yet released.
    pub fn live_handles(&self) -> usize {
        self.registry.live_handles()
    }

    pub fn cache(&self) -> &ResidencyCache {
        &self.cache
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    /// The live VRAM budget. Changes apply from the next load request.
    pub fn budget(&self) -> &VramBudget {
        self.cache.budget()
    }
}
