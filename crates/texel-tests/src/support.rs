//! Shared fixtures.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use texel_cache::TextureContext;
use texel_core::{CacheSettings, PixelBuffer, Result, Size, TextureSource, VramBudget};
use texel_gpu::HeadlessBackend;
use texel_media::{ImageDecoder, TextureDecoder};

pub const WAIT: Duration = Duration::from_secs(10);

/// Bytes of a 5x5 RGBA8 texture.
pub const SMALL: usize = 100;

pub fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    image::RgbaImage::from_pixel(width, height, image::Rgba([40, 80, 120, 255]))
        .save(&path)
        .unwrap();
    path
}

/// Decodes `.svg` files to solid colour at the requested size (16x16 by
/// default) and everything else with [`ImageDecoder`].
pub struct VectorDecoder {
    raster: ImageDecoder,
}

impl VectorDecoder {
    pub fn new() -> Self {
        Self {
            raster: ImageDecoder::new(),
        }
    }
}

impl TextureDecoder for VectorDecoder {
    fn decode(&self, source: &TextureSource, target: Option<Size>) -> Result<PixelBuffer> {
        if source.is_scalable() {
            let size = target.unwrap_or(Size::new(16, 16));
            return Ok(PixelBuffer::solid(size.width, size.height, [0, 0, 0, 255]));
        }
        self.raster.decode(source, target)
    }
}

pub fn context_with(
    settings: CacheSettings,
    budget: VramBudget,
) -> (TextureContext, Arc<HeadlessBackend>) {
    let gpu = Arc::new(HeadlessBackend::new());
    let ctx = TextureContext::with_budget(settings, budget, Arc::new(VectorDecoder::new()), gpu.clone())
        .unwrap();
    (ctx, gpu)
}

pub fn context(budget_bytes: usize) -> (TextureContext, Arc<HeadlessBackend>) {
    context_with(CacheSettings::default(), VramBudget::from_bytes(budget_bytes))
}
