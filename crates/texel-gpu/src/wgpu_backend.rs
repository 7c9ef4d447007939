//! [`GpuBackend`] over a wgpu device.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use texel_core::{PixelBuffer, Result};
use tracing::trace;

use crate::backend::{GpuBackend, TextureId};
use crate::context::GpuContext;
use crate::texture::GpuTexture;

struct WgpuState {
    textures: HashMap<TextureId, GpuTexture>,
    bound: Option<TextureId>,
    next_id: u64,
    memory_used: usize,
}

/// Keeps uploaded textures alive and remembers which one is bound.
///
/// wgpu has no global "current texture"; the renderer reads the bound
/// texture through [`WgpuBackend::with_bound`] when it builds the bind
/// group for the next draw.
pub struct WgpuBackend {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    state: Mutex<WgpuState>,
}

impl WgpuBackend {
    pub fn new(context: &GpuContext) -> Self {
        Self::from_parts(context.device.clone(), context.queue.clone())
    }

    pub fn from_parts(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>) -> Self {
        Self {
            device,
            queue,
            state: Mutex::new(WgpuState {
                textures: HashMap::new(),
                bound: None,
                next_id: 0,
                memory_used: 0,
            }),
        }
    }

    /// Run `f` against the currently bound texture, if any.
    pub fn with_bound<R>(&self, f: impl FnOnce(&GpuTexture) -> R) -> Option<R> {
        let state = self.state.lock();
        let id = state.bound?;
        state.textures.get(&id).map(f)
    }

    /// Number of live textures.
    pub fn texture_count(&self) -> usize {
        self.state.lock().textures.len()
    }

    /// Bytes held by live textures.
    pub fn memory_usage(&self) -> usize {
        self.state.lock().memory_used
    }
}

impl GpuBackend for WgpuBackend {
    fn upload(&self, pixels: &PixelBuffer, tiled: bool) -> Result<TextureId> {
        let texture = GpuTexture::from_pixels(
            &self.device,
            &self.queue,
            pixels,
            tiled,
            Some("Texel Texture"),
        )?;

        let mut state = self.state.lock();
        state.next_id += 1;
        let id = TextureId(state.next_id);
        state.memory_used += texture.memory_size();
        trace!(?id, width = texture.width, height = texture.height, "uploaded texture");
        state.textures.insert(id, texture);
        Ok(id)
    }

    fn bind(&self, texture: TextureId) {
        let mut state = self.state.lock();
        if state.textures.contains_key(&texture) {
            state.bound = Some(texture);
        }
    }

    fn release(&self, texture: TextureId) {
        let mut state = self.state.lock();
        if let Some(tex) = state.textures.remove(&texture) {
            state.memory_used -= tex.memory_size();
            if state.bound == Some(texture) {
                state.bound = None;
            }
            // Dropping the wgpu handles frees the allocation once in-flight
            // command buffers referencing it complete.
            drop(tex);
        }
    }
}
