//! GPU context management.
//!
//! Textures are only ever sampled, so the context asks for downlevel limits
//! and checks up front that the upload format can be filtered.

use std::sync::Arc;
use texel_core::{memory_budget::MAX_TEXTURE_DIMENSION, Result, TexelError};
use tracing::{info, warn};

use crate::texture::TEXTURE_FORMAT;

/// GPU context holding device and queue.
pub struct GpuContext {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,
    max_texture_dimension: u32,
}

impl GpuContext {
    /// Create a context on the default backends for this platform.
    ///
    /// Fails with [`TexelError::Gpu`] when no adapter is found or the adapter
    /// cannot sample [`TEXTURE_FORMAT`] with filtering.
    pub async fn new() -> Result<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::LowPower,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| TexelError::Gpu("No suitable GPU adapter found".to_string()))?;

        info!("Using GPU adapter: {:?}", adapter.get_info());
        check_sampling_support(adapter.get_texture_format_features(TEXTURE_FORMAT))?;

        let adapter_max = adapter.limits().max_texture_dimension_2d;
        let max_texture_dimension = adapter_max.min(MAX_TEXTURE_DIMENSION);
        if adapter_max < MAX_TEXTURE_DIMENSION {
            warn!(
                adapter_max,
                wanted = MAX_TEXTURE_DIMENSION,
                "Adapter caps texture size below the decoder limit"
            );
        }

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Texel Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits {
                        max_texture_dimension_2d: max_texture_dimension,
                        ..wgpu::Limits::downlevel_defaults()
                    },
                    memory_hints: wgpu::MemoryHints::MemoryUsage,
                },
                None,
            )
            .await
            .map_err(|e| TexelError::Gpu(format!("Failed to create device: {}", e)))?;

        Ok(Self {
            instance,
            adapter,
            device: Arc::new(device),
            queue: Arc::new(queue),
            max_texture_dimension,
        })
    }

    /// Create a new GPU context (blocking version).
    pub fn new_blocking() -> Result<Self> {
        pollster::block_on(Self::new())
    }

    /// Get adapter info.
    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    /// Largest width or height the device accepts for a texture.
    pub fn max_texture_dimension(&self) -> u32 {
        self.max_texture_dimension
    }
}

fn check_sampling_support(features: wgpu::TextureFormatFeatures) -> Result<()> {
    let usages = wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST;
    if !features.allowed_usages.contains(usages) {
        return Err(TexelError::Gpu(format!(
            "{:?} cannot be uploaded and sampled on this adapter",
            TEXTURE_FORMAT
        )));
    }
    if !features
        .flags
        .contains(wgpu::TextureFormatFeatureFlags::FILTERABLE)
    {
        return Err(TexelError::Gpu(format!(
            "{:?} is not filterable on this adapter",
            TEXTURE_FORMAT
        )));
    }
    Ok(())
}
