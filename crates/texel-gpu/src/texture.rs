//! GPU texture management.

use texel_core::{memory_budget::MAX_TEXTURE_DIMENSION, PixelBuffer, Result, TexelError};

/// Format every cached texture is uploaded in.
pub const TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

/// A sampled GPU texture created from a decoded image.
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub width: u32,
    pub height: u32,
    pub tiled: bool,
}

impl GpuTexture {
    /// Create a texture sized for `pixels` and copy the pixels into it.
    ///
    /// Tiled textures repeat when sampled outside 0..1; others clamp to the edge.
    pub fn from_pixels(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        pixels: &PixelBuffer,
        tiled: bool,
        label: Option<&str>,
    ) -> Result<Self> {
        let (width, height) = (pixels.width, pixels.height);
        if width == 0 || height == 0 {
            return Err(TexelError::InvalidParameter(
                "cannot upload an empty texture".to_string(),
            ));
        }
        if width > MAX_TEXTURE_DIMENSION || height > MAX_TEXTURE_DIMENSION {
            return Err(TexelError::Gpu(format!(
                "texture {}x{} exceeds the {} pixel limit",
                width, height, MAX_TEXTURE_DIMENSION
            )));
        }

        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label,
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TEXTURE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels.as_bytes(),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(pixels.stride() as u32),
                rows_per_image: Some(height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let address_mode = if tiled {
            wgpu::AddressMode::Repeat
        } else {
            wgpu::AddressMode::ClampToEdge
        };
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label,
            address_mode_u: address_mode,
            address_mode_v: address_mode,
            address_mode_w: address_mode,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Ok(Self {
            texture,
            view,
            sampler,
            width,
            height,
            tiled,
        })
    }

    /// Memory usage estimate in bytes.
    pub fn memory_size(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}
