//! Decoding texture sources into RGBA8 pixel buffers.

use std::io::{BufRead, Cursor, Seek};

use image::imageops::FilterType;
use image::{DynamicImage, ImageError, ImageReader, Limits, RgbaImage};
use texel_core::{
    memory_budget::MAX_TEXTURE_DIMENSION, PixelBuffer, Result, Size, TexelError, TextureSource,
};
use tracing::debug;

/// Turns a [`TextureSource`] into pixels.
///
/// `target` is the size the caller wants the texture rasterised at. Vector
/// decoders must honour it; raster decoders may resample or ignore it.
pub trait TextureDecoder: Send + Sync {
    fn decode(&self, source: &TextureSource, target: Option<Size>) -> Result<PixelBuffer>;
}

/// Raster decoder backed by the `image` crate.
///
/// Handles every format `image` was built with. SVG sources are rejected with
/// [`TexelError::UnsupportedFormat`]; install a vector-capable decoder to
/// render them.
#[derive(Debug, Clone)]
pub struct ImageDecoder {
    max_dimension: u32,
}

impl Default for ImageDecoder {
    fn default() -> Self {
        Self {
            max_dimension: MAX_TEXTURE_DIMENSION,
        }
    }
}

impl ImageDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject images wider or taller than `max` pixels. Encoded sources are
    /// checked from their header, before any pixels are allocated.
    pub fn with_max_dimension(mut self, max: u32) -> Self {
        self.max_dimension = max;
        self
    }

    fn read<R: BufRead + Seek>(&self, mut reader: ImageReader<R>) -> Result<DynamicImage> {
        let mut limits = Limits::default();
        limits.max_image_width = Some(self.max_dimension);
        limits.max_image_height = Some(self.max_dimension);
        reader.limits(limits);
        reader.decode().map_err(map_image_error)
    }

    fn finish(&self, rgba: RgbaImage, target: Option<Size>) -> Result<PixelBuffer> {
        let rgba = match target {
            Some(t) if !t.is_empty() && (t.width, t.height) != rgba.dimensions() => {
                image::imageops::resize(&rgba, t.width, t.height, FilterType::Triangle)
            }
            _ => rgba,
        };

        let (width, height) = rgba.dimensions();
        if width > self.max_dimension || height > self.max_dimension {
            return Err(TexelError::Decode(format!(
                "image {}x{} exceeds the {} pixel limit",
                width, height, self.max_dimension
            )));
        }
        PixelBuffer::from_rgba(width, height, rgba.into_raw())
    }
}

impl TextureDecoder for ImageDecoder {
    fn decode(&self, source: &TextureSource, target: Option<Size>) -> Result<PixelBuffer> {
        let image = match source {
            TextureSource::Empty => {
                return Err(TexelError::NotFound("texture has no source".to_string()))
            }
            TextureSource::Path(path) if source.is_scalable() => {
                return Err(TexelError::UnsupportedFormat(format!(
                    "{}: vector images need a rasterising decoder",
                    path.display()
                )))
            }
            TextureSource::Path(path) => {
                debug!("Decoding {}", path.display());
                self.read(ImageReader::open(path)?)?
            }
            TextureSource::Memory(bytes) => {
                self.read(ImageReader::new(Cursor::new(bytes.as_ref())).with_guessed_format()?)?
            }
            TextureSource::Pixels(pixels) => {
                let copy = RgbaImage::from_raw(
                    pixels.width,
                    pixels.height,
                    pixels.as_bytes().to_vec(),
                )
                .ok_or_else(|| TexelError::Internal("pixel buffer size mismatch".to_string()))?;
                DynamicImage::ImageRgba8(copy)
            }
        };

        self.finish(image.to_rgba8(), target)
    }
}

fn map_image_error(err: ImageError) -> TexelError {
    match err {
        ImageError::IoError(io) => TexelError::Io(io),
        ImageError::Unsupported(e) => TexelError::UnsupportedFormat(e.to_string()),
        other => TexelError::Decode(other.to_string()),
    }
}
