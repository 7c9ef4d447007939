//! Texel Core - shared types for the texture residency cache
//!
//! This crate provides the types every other Texel crate speaks:
//! - RGBA8 pixel buffers and sizes
//! - Texture sources and canonical keys
//! - Cache settings and the live VRAM budget
//! - The common error type

pub mod error;
pub mod pixel;
pub mod settings;
pub mod source;

pub use error::{Result, TexelError};
pub use pixel::{PixelBuffer, SharedPixelBuffer, Size, BYTES_PER_PIXEL};
pub use settings::{CacheSettings, OversizePolicy, VramBudget};
pub use source::{is_scalable_path, TextureKey, TextureSource};

/// Memory budget defaults.
pub mod memory_budget {
    /// Default resident texture budget in megabytes.
    pub const DEFAULT_MAX_VRAM_MB: usize = 100;

    /// Largest texture edge accepted for upload.
    pub const MAX_TEXTURE_DIMENSION: u32 = 8192;
}
