//! Where a texture's pixels come from.

use crate::pixel::SharedPixelBuffer;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Canonical identity of a file-backed texture.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureKey {
    pub path: PathBuf,
    pub tiled: bool,
}

impl TextureKey {
    pub fn new(path: impl Into<PathBuf>, tiled: bool) -> Self {
        Self {
            path: path.into(),
            tiled,
        }
    }
}

/// The content a texture is decoded from.
///
/// Decoding is always repeatable: evicting a texture only drops the decoded
/// copy, never the source.
#[derive(Clone, Default)]
pub enum TextureSource {
    /// No backing content. Renders as the placeholder.
    #[default]
    Empty,
    /// An image file on disk.
    Path(PathBuf),
    /// Encoded image bytes (PNG, JPEG, ...).
    Memory(Arc<[u8]>),
    /// Already-decoded RGBA8 pixels.
    Pixels(SharedPixelBuffer),
}

impl TextureSource {
    /// Whether this is a vector format that must be rasterised at a target size.
    pub fn is_scalable(&self) -> bool {
        match self {
            Self::Path(path) => is_scalable_path(path),
            _ => false,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Path(path) => Some(path),
            _ => None,
        }
    }
}

impl fmt::Debug for TextureSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Memory(bytes) => write!(f, "Memory({} bytes)", bytes.len()),
            Self::Pixels(pixels) => write!(f, "Pixels({}x{})", pixels.width, pixels.height),
        }
    }
}

/// `.svg` files are rasterised on demand and never shared between callers.
pub fn is_scalable_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"))
}
