//! Texel Cache - GPU texture residency under a memory budget
//!
//! Callers ask a [`TextureContext`] for textures by path and get back cheap,
//! shareable [`TextureHandle`]s. Decoding happens on a background thread;
//! binding never waits for it. Resident textures are evicted least recently
//! used first whenever a new load would push the cache over its VRAM budget.
//!
//! ```no_run
//! use std::sync::Arc;
//! use texel_cache::TextureContext;
//! use texel_core::CacheSettings;
//! use texel_gpu::HeadlessBackend;
//! use texel_media::ImageDecoder;
//!
//! let mut textures = TextureContext::new(
//!     CacheSettings::default(),
//!     Arc::new(ImageDecoder::new()),
//!     Arc::new(HeadlessBackend::new()),
//! )?;
//! let logo = textures.get("art/logo.png", false);
//! if !textures.bind(&logo) {
//!     // not decoded yet: draw the placeholder this frame
//! }
//! # Ok::<(), texel_core::TexelError>(())
//! ```

pub mod context;
pub mod entry;
pub mod handle;
pub mod loader;
mod lru;
pub mod residency;
pub mod retention;

pub use context::TextureContext;
pub use entry::{CacheEntry, EntryState};
pub use handle::{HandleId, HandleRegistry, TextureHandle};
pub use loader::TextureLoader;
pub use residency::{BindResult, CacheStats, LoadOutcome, ResidencyCache};
pub use retention::HandleLru;
