//! Texel GPU - upload and binding backends
//!
//! The residency cache only ever talks to a [`GpuBackend`]. Two backends ship:
//! [`WgpuBackend`] for real rendering and [`HeadlessBackend`] for tools and
//! tests that run without an adapter.

pub mod backend;
pub mod context;
pub mod texture;
pub mod wgpu_backend;

pub use backend::{GpuBackend, HeadlessBackend, HeadlessStats, TextureId};
pub use context::GpuContext;
pub use texture::{GpuTexture, TEXTURE_FORMAT};
pub use wgpu_backend::WgpuBackend;
