//! Texel Media - image decoding for the texture cache
//!
//! Decoding runs on the cache's background loader thread, so decoders must
//! be `Send + Sync` and may block.

pub mod decoder;

pub use decoder::{ImageDecoder, TextureDecoder};
