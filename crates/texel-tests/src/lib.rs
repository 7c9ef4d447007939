//! Integration test crate for Texel.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! Textures are real image files written to a temporary directory, decoded
//! with the `image` crate and uploaded through the headless GPU backend.

#[cfg(test)]
mod support;

#[cfg(test)]
mod registry;

#[cfg(test)]
mod residency;

#[cfg(test)]
mod settings;
