//! Budgeted residency driven through real image files.

use std::sync::Arc;

use crate::support::{context, write_png, SMALL, WAIT};
use texel_cache::{BindResult, EntryState, LoadOutcome, TextureHandle};
use texel_core::{PixelBuffer, Size};

fn state(ctx: &texel_cache::TextureContext, handle: &TextureHandle) -> EntryState {
    ctx.cache().get(handle.id()).unwrap().state()
}

#[test]
fn decoded_file_binds_once_ready() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_png(dir.path(), "banner.png", 12, 7);
    let (mut ctx, gpu) = context(1 << 20);

    let handle = ctx.get(&path, false);
    assert!(ctx.wait_for_loads(WAIT));
    assert_eq!(ctx.size(&handle), Size::new(12, 7));
    assert_eq!(state(&ctx, &handle), EntryState::RamLoaded);

    assert!(ctx.bind(&handle));
    assert!(ctx.bind(&handle));
    assert_eq!(state(&ctx, &handle), EntryState::Uploaded);
    assert_eq!(gpu.stats().uploads, 1);
    assert_eq!(gpu.stats().live_bytes, 12 * 7 * 4);
}

#[test]
fn fifth_texture_evicts_the_least_recent() {
    let dir = tempfile::tempdir().unwrap();
    let (mut ctx, gpu) = context(4 * SMALL);

    let mut handles = Vec::new();
    for name in ["a.png", "b.png", "c.png", "d.png"] {
        let handle = ctx.get(write_png(dir.path(), name, 5, 5), false);
        assert!(ctx.wait_for_loads(WAIT));
        assert!(ctx.bind(&handle));
        handles.push(handle);
    }
    assert_eq!(ctx.committed_size(), 4 * SMALL);

    let e = ctx.get(write_png(dir.path(), "e.png", 5, 5), false);
    assert_eq!(state(&ctx, &handles[0]), EntryState::Unloaded);
    for handle in &handles[1..] {
        assert_eq!(state(&ctx, handle), EntryState::Uploaded);
    }

    assert!(ctx.wait_for_loads(WAIT));
    assert!(ctx.bind(&e));
    assert_eq!(ctx.committed_size(), 4 * SMALL);
    assert_eq!(ctx.total_size(), 5 * SMALL);
    assert_eq!(ctx.stats().evictions, 1);
    assert_eq!(gpu.stats().live, 4);
}

#[test]
fn first_oversized_file_empties_the_cache_on_bind() {
    let dir = tempfile::tempdir().unwrap();
    let (mut ctx, gpu) = context(4 * SMALL);
    let small: Vec<_> = ["a.png", "b.png", "c.png"]
        .iter()
        .map(|name| ctx.get(write_png(dir.path(), name, 5, 5), false))
        .collect();
    assert!(ctx.wait_for_loads(WAIT));
    for handle in &small {
        assert!(ctx.bind(handle));
    }

    let poster = ctx.get(write_png(dir.path(), "poster.png", 20, 20), false);
    assert!(ctx.wait_for_loads(WAIT));
    assert!(ctx.bind(&poster));
    assert!(small.iter().all(|h| !ctx.is_loaded(h)));
    assert_eq!(gpu.stats().live_bytes, 1600);
    assert_eq!(ctx.committed_size(), 1600);
}

#[test]
fn shrinking_the_budget_applies_on_next_load() {
    let dir = tempfile::tempdir().unwrap();
    let (mut ctx, _gpu) = context(2 * SMALL);

    let a = ctx.get(write_png(dir.path(), "a.png", 5, 5), false);
    let b = ctx.get(write_png(dir.path(), "b.png", 5, 5), false);
    assert!(ctx.wait_for_loads(WAIT));
    assert_eq!(ctx.committed_size(), 2 * SMALL);

    ctx.budget().set_bytes(SMALL);
    // nothing happens until something asks for a load
    assert_eq!(ctx.committed_size(), 2 * SMALL);

    let c = ctx.get(write_png(dir.path(), "c.png", 5, 5), false);
    assert!(ctx.wait_for_loads(WAIT));
    assert!(!ctx.is_loaded(&a));
    assert!(!ctx.is_loaded(&b));
    assert!(ctx.is_loaded(&c));
    assert_eq!(ctx.committed_size(), SMALL);
}

#[test]
fn corrupt_file_renders_as_placeholder() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.png");
    std::fs::write(&path, b"\x89PNG but not really").unwrap();
    let (mut ctx, gpu) = context(1 << 20);

    let handle = ctx.get(&path, false);
    assert!(ctx.wait_for_loads(WAIT));
    assert_eq!(ctx.bind_or_placeholder(&handle), BindResult::Placeholder);
    assert_eq!(ctx.bind_or_placeholder(&handle), BindResult::Placeholder);
    assert_eq!(ctx.size(&handle), Size::ZERO);
    assert_eq!(ctx.cache().loader().failed_count(), 1);
    // only the placeholder was ever uploaded
    assert_eq!(gpu.stats().uploads, 1);
}

#[test]
fn memory_sources_decode_and_can_be_replaced() {
    let mut encoded = Vec::new();
    image::DynamicImage::ImageRgba8(image::RgbaImage::new(3, 3))
        .write_to(&mut std::io::Cursor::new(&mut encoded), image::ImageFormat::Png)
        .unwrap();
    let (mut ctx, _gpu) = context(1 << 20);

    let handle = ctx.from_memory(encoded, false);
    assert!(ctx.wait_for_loads(WAIT));
    assert_eq!(ctx.size(&handle), Size::new(3, 3));
    assert!(ctx.bind(&handle));

    assert_eq!(
        ctx.replace_pixels(&handle, PixelBuffer::solid(6, 2, [9, 9, 9, 255])),
        LoadOutcome::Queued
    );
    assert!(ctx.wait_for_loads(WAIT));
    assert_eq!(ctx.size(&handle), Size::new(6, 2));

    let garbage: Arc<[u8]> = Arc::from(&b"garbage"[..]);
    ctx.replace_memory(&handle, garbage);
    assert!(ctx.wait_for_loads(WAIT));
    assert!(!ctx.bind(&handle));
}

#[test]
fn vector_sources_rasterise_at_requested_size() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("icon.svg");
    std::fs::write(&path, "<svg xmlns=\"http://www.w3.org/2000/svg\"/>").unwrap();
    let (mut ctx, gpu) = context(1 << 20);

    let small = ctx.get(&path, false);
    let large = ctx.get(&path, false);
    assert!(ctx.wait_for_loads(WAIT));
    assert_eq!(ctx.size(&small), Size::new(16, 16));
    assert!(ctx.source_size(&small).is_none());

    ctx.rasterize_at(&small, 8, 8);
    ctx.rasterize_at(&large, 64, 32);
    assert!(ctx.wait_for_loads(WAIT));
    assert_eq!(ctx.size(&small), Size::new(8, 8));
    assert_eq!(ctx.size(&large), Size::new(64, 32));
    assert_eq!(ctx.source_size(&large), Some(Size::new(64, 32)));

    assert!(ctx.bind(&large));
    // same size again keeps the uploaded texture
    assert_eq!(ctx.rasterize_at(&large, 64, 32), LoadOutcome::AlreadyResident);
    assert!(ctx.bind(&large));
    assert_eq!(gpu.stats().uploads, 1);
}

#[test]
fn release_all_then_reload_all_restores_residency() {
    let dir = tempfile::tempdir().unwrap();
    let (mut ctx, gpu) = context(1 << 20);
    let handles: Vec<_> = ["a.png", "b.png", "c.png"]
        .iter()
        .map(|name| ctx.get(write_png(dir.path(), name, 5, 5), false))
        .collect();
    assert!(ctx.wait_for_loads(WAIT));
    for handle in &handles {
        assert!(ctx.bind(handle));
    }

    assert_eq!(ctx.release_all(), 3 * SMALL);
    assert_eq!(gpu.stats().live, 0);
    assert!(handles.iter().all(|h| !ctx.is_loaded(h)));

    assert_eq!(ctx.reload_all(), 3);
    assert!(ctx.wait_for_loads(WAIT));
    for handle in &handles {
        assert!(ctx.bind(handle));
    }
    assert_eq!(ctx.committed_size(), 3 * SMALL);
    assert_eq!(gpu.stats().uploads, 6);
}
