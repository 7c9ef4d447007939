//! Handle lookup, sharing and release across the context.

use crate::support::{context, write_png, WAIT};
use texel_cache::HandleLru;

#[test]
fn same_path_returns_same_handle() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_png(dir.path(), "wall.png", 5, 5);
    let (mut ctx, gpu) = context(10_000);

    let a = ctx.get(&path, false);
    let b = ctx.get(dir.path().join(".").join("wall.png"), false);
    assert_eq!(a, b);
    assert_eq!(a.ref_count(), 2);
    assert_eq!(ctx.cache().len(), 1);

    assert!(ctx.wait_for_loads(WAIT));
    assert!(ctx.bind(&a));
    assert!(ctx.bind(&b));
    assert_eq!(gpu.stats().uploads, 1);
}

#[test]
fn tiled_flag_is_part_of_identity() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_png(dir.path(), "floor.png", 5, 5);
    let (mut ctx, _gpu) = context(10_000);

    let plain = ctx.get(&path, false);
    let tiled = ctx.get(&path, true);
    assert_ne!(plain, tiled);
    assert!(!ctx.is_tiled(&plain));
    assert!(ctx.is_tiled(&tiled));
    assert_eq!(ctx.cache().len(), 2);
}

#[test]
fn vector_images_are_never_shared() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("logo.svg");
    std::fs::write(&path, "<svg xmlns=\"http://www.w3.org/2000/svg\"/>").unwrap();
    let (mut ctx, _gpu) = context(10_000);

    let a = ctx.get(&path, false);
    let b = ctx.get(&path, false);
    assert_ne!(a, b);
    assert_eq!(a.path(), b.path());
}

#[test]
fn released_handle_is_replaced_by_a_new_one() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_png(dir.path(), "crate.png", 5, 5);
    let (mut ctx, gpu) = context(10_000);

    let first = ctx.get(&path, false);
    let first_id = first.id();
    assert!(ctx.wait_for_loads(WAIT));
    assert!(ctx.bind(&first));
    drop(first);

    let second = ctx.get(&path, false);
    assert_ne!(second.id(), first_id);
    assert!(!ctx.cache().contains(first_id));
    assert_eq!(ctx.live_handles(), 1);
    // the old texture went with its handle
    assert_eq!(gpu.stats().releases, 1);
}

#[test]
fn handles_dropped_elsewhere_are_collected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_png(dir.path(), "tree.png", 5, 5);
    let (mut ctx, _gpu) = context(10_000);

    let handle = ctx.get(&path, false);
    std::thread::spawn(move || drop(handle)).join().unwrap();

    assert_eq!(ctx.collect_released(), 1);
    assert!(ctx.cache().is_empty());
}

#[test]
fn missing_files_give_empty_handles() {
    let (mut ctx, _gpu) = context(10_000);
    let a = ctx.get("/no/such/dir/missing.png", false);
    let b = ctx.get("/no/such/dir/missing.png", false);

    // nothing to share without a canonical path
    assert_ne!(a, b);
    assert!(a.key().is_none());
    assert!(!ctx.bind(&a));
    assert!(!ctx.is_loaded(&a));
}

#[test]
fn bounded_retention_releases_purged_handles() {
    let dir = tempfile::tempdir().unwrap();
    let (mut ctx, _gpu) = context(10_000);
    let mut recent = HandleLru::with_capacity(2);

    for name in ["a.png", "b.png", "c.png"] {
        let path = write_png(dir.path(), name, 5, 5);
        let handle = ctx.get(&path, false);
        for purged in recent.add(handle) {
            drop(purged);
        }
    }

    assert_eq!(recent.len(), 2);
    assert_eq!(ctx.collect_released(), 1);
    assert_eq!(ctx.cache().len(), 2);
    assert_eq!(ctx.live_handles(), 2);
}
