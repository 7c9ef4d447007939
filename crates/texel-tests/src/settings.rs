//! Settings files feeding a running context.

use crate::support::{context_with, write_png, WAIT};
use texel_cache::LoadOutcome;
use texel_core::{CacheSettings, OversizePolicy};

#[test]
fn settings_file_configures_budget_and_policy() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("texel.json");
    std::fs::write(
        &config,
        r#"{ "max_vram_mb": 1, "oversize_policy": "refuse", "loader_thread_name": "bg-decode" }"#,
    )
    .unwrap();

    let settings = CacheSettings::from_json_file(&config).unwrap();
    let budget = settings.budget();
    let (ctx, _gpu) = context_with(settings, budget);

    assert_eq!(ctx.budget().bytes(), 1024 * 1024);
    assert_eq!(ctx.cache().oversize_policy(), OversizePolicy::Refuse);
    assert_eq!(ctx.settings().loader_thread_name, "bg-decode");
}

#[test]
fn refuse_policy_keeps_oversized_texture_out() {
    let dir = tempfile::tempdir().unwrap();
    // 600x600 RGBA8 is about 1.4 MB, over a 1 MB budget
    let poster = write_png(dir.path(), "poster.png", 600, 600);
    let icon = write_png(dir.path(), "icon.png", 5, 5);

    let settings = CacheSettings::default()
        .with_max_vram_mb(1)
        .with_oversize_policy(OversizePolicy::Refuse);
    let budget = settings.budget();
    let (mut ctx, _gpu) = context_with(settings, budget);

    // its size is unknown until the first decode, so it is refused at upload
    let poster = ctx.get(&poster, false);
    assert!(ctx.wait_for_loads(WAIT));
    assert!(!ctx.bind(&poster));
    assert!(!ctx.is_loaded(&poster));
    assert_eq!(ctx.committed_size(), 0);

    let icon = ctx.get(&icon, false);
    assert!(ctx.wait_for_loads(WAIT));
    assert!(ctx.bind(&icon));

    ctx.release_all();
    assert_eq!(ctx.reload_all(), 1);
    assert!(ctx.wait_for_loads(WAIT));
    assert!(!ctx.bind(&poster));
    assert!(ctx.is_loaded(&icon));
    assert_eq!(ctx.rasterize_at(&poster, 600, 600), LoadOutcome::Refused);
}
