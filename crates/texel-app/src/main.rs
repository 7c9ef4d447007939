//! Texel - texture cache inspector
//!
//! Loads the given images through the residency cache, binds each one and
//! prints what ended up resident.
//!
//! Usage: `texel [--config settings.json] [--headless] <image>...`

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use texel_cache::{BindResult, TextureContext};
use texel_core::{memory_budget::MAX_TEXTURE_DIMENSION, CacheSettings};
use texel_gpu::{GpuBackend, GpuContext, HeadlessBackend, WgpuBackend};
use texel_media::ImageDecoder;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const LOAD_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Parser)]
#[command(name = "texel")]
#[command(about = "Load images through the texture cache and report what stays resident")]
struct Args {
    /// JSON settings file; TEXEL_* environment variables override it.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Upload to an in-memory backend instead of the GPU.
    #[arg(long)]
    headless: bool,
    #[arg(value_name = "IMAGE", required = true)]
    images: Vec<PathBuf>,
}

fn load_settings(config: Option<&PathBuf>) -> Result<CacheSettings> {
    let settings = match config {
        Some(path) => CacheSettings::from_json_file(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => CacheSettings::default(),
    };
    Ok(settings.merge_env()?)
}

/// Upload backend plus the largest texture edge it accepts.
fn gpu_backend(headless: bool) -> (Arc<dyn GpuBackend>, u32) {
    let headless_backend = || -> (Arc<dyn GpuBackend>, u32) {
        (Arc::new(HeadlessBackend::new()), MAX_TEXTURE_DIMENSION)
    };
    if headless {
        return headless_backend();
    }
    match GpuContext::new_blocking() {
        Ok(context) => (
            Arc::new(WgpuBackend::new(&context)),
            context.max_texture_dimension(),
        ),
        Err(e) => {
            warn!("No GPU available ({}), falling back to headless uploads", e);
            headless_backend()
        }
    }
}

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    let settings = load_settings(args.config.as_ref())?;
    info!(
        "Texel starting: {} MB budget, {:?} oversize policy",
        settings.max_vram_mb, settings.oversize_policy
    );

    let (gpu, max_dimension) = gpu_backend(args.headless);
    let decoder = Arc::new(ImageDecoder::new().with_max_dimension(max_dimension));
    let mut textures = TextureContext::new(settings, decoder, gpu)?;

    let handles: Vec<_> = args
        .images
        .iter()
        .map(|path| (path, textures.get(path, false)))
        .collect();

    if !textures.wait_for_loads(LOAD_TIMEOUT) {
        warn!("Gave up waiting for decodes after {:?}", LOAD_TIMEOUT);
    }

    for (path, handle) in &handles {
        let size = textures.size(handle);
        match textures.bind_or_placeholder(handle) {
            BindResult::Texture => {
                println!("{}: {}x{}", path.display(), size.width, size.height)
            }
            BindResult::Placeholder => println!("{}: not loaded (placeholder)", path.display()),
            BindResult::Unavailable => println!("{}: not loaded", path.display()),
        }
    }

    let stats = textures.stats();
    println!(
        "{} textures, {} resident, {} evicted; {} of {} bytes committed (budget {})",
        stats.entries,
        stats.resident,
        stats.evictions,
        textures.committed_size(),
        textures.total_size(),
        stats.budget_bytes,
    );

    Ok(())
}
