//! Cache configuration.
//!
//! Settings are layered: built-in defaults, then an optional JSON file, then
//! environment variables. The VRAM budget is additionally exposed as a live
//! [`VramBudget`] so it can be changed while the cache is running.

use crate::{memory_budget, Result, TexelError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Environment variable overriding [`CacheSettings::max_vram_mb`].
pub const ENV_MAX_VRAM_MB: &str = "TEXEL_MAX_VRAM_MB";
/// Environment variable overriding [`CacheSettings::oversize_policy`].
pub const ENV_OVERSIZE_POLICY: &str = "TEXEL_OVERSIZE_POLICY";

/// What to do when a single texture is larger than the whole budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OversizePolicy {
    /// Evict everything else and load it anyway.
    #[default]
    EvictAndLoad,
    /// Leave the cache untouched and never load it; it renders as the placeholder.
    Refuse,
}

impl std::str::FromStr for OversizePolicy {
    type Err = TexelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "evict-and-load" => Ok(Self::EvictAndLoad),
            "refuse" => Ok(Self::Refuse),
            other => Err(TexelError::Config(format!(
                "unknown oversize policy '{}'",
                other
            ))),
        }
    }
}

/// User-configurable cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Maximum resident texture memory in megabytes
    pub max_vram_mb: usize,
    /// Behaviour for textures that exceed the whole budget
    pub oversize_policy: OversizePolicy,
    /// Name given to the background decode thread
    pub loader_thread_name: String,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_vram_mb: memory_budget::DEFAULT_MAX_VRAM_MB,
            oversize_policy: OversizePolicy::default(),
            loader_thread_name: "texel-loader".to_string(),
        }
    }
}

impl CacheSettings {
    /// Sets the VRAM budget in megabytes.
    pub fn with_max_vram_mb(mut self, mb: usize) -> Self {
        self.max_vram_mb = mb;
        self
    }

    /// Sets the oversize policy.
    pub fn with_oversize_policy(mut self, policy: OversizePolicy) -> Self {
        self.oversize_policy = policy;
        self
    }

    /// Parse settings from JSON. Missing keys keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| TexelError::Config(e.to_string()))
    }

    /// Load settings from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&contents)
    }

    /// Write settings as pretty-printed JSON.
    pub fn save_json_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| TexelError::Config(e.to_string()))?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }

    /// Apply `TEXEL_MAX_VRAM_MB` and `TEXEL_OVERSIZE_POLICY` on top of `self`.
    pub fn merge_env(mut self) -> Result<Self> {
        if let Ok(val) = std::env::var(ENV_MAX_VRAM_MB) {
            self.max_vram_mb = val.trim().parse::<usize>().map_err(|_| {
                TexelError::Config(format!("{} must be a whole number, got '{}'", ENV_MAX_VRAM_MB, val))
            })?;
        }
        if let Ok(val) = std::env::var(ENV_OVERSIZE_POLICY) {
            self.oversize_policy = val.parse()?;
        }
        Ok(self)
    }

    /// Defaults overridden by the environment.
    pub fn from_env() -> Result<Self> {
        Self::default().merge_env()
    }

    /// A live budget handle initialised from these settings.
    pub fn budget(&self) -> VramBudget {
        VramBudget::from_mb(self.max_vram_mb)
    }
}

/// Live VRAM budget shared between the cache and whoever configures it.
///
/// Stored in bytes so tests can use budgets smaller than a megabyte.
#[derive(Debug, Clone)]
pub struct VramBudget {
    bytes: Arc<AtomicUsize>,
}

impl VramBudget {
    pub fn from_mb(mb: usize) -> Self {
        Self::from_bytes(mb.saturating_mul(1024 * 1024))
    }

    pub fn from_bytes(bytes: usize) -> Self {
        Self {
            bytes: Arc::new(AtomicUsize::new(bytes)),
        }
    }

    /// Current budget in bytes.
    #[inline]
    pub fn bytes(&self) -> usize {
        self.bytes.load(Ordering::Acquire)
    }

    pub fn set_mb(&self, mb: usize) {
        self.set_bytes(mb.saturating_mul(1024 * 1024));
    }

    pub fn set_bytes(&self, bytes: usize) {
        tracing::debug!(bytes, "VRAM budget changed");
        self.bytes.store(bytes, Ordering::Release);
    }
}

impl Default for VramBudget {
    fn default() -> Self {
        Self::from_mb(memory_budget::DEFAULT_MAX_VRAM_MB)
    }
}
