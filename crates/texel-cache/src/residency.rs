//! Budgeted, least-recently-used texture residency.
//!
//! Every texture known to the cache has an entry, resident or not. Loading
//! one entry may evict others: before a decode is queued, entries are
//! released from the least recently used end until the committed bytes drop
//! below the VRAM budget. A decode only reveals its real size once it
//! finishes, so the budget is checked again before the upload in `bind`.
//! Eviction only drops resident data, never the entry, so an evicted texture
//! reloads the next time it is bound.

use std::sync::Arc;
use std::time::Duration;

use texel_core::{CacheSettings, OversizePolicy, PixelBuffer, Result, TextureSource, VramBudget};
use texel_gpu::{GpuBackend, TextureId};
use texel_media::TextureDecoder;
use tracing::{debug, info, trace, warn};

use crate::entry::{CacheEntry, EntryState};
use crate::handle::HandleId;
use crate::loader::TextureLoader;
use crate::lru::LruList;

/// What [`ResidencyCache::request_load`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Pixels are already in RAM or on the GPU.
    AlreadyResident,
    /// A decode was already queued or running.
    Pending,
    /// Room was made and a decode queued.
    Queued,
    /// Larger than the whole budget under [`OversizePolicy::Refuse`].
    Refused,
    /// No source, or the last decode failed and nothing has changed since.
    Unavailable,
}

/// What [`ResidencyCache::bind_or_placeholder`] bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindResult {
    Texture,
    /// The real texture is not ready; the checkerboard is bound instead.
    Placeholder,
    /// Not even the placeholder could be uploaded.
    Unavailable,
}

/// Cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    /// Entries holding RAM pixels or a GPU texture
    pub resident: usize,
    /// Entries queued for or in the middle of a decode
    pub pending: usize,
    pub evictions: u64,
    pub uploads: u64,
    pub committed_bytes: usize,
    pub budget_bytes: usize,
}

pub struct ResidencyCache {
    order: LruList<HandleId, Arc<CacheEntry>>,
    budget: VramBudget,
    oversize_policy: OversizePolicy,
    gpu: Arc<dyn GpuBackend>,
    placeholder: Option<TextureId>,
    evictions: u64,
    uploads: u64,
    loader: TextureLoader,
}

impl ResidencyCache {
    /// Create a cache and start its loader thread.
    pub fn new(
        settings: &CacheSettings,
        budget: VramBudget,
        decoder: Arc<dyn TextureDecoder>,
        gpu: Arc<dyn GpuBackend>,
    ) -> Result<Self> {
        let loader = TextureLoader::new(decoder, &settings.loader_thread_name)?;
        info!(
            budget_bytes = budget.bytes(),
            policy = ?settings.oversize_policy,
            "Texture cache ready"
        );
        Ok(Self {
            order: LruList::new(),
            budget,
            oversize_policy: settings.oversize_policy,
            gpu,
            placeholder: None,
            evictions: 0,
            uploads: 0,
            loader,
        })
    }

    /// Create a fresh `Unloaded` entry for `id` at the most recent end.
    ///
    /// An existing entry for `id` is released and replaced. Nothing is
    /// evicted here; that waits for the next load request.
    pub fn register(&mut self, id: HandleId, source: TextureSource, tiled: bool) -> Arc<CacheEntry> {
        let entry = Arc::new(CacheEntry::new(id, source, tiled));
        if let Some(old) = self.order.push_front(id, entry.clone()) {
            old.retire();
            old.release(self.gpu.as_ref());
        }
        trace!(?id, "registered");
        entry
    }

    /// Mark `id` most recently used. `None` means it is not cached.
    pub fn touch(&mut self, id: HandleId) -> Option<Arc<CacheEntry>> {
        self.order.touch(&id).cloned()
    }

    /// Look `id` up without affecting its recency.
    pub fn get(&self, id: HandleId) -> Option<Arc<CacheEntry>> {
        self.order.get(&id).cloned()
    }

    /// Make room for `entry` and queue it for decoding.
    pub fn request_load(&mut self, entry: &Arc<CacheEntry>) -> LoadOutcome {
        if entry.is_loaded() {
            return LoadOutcome::AlreadyResident;
        }
        if entry.is_pending() {
            return LoadOutcome::Pending;
        }
        if !entry.has_source() || entry.has_failed() {
            return LoadOutcome::Unavailable;
        }

        let budget = self.budget.bytes();
        let own_size = entry.full_size();
        if own_size > budget {
            match self.oversize_policy {
                OversizePolicy::Refuse => {
                    warn!(
                        id = ?entry.id(),
                        size = own_size,
                        budget,
                        "Texture larger than the whole VRAM budget, not loading"
                    );
                    return LoadOutcome::Refused;
                }
                OversizePolicy::EvictAndLoad => {
                    debug!(id = ?entry.id(), size = own_size, budget, "Oversized texture, emptying cache");
                    self.evict(entry, |committed| committed > 0);
                }
            }
        } else {
            self.evict(entry, |committed| committed >= budget);
        }

        if self.loader.enqueue(entry.clone()) {
            LoadOutcome::Queued
        } else {
            LoadOutcome::Pending
        }
    }

    /// Release entries from the least recently used end while `over` holds.
    /// `keep` and entries with a decode in flight are never released.
    fn evict(&mut self, keep: &Arc<CacheEntry>, over: impl Fn(usize) -> bool) {
        let mut committed = self.committed_size();
        let mut evicted = 0;

        for (id, candidate) in self.order.iter_back() {
            if !over(committed) {
                break;
            }
            if Arc::ptr_eq(candidate, keep) || candidate.is_pending() {
                continue;
            }
            let freed = candidate.release(self.gpu.as_ref());
            if freed == 0 {
                continue;
            }
            committed = committed.saturating_sub(freed);
            evicted += 1;
            debug!(?id, freed, committed, "evicted texture");
        }

        if over(committed) {
            trace!(committed, "still over budget after eviction scan");
        }
        self.evictions += evicted;
    }

    /// Touch `id`, load it if needed and bind it if it is ready.
    ///
    /// Never blocks on the loader: false means the decode has not finished
    /// (or failed) and the caller should draw the placeholder.
    pub fn bind(&mut self, id: HandleId) -> bool {
        let Some(entry) = self.touch(id) else {
            return false;
        };
        if !entry.is_loaded() {
            self.request_load(&entry);
        }

        let was_uploaded = entry.state() == EntryState::Uploaded;
        if entry.state() == EntryState::RamLoaded && !self.make_room_for_upload(&entry) {
            return false;
        }
        let bound = entry.upload_and_bind(self.gpu.as_ref());
        if bound && !was_uploaded {
            self.uploads += 1;
        }
        bound
    }

    /// Bring the committed bytes, `entry`'s decoded pixels included, back
    /// within the budget. False means `entry` alone is over the budget under
    /// [`OversizePolicy::Refuse`]; its pixels are dropped and it stays unloaded.
    fn make_room_for_upload(&mut self, entry: &Arc<CacheEntry>) -> bool {
        let budget = self.budget.bytes();
        let size = entry.full_size();
        if size <= budget {
            self.evict(entry, |committed| committed > budget);
            return true;
        }
        match self.oversize_policy {
            OversizePolicy::Refuse => {
                warn!(
                    id = ?entry.id(),
                    size,
                    budget,
                    "Decoded texture larger than the whole VRAM budget, not uploading"
                );
                entry.release(self.gpu.as_ref());
                false
            }
            OversizePolicy::EvictAndLoad => {
                debug!(id = ?entry.id(), size, budget, "Oversized texture, emptying cache");
                self.evict(entry, |committed| committed > size);
                true
            }
        }
    }

    /// Like [`bind`](Self::bind), but binds the placeholder checkerboard
    /// when the texture is not ready.
    pub fn bind_or_placeholder(&mut self, id: HandleId) -> BindResult {
        if self.bind(id) {
            return BindResult::Texture;
        }
        match self.placeholder_texture() {
            Some(texture) => {
                self.gpu.bind(texture);
                BindResult::Placeholder
            }
            None => BindResult::Unavailable,
        }
    }

    fn placeholder_texture(&mut self) -> Option<TextureId> {
        if self.placeholder.is_none() {
            match self.gpu.upload(&PixelBuffer::placeholder(), false) {
                Ok(texture) => self.placeholder = Some(texture),
                Err(e) => warn!("Placeholder upload failed: {}", e),
            }
        }
        self.placeholder
    }

    /// Forget `id`. A decode still in flight finishes into the retired
    /// entry and is dropped with it.
    pub fn remove(&mut self, id: HandleId) -> bool {
        let Some(entry) = self.order.remove(&id) else {
            return false;
        };
        entry.retire();
        entry.release(self.gpu.as_ref());
        trace!(?id, "removed");
        true
    }

    /// Drop every resident texture, keeping all entries. Used when the GPU
    /// context is lost or torn down.
    pub fn release_all(&mut self) -> usize {
        let mut freed = 0;
        for (_, entry) in self.order.iter() {
            freed += entry.release(self.gpu.as_ref());
        }
        if let Some(texture) = self.placeholder.take() {
            self.gpu.release(texture);
        }
        info!(freed, "Released all textures");
        freed
    }

    /// Request a load for every entry. The most recently used is decoded first.
    pub fn reload_all(&mut self) -> usize {
        let entries: Vec<Arc<CacheEntry>> =
            self.order.iter_back().map(|(_, entry)| entry.clone()).collect();
        let queued = entries
            .iter()
            .filter(|entry| self.request_load(entry) == LoadOutcome::Queued)
            .count();
        info!(queued, "Reloading textures");
        queued
    }

    /// Bytes all entries would take if every one were resident.
    pub fn total_size(&self) -> usize {
        self.order.iter().map(|(_, entry)| entry.full_size()).sum()
    }

    /// Bytes currently resident in RAM or on the GPU.
    pub fn committed_size(&self) -> usize {
        self.order.iter().map(|(_, entry)| entry.vram_usage()).sum()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, id: HandleId) -> bool {
        self.order.contains_key(&id)
    }

    /// Ids from least to most recently used.
    pub fn eviction_order(&self) -> Vec<HandleId> {
        self.order.iter_back().map(|(id, _)| id).collect()
    }

    pub fn budget(&self) -> &VramBudget {
        &self.budget
    }

    pub fn oversize_policy(&self) -> OversizePolicy {
        self.oversize_policy
    }

    pub fn set_oversize_policy(&mut self, policy: OversizePolicy) {
        self.oversize_policy = policy;
    }

    pub fn stats(&self) -> CacheStats {
        let mut stats = CacheStats {
            entries: self.order.len(),
            evictions: self.evictions,
            uploads: self.uploads,
            budget_bytes: self.budget.bytes(),
            ..Default::default()
        };
        for (_, entry) in self.order.iter() {
            let usage = entry.vram_usage();
            if usage > 0 {
                stats.resident += 1;
                stats.committed_bytes += usage;
            }
            if entry.is_pending() {
                stats.pending += 1;
            }
        }
        stats
    }

    pub fn gpu(&self) -> &dyn GpuBackend {
        self.gpu.as_ref()
    }

    pub fn loader(&self) -> &TextureLoader {
        &self.loader
    }

    /// Block until the loader has nothing left to decode, or `timeout` passes.
    pub fn wait_for_loads(&self, timeout: Duration) -> bool {
        self.loader.wait_idle(timeout)
    }
}

impl Drop for ResidencyCache {
    fn drop(&mut self) {
        for (_, entry) in self.order.iter() {
            entry.retire();
            entry.release(self.gpu.as_ref());
        }
        if let Some(texture) = self.placeholder.take() {
            self.gpu.release(texture);
        }
    }
}
