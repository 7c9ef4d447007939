//! Background texture decoding.
//!
//! One worker thread drains a stack of pending entries. The newest request
//! is decoded first: when the user scrolls, what just came on screen wins
//! over what was requested a moment ago, at the cost of fairness. A burst of
//! requests can keep an old one waiting indefinitely.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use texel_core::Result;
use texel_media::TextureDecoder;
use tracing::{debug, error, info, warn};

use crate::entry::{CacheEntry, LoadResult};

struct LoaderQueue {
    /// Front is the most recent request.
    stack: VecDeque<Arc<CacheEntry>>,
    /// An entry has been popped and is being decoded.
    busy: bool,
    exit: bool,
}

struct Shared {
    queue: Mutex<LoaderQueue>,
    /// Signalled when work arrives or on shutdown.
    wake: Condvar,
    /// Signalled when the stack drains and the worker goes idle.
    idle: Condvar,
    decoded: AtomicU64,
    failed: AtomicU64,
}

/// Single-threaded, last-in-first-out texture decoder.
///
/// Dropping the loader lets the decode in progress finish, discards
/// everything still queued and joins the thread.
pub struct TextureLoader {
    shared: Arc<Shared>,
    thread: Option<JoinHandle<()>>,
}

impl TextureLoader {
    /// Spawn the worker thread.
    pub fn new(decoder: Arc<dyn TextureDecoder>, thread_name: &str) -> Result<Self> {
        let shared = Arc::new(Shared {
            queue: Mutex::new(LoaderQueue {
                stack: VecDeque::new(),
                busy: false,
                exit: false,
            }),
            wake: Condvar::new(),
            idle: Condvar::new(),
            decoded: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        });

        let worker_shared = shared.clone();
        let thread = thread::Builder::new()
            .name(thread_name.to_string())
            .spawn(move || run(worker_shared, decoder))?;

        info!("Texture loader '{}' started", thread_name);
        Ok(Self {
            shared,
            thread: Some(thread),
        })
    }

    /// Queue `entry` for decoding, ahead of everything already waiting.
    ///
    /// Returns false, doing nothing, if the entry is already resident or
    /// already queued.
    pub fn enqueue(&self, entry: Arc<CacheEntry>) -> bool {
        if entry.is_loaded() || !entry.mark_pending() {
            return false;
        }
        let mut queue = self.shared.queue.lock();
        queue.stack.push_front(entry);
        self.shared.wake.notify_one();
        true
    }

    /// Requests waiting to be decoded, not counting the one in progress.
    pub fn pending(&self) -> usize {
        self.shared.queue.lock().stack.len()
    }

    /// Whether the worker has nothing queued and nothing in progress.
    pub fn is_idle(&self) -> bool {
        let queue = self.shared.queue.lock();
        queue.stack.is_empty() && !queue.busy
    }

    /// Block until the worker is idle or `timeout` passes. Returns whether it went idle.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut queue = self.shared.queue.lock();
        while !queue.stack.is_empty() || queue.busy {
            if self.shared.idle.wait_until(&mut queue, deadline).timed_out() {
                return queue.stack.is_empty() && !queue.busy;
            }
        }
        true
    }

    /// Successful decodes so far.
    pub fn decoded_count(&self) -> u64 {
        self.shared.decoded.load(Ordering::Relaxed)
    }

    /// Failed decodes so far.
    pub fn failed_count(&self) -> u64 {
        self.shared.failed.load(Ordering::Relaxed)
    }
}

impl Drop for TextureLoader {
    fn drop(&mut self) {
        self.shared.queue.lock().exit = true;
        self.shared.wake.notify_one();

        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Texture loader thread panicked");
            }
        }
        debug!("Texture loader stopped");
    }
}

fn run(shared: Arc<Shared>, decoder: Arc<dyn TextureDecoder>) {
    loop {
        let entry = {
            let mut queue = shared.queue.lock();
            loop {
                if queue.exit {
                    for abandoned in queue.stack.drain(..) {
                        abandoned.clear_pending();
                    }
                    shared.idle.notify_all();
                    return;
                }
                if let Some(entry) = queue.stack.pop_front() {
                    queue.busy = true;
                    break entry;
                }
                shared.wake.wait(&mut queue);
            }
        };

        let mut retry = false;
        if !entry.is_retired() {
            match entry.load(decoder.as_ref()) {
                Ok(LoadResult::Stored) => {
                    shared.decoded.fetch_add(1, Ordering::Relaxed);
                }
                Ok(LoadResult::Stale) => {
                    debug!(id = ?entry.id(), "source changed during decode, retrying");
                    retry = !entry.is_retired();
                }
                Err(e) => {
                    shared.failed.fetch_add(1, Ordering::Relaxed);
                    warn!(id = ?entry.id(), source = ?entry.source(), "texture decode failed: {}", e);
                }
            }
        }

        let mut queue = shared.queue.lock();
        queue.busy = false;
        if retry {
            // still pending; the next pop picks it straight back up
            queue.stack.push_front(entry);
            continue;
        }
        entry.clear_pending();
        drop(entry);
        if queue.stack.is_empty() {
            shared.idle.notify_all();
        }
    }
}
