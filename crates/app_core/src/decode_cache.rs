//! Decoded image cache (RAM, entry-count bounded LRU)

use app_fs::UniversalPath;
use image::RgbaImage;
use lru::LruCache;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Decoded image in RAM, orientation applied, RGBA8
#[derive(Debug)]
pub struct DecodedImage {
    pub path: UniversalPath,
    pub pixels: Arc<RgbaImage>,
}

impl DecodedImage {
    pub fn new(path: UniversalPath, pixels: RgbaImage) -> Self {
        Self {
            path,
            pixels: Arc::new(pixels),
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
}

struct Entries {
    lru: LruCache<String, Arc<DecodedImage>>,
    /// File generation per key; only keys changed while a decode was running
    epochs: HashMap<String, u64>,
}

impl Entries {
    fn epoch(&self, key: &str) -> u64 {
        self.epochs.get(key).copied().unwrap_or(0)
    }
}

/// Bounded map from normalized path to decoded pixels
///
/// Lookup, insert, eviction and the epoch check share one lock so
/// concurrent decode completions cannot interleave.
pub struct DecodeCache {
    entries: Mutex<Entries>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl DecodeCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(Entries {
                lru: LruCache::new(capacity),
                epochs: HashMap::new(),
            }),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Get a cached image and mark it most recently used
    pub fn get(&self, path: &UniversalPath) -> Option<Arc<DecodedImage>> {
        let found = self.entries.lock().lru.get(path.key()).cloned();
        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Check presence without touching recency
    pub fn contains(&self, path: &UniversalPath) -> bool {
        self.entries.lock().lru.contains(path.key())
    }

    /// Store a decoded image, evicting the least recently used entry when full
    pub fn insert(&self, image: Arc<DecodedImage>) {
        let mut entries = self.entries.lock();
        Self::push(&mut entries, image);
    }

    /// Store a decoded image only if its file has not changed since `epoch`
    pub fn insert_if_epoch(&self, image: Arc<DecodedImage>, epoch: u64) -> bool {
        let mut entries = self.entries.lock();
        if entries.epoch(image.path.key()) != epoch {
            tracing::debug!("Not caching outdated decode: {}", image.path);
            return false;
        }
        Self::push(&mut entries, image);
        true
    }

    fn push(entries: &mut Entries, image: Arc<DecodedImage>) {
        let key = image.path.key().to_string();
        if let Some((old_key, _)) = entries.lru.push(key.clone(), image) {
            if old_key != key {
                tracing::debug!("Evicted from decode cache: {}", old_key);
            }
        }
    }

    /// Current file epoch of `path`
    pub fn epoch(&self, path: &UniversalPath) -> u64 {
        self.entries.lock().epoch(path.key())
    }

    /// Drop the entry for `path`; returns whether one existed
    pub fn invalidate(&self, path: &UniversalPath) -> bool {
        let removed = self.entries.lock().lru.pop(path.key()).is_some();
        if removed {
            tracing::debug!("Invalidated cache entry: {}", path);
        }
        removed
    }

    /// Drop the entry for `path` and bump its epoch, so decodes started
    /// before the change can no longer be inserted
    pub fn supersede(&self, path: &UniversalPath) -> bool {
        let mut entries = self.entries.lock();
        *entries.epochs.entry(path.key().to_string()).or_insert(0) += 1;
        let removed = entries.lru.pop(path.key()).is_some();
        if removed {
            tracing::debug!("Invalidated cache entry: {}", path);
        }
        removed
    }

    /// Forget the epoch of `path` once no decode for it is running
    pub fn settle(&self, path: &UniversalPath) {
        self.entries.lock().epochs.remove(path.key());
    }

    /// Number of keys with a tracked epoch
    pub fn tracked_epochs(&self) -> usize {
        self.entries.lock().epochs.len()
    }

    /// Clear all entries; epochs stay, decodes may still be running
    pub fn clear(&self) {
        self.entries.lock().lru.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().lru.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.entries.lock().lru.cap().get()
    }

    /// Keys from most to least recently used
    pub fn keys_by_recency(&self) -> Vec<String> {
        self.entries.lock().lru.iter().map(|(k, _)| k.clone()).collect()
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.lock();
        CacheStats {
            entries: entries.lru.len(),
            capacity: entries.lru.cap().get(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl Default for DecodeCache {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_CACHE_CAPACITY)
    }
}
