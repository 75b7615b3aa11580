//! Image loading and decoding service
//!
//! Decoding runs on a dedicated worker pool. Results come back to the
//! UI-owning thread through a channel that is drained by
//! [`LoadDispatcher::poll`]; each request carries the load id it was issued
//! under and is dropped on delivery when its [`LoadGate`] has moved on.

use crate::decode_cache::{DecodeCache, DecodedImage};
use crate::error::{AppError, Result};
use app_fs::UniversalPath;
use crossbeam_channel::{Receiver, Sender};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use image::{DynamicImage, ImageDecoder, ImageReader, RgbaImage};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Monotonically increasing request identifier
pub type LoadId = u64;

/// Per-viewer generation token
///
/// Every request issues a fresh id; only the most recently issued id is
/// "current". Clones share the same counter.
#[derive(Debug, Clone, Default)]
pub struct LoadGate {
    current: Arc<AtomicU64>,
}

impl LoadGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new id, superseding every earlier one
    pub fn issue(&self) -> LoadId {
        self.current.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn current(&self) -> LoadId {
        self.current.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, id: LoadId) -> bool {
        self.current() == id
    }

    /// Suppress delivery of whatever is in flight (best effort)
    pub fn cancel(&self) {
        self.current.fetch_add(1, Ordering::SeqCst);
    }
}

/// Load request
#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub path: UniversalPath,
    pub load_id: LoadId,
    pub max_dimension: Option<u32>,
}

/// Immediate answer to [`LoadDispatcher::request`]
#[derive(Debug)]
pub enum LoadStatus {
    /// Cache hit, delivered without a thread hand-off
    Ready(Arc<DecodedImage>),
    /// Decode submitted; watch for a [`LoadEvent`] with this id
    Pending(LoadId),
}

/// Delivered load result
#[derive(Debug)]
pub struct LoadEvent {
    pub request: LoadRequest,
    pub result: std::result::Result<Arc<DecodedImage>, Arc<AppError>>,
}

/// Pixel source used by the worker pool
pub trait ImageSource: Send + Sync {
    fn decode(&self, path: &UniversalPath, max_dimension: Option<u32>) -> Result<RgbaImage>;
}

/// Decodes image files from disk
#[derive(Debug, Default, Clone, Copy)]
pub struct FileDecoder;

impl ImageSource for FileDecoder {
    fn decode(&self, path: &UniversalPath, max_dimension: Option<u32>) -> Result<RgbaImage> {
        decode_file(path.as_path(), max_dimension)
    }
}

/// Decode a file, apply its EXIF orientation and convert to RGBA8
pub fn decode_file(path: &Path, max_dimension: Option<u32>) -> Result<RgbaImage> {
    tracing::debug!("Loading image: {}", path.display());

    if !path.exists() {
        return Err(AppError::FileNotFound(path.display().to_string()));
    }

    let reader = ImageReader::open(path)?
        .with_guessed_format()
        .map_err(|e| AppError::ImageDecode(e.to_string()))?;

    let mut decoder = reader
        .into_decoder()
        .map_err(|e| AppError::ImageDecode(format!("{}: {}", path.display(), e)))?;
    let orientation = decoder
        .orientation()
        .map_err(|e| AppError::ImageDecode(e.to_string()))?;

    let mut img = DynamicImage::from_decoder(decoder)
        .map_err(|e| AppError::ImageDecode(format!("{}: {}", path.display(), e)))?;
    img.apply_orientation(orientation);

    // Resize if needed
    if let Some(max) = max_dimension {
        if img.width() > max || img.height() > max {
            img = img.thumbnail(max, max);
        }
    }

    Ok(img.to_rgba8())
}

struct Waiter {
    request: LoadRequest,
    gate: LoadGate,
}

struct Completed {
    path: UniversalPath,
    /// File epoch the decode started under
    epoch: u64,
    result: std::result::Result<Arc<DecodedImage>, Arc<AppError>>,
}

/// Async load dispatcher
pub struct LoadDispatcher {
    cache: Arc<DecodeCache>,
    source: Arc<dyn ImageSource>,
    pool: rayon::ThreadPool,
    /// Jobs in flight by cache key, with the requests waiting on each
    in_flight: DashMap<String, Vec<Waiter>>,
    done_tx: Sender<Completed>,
    done_rx: Receiver<Completed>,
    max_dimension: Option<u32>,
}

impl LoadDispatcher {
    /// Create a dispatcher decoding through `source`
    pub fn with_source(
        cache: Arc<DecodeCache>,
        source: Arc<dyn ImageSource>,
        worker_threads: usize,
        max_dimension: Option<u32>,
    ) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(worker_threads)
            .thread_name(|i| format!("decode-{}", i))
            .build()
            .map_err(|e| AppError::WorkerPool(e.to_string()))?;

        let (done_tx, done_rx) = crossbeam_channel::unbounded();

        tracing::info!(threads = pool.current_num_threads(), "Load dispatcher started");

        Ok(Self {
            cache,
            source,
            pool,
            in_flight: DashMap::new(),
            done_tx,
            done_rx,
            max_dimension,
        })
    }

    pub fn cache(&self) -> &Arc<DecodeCache> {
        &self.cache
    }

    /// Decode size cap, if any
    pub fn max_dimension(&self) -> Option<u32> {
        self.max_dimension
    }

    /// Request pixels for `path` under a freshly issued id of `gate`
    pub fn request(&self, path: &UniversalPath, gate: &LoadGate) -> LoadStatus {
        let load_id = gate.issue();

        if let Some(image) = self.cache.get(path) {
            tracing::debug!("Cache hit: {}", path);
            return LoadStatus::Ready(image);
        }

        let waiter = Waiter {
            request: LoadRequest {
                path: path.clone(),
                load_id,
                max_dimension: self.max_dimension,
            },
            gate: gate.clone(),
        };

        match self.in_flight.entry(path.key().to_string()) {
            Entry::Occupied(mut pending) => {
                // Already decoding (usually a prefetch); wait for that job
                pending.get_mut().push(waiter);
            }
            Entry::Vacant(slot) => {
                slot.insert(vec![waiter]);
                self.spawn_decode(path.clone());
            }
        }

        LoadStatus::Pending(load_id)
    }

    /// Warm the cache for `paths` without delivering anything
    pub fn prefetch<'a, I>(&self, paths: I)
    where
        I: IntoIterator<Item = &'a UniversalPath>,
    {
        for path in paths {
            if self.cache.contains(path) {
                continue;
            }
            if let Entry::Vacant(slot) = self.in_flight.entry(path.key().to_string()) {
                tracing::debug!("Prefetching: {}", path);
                slot.insert(Vec::new());
                self.spawn_decode(path.clone());
            }
        }
    }

    /// Forget cached pixels of `path` after it changed on disk
    ///
    /// Decodes already running for it are neither cached nor delivered;
    /// their waiters are moved to a fresh decode.
    pub fn invalidate(&self, path: &UniversalPath) -> bool {
        if self.in_flight.contains_key(path.key()) {
            self.cache.supersede(path)
        } else {
            self.cache.invalidate(path)
        }
    }

    /// Whether a decode for `path` is still in flight
    pub fn is_loading(&self, path: &UniversalPath) -> bool {
        self.in_flight.contains_key(path.key())
    }

    pub fn pending_jobs(&self) -> usize {
        self.in_flight.len()
    }

    /// Drain finished jobs without blocking
    pub fn poll(&self) -> Vec<LoadEvent> {
        let mut events = Vec::new();
        while let Ok(done) = self.done_rx.try_recv() {
            self.deliver(done, &mut events);
        }
        events
    }

    /// Block until at least one current result is available or `timeout` passes
    pub fn wait(&self, timeout: Duration) -> Vec<LoadEvent> {
        let deadline = Instant::now() + timeout;
        let mut events = Vec::new();

        while events.is_empty() {
            match self.done_rx.recv_deadline(deadline) {
                Ok(done) => self.deliver(done, &mut events),
                Err(_) => break,
            }
        }

        // Pick up anything else that finished meanwhile
        events.extend(self.poll());
        events
    }

    /// Block until no job is in flight or `timeout` passes; returns current results
    pub fn wait_idle(&self, timeout: Duration) -> Vec<LoadEvent> {
        let deadline = Instant::now() + timeout;
        let mut events = Vec::new();

        while !self.in_flight.is_empty() {
            match self.done_rx.recv_deadline(deadline) {
                Ok(done) => self.deliver(done, &mut events),
                Err(_) => break,
            }
        }

        events
    }

    fn spawn_decode(&self, path: UniversalPath) {
        let cache = Arc::clone(&self.cache);
        let source = Arc::clone(&self.source);
        let done_tx = self.done_tx.clone();
        let max_dimension = self.max_dimension;
        let epoch = cache.epoch(&path);

        self.pool.spawn(move || {
            let result = match source.decode(&path, max_dimension) {
                Ok(pixels) => {
                    let image = Arc::new(DecodedImage::new(path.clone(), pixels));
                    cache.insert_if_epoch(Arc::clone(&image), epoch);
                    Ok(image)
                }
                Err(e) => {
                    tracing::warn!("Failed to decode {}: {}", path, e);
                    Err(Arc::new(e))
                }
            };

            // Receiver gone means the dispatcher was dropped
            let _ = done_tx.send(Completed { path, epoch, result });
        });
    }

    fn deliver(&self, done: Completed, events: &mut Vec<LoadEvent>) {
        let key = done.path.key();
        let Some((_, waiters)) = self.in_flight.remove(key) else {
            return;
        };

        if done.epoch != self.cache.epoch(&done.path) {
            tracing::debug!("Decoded outdated file, decoding again: {}", done.path);
            // Nothing newer can be cached: later requests joined this job
            self.cache.invalidate(&done.path);
            self.in_flight.insert(key.to_string(), waiters);
            self.spawn_decode(done.path);
            return;
        }
        // Nothing for this key is in flight any more
        self.cache.settle(&done.path);

        for waiter in waiters {
            if !waiter.gate.is_current(waiter.request.load_id) {
                tracing::debug!(
                    load_id = waiter.request.load_id,
                    "Dropping stale result: {}",
                    waiter.request.path
                );
                continue;
            }
            events.push(LoadEvent {
                request: waiter.request,
                result: done.result.clone(),
            });
        }
    }
}
