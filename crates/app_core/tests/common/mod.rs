//! Shared fixtures for the integration tests

#![allow(dead_code)]

use app_core::{
    decode_file, AppConfig, AppState, DecodeCache, ImageSource, JsonSidecar, LibraryController,
    LoadDispatcher, MarkStore, MarkedSets, Result, StartAt,
};
use app_fs::{DefaultFileOperations, UniversalPath};
use crossbeam_channel::{Receiver, Sender};
use image::{Rgba, RgbaImage};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const TIMEOUT: Duration = Duration::from_secs(10);

/// Decodes from disk, but holds selected paths until released
#[derive(Default)]
pub struct HeldSource {
    held: Mutex<HashMap<String, Receiver<()>>>,
    decodes: AtomicUsize,
}

impl HeldSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Hold back the next decode of `path` after it has read the file;
    /// dropping or sending on the handle releases it
    pub fn hold(&self, path: &UniversalPath) -> Sender<()> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        self.held.lock().insert(path.key().to_string(), rx);
        tx
    }

    pub fn decodes(&self) -> usize {
        self.decodes.load(Ordering::SeqCst)
    }

    /// Block until at least `count` decodes have read their file
    pub fn wait_for_decodes(&self, count: usize) {
        let deadline = std::time::Instant::now() + TIMEOUT;
        while self.decodes() < count {
            assert!(std::time::Instant::now() < deadline, "decode never started");
            std::thread::sleep(Duration::from_millis(5));
        }
    }
}

impl ImageSource for HeldSource {
    fn decode(&self, path: &UniversalPath, max_dimension: Option<u32>) -> Result<RgbaImage> {
        let gate = self.held.lock().remove(path.key());
        let result = decode_file(path.as_path(), max_dimension);
        self.decodes.fetch_add(1, Ordering::SeqCst);
        if let Some(rx) = gate {
            let _ = rx.recv_timeout(TIMEOUT);
        }
        result
    }
}

/// Sidecar store that counts writes
#[derive(Default)]
pub struct CountingMarks {
    inner: JsonSidecar,
    saves: AtomicUsize,
}

impl CountingMarks {
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl MarkStore for CountingMarks {
    fn load_marked(&self, directory: &UniversalPath) -> Result<MarkedSets> {
        self.inner.load_marked(directory)
    }

    fn save_marked(&self, directory: &UniversalPath, marks: &MarkedSets) -> Result<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.inner.save_marked(directory, marks)
    }
}

pub struct Fixture {
    pub dir: tempfile::TempDir,
    pub state: AppState,
    pub source: Arc<HeldSource>,
    pub marks: Arc<CountingMarks>,
}

impl Fixture {
    /// A folder of solid-color PNGs; the first channel encodes the position
    pub fn new(names: &[&str]) -> Self {
        Self::with_config(names, test_config())
    }

    pub fn with_config(names: &[&str], config: AppConfig) -> Self {
        let dir = tempfile::tempdir().unwrap();
        for (i, name) in names.iter().enumerate() {
            write_png(dir.path(), name, Rgba([(i as u8 + 1) * 10, 100, 150, 255]), 4, 2);
        }

        let source = HeldSource::new();
        let marks = Arc::new(CountingMarks::default());
        let cache = Arc::new(DecodeCache::new(config.cache.capacity));
        let dispatcher = LoadDispatcher::with_source(
            Arc::clone(&cache),
            source.clone(),
            config.cache.worker_threads,
            config.viewer.max_dimension,
        )
        .unwrap();

        let state = AppState::from_parts(
            config,
            cache,
            Arc::new(dispatcher),
            Arc::new(DefaultFileOperations::new()),
            marks.clone(),
        );

        Self {
            dir,
            state,
            source,
            marks,
        }
    }

    pub fn path(&self, name: &str) -> UniversalPath {
        UniversalPath::new(self.dir.path().join(name))
    }

    /// Controller with the folder open at the first image, loaded
    pub fn open(&self) -> LibraryController {
        let mut controller = self.state.controller();
        controller
            .open_directory(self.dir.path(), StartAt::First)
            .unwrap();
        assert!(controller.wait_for_current(TIMEOUT));
        controller
    }
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.cache.worker_threads = 2;
    config.library.use_recycle_bin = false;
    config.viewer.prefetch_neighbors = false;
    config
}

pub fn write_png(dir: &Path, name: &str, color: Rgba<u8>, width: u32, height: u32) {
    RgbaImage::from_pixel(width, height, color)
        .save(dir.join(name))
        .unwrap();
}

/// Current image name as shown by the controller
pub fn current_name(controller: &LibraryController) -> Option<String> {
    controller
        .current_path()
        .and_then(|p| p.file_name().map(|n| n.to_string()))
}

pub fn names(controller: &LibraryController) -> Vec<String> {
    controller
        .library()
        .image_files()
        .iter()
        .filter_map(|p| p.file_name().map(|n| n.to_string()))
        .collect()
}
