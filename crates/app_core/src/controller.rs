//! Library/view controller
//!
//! Owns the library state, the live viewer and the edit histories, and
//! funnels every list mutation through one rebuild step so the current
//! image, the filter and the mark sets stay consistent.

use crate::config::AppConfig;
use crate::error::{AppError, Result};
use crate::history::{EditSnapshot, HistoryStore};
use crate::library::{Filter, LibraryState, MarkSet, Notice};
use crate::loader::{LoadDispatcher, LoadEvent, LoadStatus};
use crate::sidecar::{MarkStore, MarkedSets};
use crate::transform::{CropSpec, SharpenParams};
use crate::viewer::{ViewTransform, ViewerState};
use app_fs::{list_images, unique_copy_path, FileOperations, SortBy, SortOrder, UniversalPath};
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Controller behavior taken from the configuration
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub loop_navigation: bool,
    pub prefetch_neighbors: bool,
    pub reset_zoom_on_new_image: bool,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
    pub use_recycle_bin: bool,
}

impl From<&AppConfig> for ControllerSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            loop_navigation: config.viewer.loop_navigation,
            prefetch_neighbors: config.viewer.prefetch_neighbors,
            reset_zoom_on_new_image: config.viewer.reset_zoom_on_new_image,
            sort_by: config.library.sort_by,
            sort_order: config.library.sort_order,
            use_recycle_bin: config.library.use_recycle_bin,
        }
    }
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

/// Where to start after opening a folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartAt {
    First,
    /// Clamped to the list length
    Index(usize),
    /// Falls back to the first image when absent
    Path(PathBuf),
}

/// How `save_current` writes the display pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveMode {
    /// Replace the file on disk
    Overwrite,
    /// Write a `_copy` sibling and add it to the list
    Copy,
}

pub struct LibraryController {
    settings: ControllerSettings,
    dispatcher: Arc<LoadDispatcher>,
    file_ops: Arc<dyn FileOperations>,
    marks: Arc<dyn MarkStore>,
    library: LibraryState,
    viewer: ViewerState,
    history: HistoryStore,
    /// Edit state of images navigated away from, by path key
    remembered: HashMap<String, EditSnapshot>,
    notices: Vec<Notice>,
}

impl LibraryController {
    pub fn new(
        settings: ControllerSettings,
        dispatcher: Arc<LoadDispatcher>,
        file_ops: Arc<dyn FileOperations>,
        marks: Arc<dyn MarkStore>,
    ) -> Self {
        Self {
            settings,
            dispatcher,
            file_ops,
            marks,
            library: LibraryState::new(),
            viewer: ViewerState::new(),
            history: HistoryStore::new(),
            remembered: HashMap::new(),
            notices: Vec::new(),
        }
    }

    // ===== Accessors =====

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    pub fn library(&self) -> &LibraryState {
        &self.library
    }

    pub fn viewer(&self) -> &ViewerState {
        &self.viewer
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn view_mut(&mut self) -> &mut ViewTransform {
        &mut self.viewer.view
    }

    pub fn current_path(&self) -> Option<&UniversalPath> {
        self.library.current_path()
    }

    pub fn current_index(&self) -> isize {
        self.library.current_index()
    }

    pub fn filter(&self) -> Filter {
        self.library.filter()
    }

    pub fn favorite_count(&self) -> usize {
        self.library.favorites().len()
    }

    pub fn compare_count(&self) -> usize {
        self.library.compare().len()
    }

    pub fn is_favorite(&self) -> bool {
        self.current_path()
            .is_some_and(|p| self.library.is_favorite(p))
    }

    pub fn is_in_compare(&self) -> bool {
        self.current_path()
            .is_some_and(|p| self.library.is_in_compare(p))
    }

    /// Notices raised since the last call
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Rendered frame of the current image
    pub fn display_pixels(&mut self) -> Option<Arc<RgbaImage>> {
        self.viewer.display_pixels()
    }

    // ===== Folder =====

    /// Open a folder; all histories and remembered edits are discarded
    pub fn open_directory(&mut self, dir: &Path, start: StartAt) -> Result<()> {
        let directory = UniversalPath::new(dir);
        tracing::info!("Opening folder: {}", directory);

        self.history.clear();
        self.remembered.clear();
        self.viewer.clear();

        let listing = match self.listing_of(&directory) {
            Ok(listing) => listing,
            Err(AppError::FileNotFound(_)) => {
                tracing::warn!("Folder does not exist: {}", directory);
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        let marks = self.marks.load_marked(&directory).unwrap_or_else(|e| {
            tracing::warn!("Ignoring unreadable sidecar in {}: {}", directory, e);
            MarkedSets::default()
        });

        let notice = self
            .library
            .reset(directory, listing, marks.favorites, marks.compare);
        self.notices.extend(notice);

        match start {
            StartAt::First => {}
            StartAt::Index(i) => {
                let last = self.library.len().saturating_sub(1);
                self.library.select_index(i.min(last));
            }
            StartAt::Path(p) => {
                self.library.select_path(&UniversalPath::new(p));
            }
        }

        tracing::info!(images = self.library.len(), "Folder opened");
        self.show_current();
        Ok(())
    }

    /// Re-read the folder, keeping the current image where possible
    pub fn refresh(&mut self) -> Result<()> {
        self.rebuild(None)
    }

    pub fn set_sort(&mut self, sort_by: SortBy, sort_order: SortOrder) -> Result<()> {
        self.settings.sort_by = sort_by;
        self.settings.sort_order = sort_order;
        self.rebuild(None)
    }

    pub fn set_filter(&mut self, filter: Filter) -> Result<()> {
        let previous = self.current_path().cloned();
        let listing = self.current_listing()?;
        let notice = self.library.set_filter(filter, listing);
        self.notices.extend(notice);
        self.follow_selection(previous.as_ref());
        Ok(())
    }

    // ===== Navigation =====

    pub fn next(&mut self) -> bool {
        self.step(1)
    }

    pub fn previous(&mut self) -> bool {
        self.step(-1)
    }

    pub fn first(&mut self) -> bool {
        let moved = self.library.first();
        if moved {
            self.show_current();
        }
        moved
    }

    pub fn last(&mut self) -> bool {
        let moved = self.library.last();
        if moved {
            self.show_current();
        }
        moved
    }

    pub fn go_to(&mut self, index: usize) -> bool {
        let moved = self.library.current_index() != index as isize && self.library.select_index(index);
        if moved {
            self.show_current();
        }
        moved
    }

    fn step(&mut self, delta: isize) -> bool {
        let moved = self.library.step(delta, self.settings.loop_navigation);
        if moved {
            self.show_current();
        }
        moved
    }

    // ===== Loading =====

    /// Apply finished loads; returns how many reached the viewer
    pub fn pump(&mut self) -> usize {
        let events = self.dispatcher.poll();
        self.apply_events(events)
    }

    /// Block until the current image has pixels or failed, or `timeout` passes
    pub fn wait_for_current(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        self.pump();

        while self.viewer.is_loading() {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let events = self.dispatcher.wait(deadline - now);
            self.apply_events(events);
        }
        true
    }

    fn apply_events(&mut self, events: Vec<LoadEvent>) -> usize {
        let mut applied = 0;
        for event in events {
            let request = &event.request;
            if self.viewer.path() != Some(&request.path) || !self.viewer.gate().is_current(request.load_id) {
                continue;
            }

            match event.result {
                Ok(image) => {
                    self.viewer.set_image(&image);
                    tracing::debug!("Displayed {}", request.path);
                }
                Err(e) => {
                    tracing::warn!("Cannot display {}: {}", request.path, e);
                    self.viewer.set_load_error(e.user_message());
                    self.notices.push(Notice::LoadFailed {
                        path: request.path.clone(),
                        message: e.user_message(),
                    });
                }
            }
            applied += 1;
        }
        applied
    }

    // ===== Marks =====

    pub fn toggle_favorite(&mut self) -> Result<bool> {
        self.toggle_mark(MarkSet::Favorites)
    }

    pub fn toggle_compare(&mut self) -> Result<bool> {
        self.toggle_mark(MarkSet::Compare)
    }

    pub fn clear_favorites(&mut self) -> Result<bool> {
        self.clear_mark_set(MarkSet::Favorites)
    }

    pub fn clear_compare(&mut self) -> Result<bool> {
        self.clear_mark_set(MarkSet::Compare)
    }

    fn toggle_mark(&mut self, set: MarkSet) -> Result<bool> {
        let path = self.current_path().cloned().ok_or(AppError::NoImage)?;
        if self.viewer.is_loading() {
            return Err(AppError::Loading(path.display()));
        }

        let on = self.library.toggle(set, &path);
        tracing::info!(marked = on, "{:?} toggled: {}", set, path);
        self.persist_marks();
        self.rebuild(None)?;
        Ok(on)
    }

    fn clear_mark_set(&mut self, set: MarkSet) -> Result<bool> {
        if !self.library.clear_marks(set) {
            self.notices.push(Notice::NothingToClear(set));
            return Ok(false);
        }

        tracing::info!("{:?} cleared", set);
        self.persist_marks();
        self.rebuild(None)?;
        Ok(true)
    }

    fn persist_marks(&self) {
        let Some(directory) = self.library.directory() else {
            return;
        };
        let marks = MarkedSets {
            favorites: self.library.favorites().clone(),
            compare: self.library.compare().clone(),
        };
        // In-memory sets stay authoritative and are written again on the next change
        if let Err(e) = self.marks.save_marked(directory, &marks) {
            tracing::warn!("Failed to save marks for {}: {}", directory, e);
        }
    }

    // ===== Edits =====

    pub fn rotate_clockwise(&mut self) -> Result<()> {
        self.viewer.rotate_clockwise(&mut self.history)
    }

    pub fn begin_brightness(&mut self) -> Result<()> {
        self.viewer.begin_brightness()
    }

    pub fn set_brightness(&mut self, factor: f32) -> Result<()> {
        self.viewer.set_brightness(factor)
    }

    pub fn end_brightness(&mut self) {
        self.viewer.end_brightness(&mut self.history);
    }

    pub fn apply_crop(&mut self, spec: &CropSpec, discard_pending: bool) -> Result<()> {
        self.viewer.apply_crop(spec, discard_pending, &mut self.history)
    }

    pub fn apply_sharpen(&mut self, params: &SharpenParams) -> Result<()> {
        self.viewer.apply_sharpen(params, &mut self.history)
    }

    /// `Some(true)` when a crop was undone and the view should re-fit
    pub fn undo(&mut self) -> Result<Option<bool>> {
        let restored = self.viewer.undo(&mut self.history)?;
        if restored == Some(true) {
            self.viewer.view.reset();
        }
        Ok(restored)
    }

    pub fn redo(&mut self) -> Result<Option<bool>> {
        let restored = self.viewer.redo(&mut self.history)?;
        if restored == Some(true) {
            self.viewer.view.reset();
        }
        Ok(restored)
    }

    // ===== File operations =====

    /// Delete the current image (trash or permanent, per settings)
    pub fn delete_current(&mut self) -> Result<UniversalPath> {
        let path = self.current_path().cloned().ok_or(AppError::NoImage)?;
        if !path.exists() {
            return Err(AppError::FileNotFound(path.display()));
        }

        self.file_ops
            .delete(&[path.to_path_buf()], self.settings.use_recycle_bin)?;
        tracing::info!("Deleted {}", path);

        if self.library.unmark_everywhere(&path) {
            self.persist_marks();
        }
        self.dispatcher.invalidate(&path);
        self.forget(&path);

        self.rebuild(None)?;
        Ok(path)
    }

    /// Write the display pixels; returns the written path
    pub fn save_current(&mut self, mode: SaveMode) -> Result<UniversalPath> {
        let path = self.current_path().cloned().ok_or(AppError::NoImage)?;
        let pixels = self
            .viewer
            .display_pixels()
            .ok_or_else(|| AppError::Loading(path.display()))?;
        if !path.exists() {
            return Err(AppError::FileNotFound(path.display()));
        }

        match mode {
            SaveMode::Overwrite => {
                if let Some(max) = self.dispatcher.max_dimension() {
                    let (width, height) = image::image_dimensions(path.as_path())?;
                    if width > max || height > max {
                        return Err(AppError::Downscaled(path.display()));
                    }
                }
                write_image(&pixels, path.as_path())?;
                tracing::info!("Saved over {}", path);

                self.dispatcher.invalidate(&path);
                self.forget(&path);
                self.show_current();
                Ok(path)
            }
            SaveMode::Copy => {
                let target = UniversalPath::new(unique_copy_path(path.as_path())?);
                write_image(&pixels, target.as_path())?;
                tracing::info!("Saved copy {}", target);

                if self.library.is_favorite(&path) {
                    self.library.mark(MarkSet::Favorites, &target);
                    self.persist_marks();
                }

                // The original goes back to its on-disk state
                self.forget(&path);
                self.rebuild(Some(&target))?;
                if self.viewer.path().is_none() {
                    self.show_current();
                }
                Ok(target)
            }
        }
    }

    /// Drop every trace of edits for `path`
    fn forget(&mut self, path: &UniversalPath) {
        self.history.clear_path(path);
        self.remembered.remove(path.key());
        if self.viewer.path() == Some(path) {
            self.viewer.clear();
        }
    }

    // ===== Reconciliation =====

    fn listing_of(&self, directory: &UniversalPath) -> Result<Vec<UniversalPath>> {
        Ok(list_images(directory.as_path(), self.settings.sort_by, self.settings.sort_order)?)
    }

    fn current_listing(&self) -> Result<Vec<UniversalPath>> {
        match self.library.directory() {
            Some(directory) => self.listing_of(directory),
            None => Ok(Vec::new()),
        }
    }

    /// Re-list the folder, re-filter, and restore the selection
    fn rebuild(&mut self, prefer: Option<&UniversalPath>) -> Result<()> {
        let previous = self.current_path().cloned();
        let listing = self.current_listing()?;
        let notice = self.library.reconcile(listing, prefer);
        self.notices.extend(notice);
        self.follow_selection(previous.as_ref());
        Ok(())
    }

    fn follow_selection(&mut self, previous: Option<&UniversalPath>) {
        if self.current_path() != previous || self.viewer.path() != self.current_path() {
            self.show_current();
        }
    }

    /// Put the current image on screen
    fn show_current(&mut self) {
        self.stash_viewer();

        let Some(path) = self.library.current_path().cloned() else {
            self.viewer.clear();
            return;
        };

        let reset_view = self.settings.reset_zoom_on_new_image;
        self.history.ensure(&path);

        if let Some(snapshot) = self.remembered.remove(path.key()) {
            self.viewer.restore(path, snapshot, reset_view);
        } else {
            self.viewer.begin_load(path.clone(), reset_view);
            match self.dispatcher.request(&path, self.viewer.gate()) {
                LoadStatus::Ready(image) => {
                    self.viewer.set_image(&image);
                }
                LoadStatus::Pending(load_id) => {
                    tracing::debug!(load_id, "Waiting for {}", path);
                }
            }
        }

        if self.settings.prefetch_neighbors {
            self.dispatcher.prefetch(self.library.neighbors());
        }
    }

    /// Keep the edit state of the image being left
    fn stash_viewer(&mut self) {
        self.viewer.end_brightness(&mut self.history);
        let Some(path) = self.viewer.path().cloned() else {
            return;
        };
        if let Some(snapshot) = self.viewer.snapshot() {
            if snapshot.modified || self.viewer.has_pending_adjustments() {
                self.remembered.insert(path.key().to_string(), snapshot);
            }
        }
    }
}

/// Encode `pixels` in the format implied by the extension
fn write_image(pixels: &RgbaImage, path: &Path) -> Result<()> {
    let format = ImageFormat::from_path(path)
        .map_err(|e| AppError::UnsupportedFormat(e.to_string()))?;

    let image = DynamicImage::ImageRgba8(pixels.clone());
    let result = match format {
        // No alpha channel in JPEG
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(image.to_rgb8()).save_with_format(path, format),
        _ => image.save_with_format(path, format),
    };

    result.map_err(|e| AppError::ImageEncode(format!("{}: {}", path.display(), e)))
}
