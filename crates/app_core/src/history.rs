//! Per-image undo/redo history of edit snapshots

use app_fs::UniversalPath;
use image::RgbaImage;
use std::collections::HashMap;
use std::sync::Arc;

/// Where a snapshot came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotOrigin {
    Crop,
    Other,
}

/// Immutable record of an image's edit state
#[derive(Debug, Clone)]
pub struct EditSnapshot {
    pub pixels: Arc<RgbaImage>,
    /// Degrees, normalized to [0, 360)
    pub rotation: f32,
    /// 1.0 is neutral
    pub brightness: f32,
    pub modified: bool,
    pub origin: SnapshotOrigin,
}

impl EditSnapshot {
    pub fn new(pixels: Arc<RgbaImage>, rotation: f32, brightness: f32, modified: bool) -> Self {
        Self {
            pixels,
            rotation: rotation.rem_euclid(360.0),
            brightness,
            modified,
            origin: SnapshotOrigin::Other,
        }
    }

    pub fn with_origin(mut self, origin: SnapshotOrigin) -> Self {
        self.origin = origin;
        self
    }

    /// Same visual state (pixels compared by identity, then by content)
    pub fn same_state(&self, other: &Self) -> bool {
        self.rotation == other.rotation
            && self.brightness == other.brightness
            && self.modified == other.modified
            && (Arc::ptr_eq(&self.pixels, &other.pixels) || *self.pixels == *other.pixels)
    }
}

/// Undo and redo stacks of one image, most recent last
#[derive(Debug, Default, Clone)]
pub struct EditHistory {
    undo: Vec<EditSnapshot>,
    redo: Vec<EditSnapshot>,
}

impl EditHistory {
    pub fn push(&mut self, snapshot: EditSnapshot) {
        self.undo.push(snapshot);
        self.redo.clear();
    }

    /// Pop the last undo entry, parking `current` on the redo stack
    ///
    /// The parked entry inherits the popped origin so a redo of an undone
    /// crop still reports itself as a crop.
    pub fn undo(&mut self, current: EditSnapshot) -> Option<EditSnapshot> {
        let previous = self.undo.pop()?;
        self.redo.push(current.with_origin(previous.origin));
        Some(previous)
    }

    /// Pop the last redo entry, parking `current` on the undo stack
    pub fn redo(&mut self, current: EditSnapshot) -> Option<EditSnapshot> {
        let next = self.redo.pop()?;
        self.undo.push(current.with_origin(next.origin));
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }
}

/// Histories of every image touched since the folder was opened
#[derive(Debug, Default)]
pub struct HistoryStore {
    histories: HashMap<String, EditHistory>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the history for `path` if it does not exist yet
    pub fn ensure(&mut self, path: &UniversalPath) -> &mut EditHistory {
        self.histories.entry(path.key().to_string()).or_default()
    }

    pub fn get(&self, path: &UniversalPath) -> Option<&EditHistory> {
        self.histories.get(path.key())
    }

    /// Record the state before an edit; clears the redo stack
    pub fn push(&mut self, path: &UniversalPath, snapshot: EditSnapshot) {
        self.ensure(path).push(snapshot);
    }

    pub fn undo(&mut self, path: &UniversalPath, current: EditSnapshot) -> Option<EditSnapshot> {
        self.histories.get_mut(path.key())?.undo(current)
    }

    pub fn redo(&mut self, path: &UniversalPath, current: EditSnapshot) -> Option<EditSnapshot> {
        self.histories.get_mut(path.key())?.redo(current)
    }

    pub fn can_undo(&self, path: &UniversalPath) -> bool {
        self.get(path).is_some_and(EditHistory::can_undo)
    }

    pub fn can_redo(&self, path: &UniversalPath) -> bool {
        self.get(path).is_some_and(EditHistory::can_redo)
    }

    /// Forget the history of one image (after overwrite or delete)
    pub fn clear_path(&mut self, path: &UniversalPath) {
        if self.histories.remove(path.key()).is_some() {
            tracing::debug!("History cleared: {}", path);
        }
    }

    /// Forget everything (folder change)
    pub fn clear(&mut self) {
        self.histories.clear();
    }

    pub fn len(&self) -> usize {
        self.histories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histories.is_empty()
    }
}

/// Tracks one brightness drag gesture
///
/// The state before the first tick is captured at `begin` and pushed once
/// at `end`, and only if the value actually moved.
#[derive(Debug, Default)]
pub struct BrightnessGesture {
    start: Option<EditSnapshot>,
}

impl BrightnessGesture {
    pub fn begin(&mut self, before: EditSnapshot) {
        if self.start.is_none() {
            self.start = Some(before);
        }
    }

    pub fn is_active(&self) -> bool {
        self.start.is_some()
    }

    /// Finish the gesture; returns the snapshot to push, if any
    pub fn end(&mut self, final_brightness: f32) -> Option<EditSnapshot> {
        let start = self.start.take()?;
        (start.brightness != final_brightness).then_some(start)
    }

    /// Drop an unfinished gesture without recording it
    pub fn abandon(&mut self) {
        self.start = None;
    }
}
