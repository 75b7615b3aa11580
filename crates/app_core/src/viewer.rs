//! Live edit state of the displayed image

use crate::decode_cache::DecodedImage;
use crate::error::{AppError, Result};
use crate::history::{BrightnessGesture, EditSnapshot, HistoryStore, SnapshotOrigin};
use crate::loader::LoadGate;
use crate::transform::{self, CropSpec, SharpenParams, NEUTRAL_BRIGHTNESS};
use app_fs::UniversalPath;
use image::RgbaImage;
use std::sync::Arc;

/// Brightness slider range
pub const MIN_BRIGHTNESS: f32 = 0.5;
pub const MAX_BRIGHTNESS: f32 = 1.5;

const MIN_ZOOM: f32 = 0.1;
const MAX_ZOOM: f32 = 10.0;
const ZOOM_STEP: f32 = 1.2;

/// Zoom and pan; never resamples pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub zoom: f32,
    pub pan: (f32, f32),
    /// Fit the image to the viewport on every repaint
    pub auto_fit: bool,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan: (0.0, 0.0),
            auto_fit: true,
        }
    }
}

impl ViewTransform {
    pub fn set_zoom(&mut self, level: f32) {
        self.zoom = level.clamp(MIN_ZOOM, MAX_ZOOM);
        self.auto_fit = false;
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.zoom * ZOOM_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.zoom / ZOOM_STEP);
    }

    /// Back to fit-to-window
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// The image on screen and its non-destructive parameters
#[derive(Debug)]
pub struct ViewerState {
    path: Option<UniversalPath>,
    original: Option<Arc<RgbaImage>>,
    rotation: f32,
    brightness: f32,
    modified: bool,
    load_error: Option<String>,
    gate: LoadGate,
    gesture: BrightnessGesture,
    /// Memoized render of `original` under the current parameters
    display: Option<Arc<RgbaImage>>,
    pub view: ViewTransform,
}

impl Default for ViewerState {
    fn default() -> Self {
        Self {
            path: None,
            original: None,
            rotation: 0.0,
            brightness: NEUTRAL_BRIGHTNESS,
            modified: false,
            load_error: None,
            gate: LoadGate::new(),
            gesture: BrightnessGesture::default(),
            display: None,
            view: ViewTransform::default(),
        }
    }
}

impl ViewerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gate(&self) -> &LoadGate {
        &self.gate
    }

    pub fn path(&self) -> Option<&UniversalPath> {
        self.path.as_ref()
    }

    pub fn original(&self) -> Option<&Arc<RgbaImage>> {
        self.original.as_ref()
    }

    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    pub fn brightness(&self) -> f32 {
        self.brightness
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn is_loaded(&self) -> bool {
        self.original.is_some()
    }

    /// A path is selected but its pixels have not arrived yet
    pub fn is_loading(&self) -> bool {
        self.path.is_some() && self.original.is_none() && self.load_error.is_none()
    }

    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    /// Rotation or brightness differ from neutral
    pub fn has_pending_adjustments(&self) -> bool {
        self.rotation != 0.0 || self.brightness != NEUTRAL_BRIGHTNESS
    }

    /// Select `path` and wait for its pixels
    pub fn begin_load(&mut self, path: UniversalPath, reset_view: bool) {
        self.path = Some(path);
        self.original = None;
        self.rotation = 0.0;
        self.brightness = NEUTRAL_BRIGHTNESS;
        self.modified = false;
        self.load_error = None;
        self.gesture.abandon();
        self.display = None;
        if reset_view {
            self.view.reset();
        }
    }

    /// Install decoded pixels if they belong to the selected path
    pub fn set_image(&mut self, image: &DecodedImage) -> bool {
        if self.path.as_ref() != Some(&image.path) {
            return false;
        }
        self.original = Some(Arc::clone(&image.pixels));
        self.load_error = None;
        self.display = None;
        true
    }

    pub fn set_load_error(&mut self, message: String) {
        self.original = None;
        self.load_error = Some(message);
        self.display = None;
    }

    /// Select `path` with a previously captured edit state
    pub fn restore(&mut self, path: UniversalPath, snapshot: EditSnapshot, reset_view: bool) {
        self.gate.cancel();
        self.path = Some(path);
        self.load_error = None;
        self.gesture.abandon();
        self.apply_snapshot(snapshot);
        if reset_view {
            self.view.reset();
        }
    }

    /// Show nothing
    pub fn clear(&mut self) {
        self.gate.cancel();
        self.path = None;
        self.original = None;
        self.rotation = 0.0;
        self.brightness = NEUTRAL_BRIGHTNESS;
        self.modified = false;
        self.load_error = None;
        self.gesture.abandon();
        self.display = None;
    }

    /// Capture the current state
    pub fn snapshot(&self) -> Option<EditSnapshot> {
        let pixels = self.original.as_ref()?;
        Some(EditSnapshot::new(
            Arc::clone(pixels),
            self.rotation,
            self.brightness,
            self.modified,
        ))
    }

    /// Rendered frame, recomputed only after the original or parameters change
    pub fn display_pixels(&mut self) -> Option<Arc<RgbaImage>> {
        if self.display.is_none() {
            let original = self.original.as_ref()?;
            self.display = Some(transform::render(original, self.rotation, self.brightness));
        }
        self.display.clone()
    }

    pub fn rotate_clockwise(&mut self, history: &mut HistoryStore) -> Result<()> {
        let (path, before) = self.editable()?;
        history.push(&path, before);

        self.rotation = (self.rotation + 90.0).rem_euclid(360.0);
        self.modified = true;
        self.display = None;
        tracing::debug!(rotation = self.rotation, "Rotated {}", path);
        Ok(())
    }

    /// Start a slider drag; the pre-drag state is recorded when it ends
    pub fn begin_brightness(&mut self) -> Result<()> {
        let (_, before) = self.editable()?;
        self.gesture.begin(before);
        Ok(())
    }

    /// One slider tick; clamped to the slider range
    pub fn set_brightness(&mut self, factor: f32) -> Result<()> {
        if !self.gesture.is_active() {
            self.begin_brightness()?;
        }

        let factor = factor.clamp(MIN_BRIGHTNESS, MAX_BRIGHTNESS);
        if factor != self.brightness {
            self.brightness = factor;
            self.modified = true;
            self.display = None;
        }
        Ok(())
    }

    /// Finish the drag; pushes one snapshot if the value changed
    pub fn end_brightness(&mut self, history: &mut HistoryStore) {
        let Some(path) = self.path.clone() else {
            self.gesture.abandon();
            return;
        };
        if let Some(before) = self.gesture.end(self.brightness) {
            history.push(&path, before);
        }
    }

    /// Bake a crop into a new original
    ///
    /// Pending rotation/brightness must be explicitly discarded first.
    pub fn apply_crop(
        &mut self,
        spec: &CropSpec,
        discard_pending: bool,
        history: &mut HistoryStore,
    ) -> Result<()> {
        self.end_brightness(history);
        if self.has_pending_adjustments() && !discard_pending {
            return Err(AppError::InvalidEdit(
                "Rotation or brightness is pending; discard it before cropping".into(),
            ));
        }

        let (path, before) = self.editable()?;
        let original = Arc::clone(&before.pixels);
        let cropped = transform::crop(&original, spec)?;

        history.push(&path, before.with_origin(SnapshotOrigin::Crop));
        self.bake(cropped);
        tracing::info!("Cropped {} to {}x{}", path, self.width(), self.height());
        Ok(())
    }

    /// Bake rotation, brightness and an unsharp mask into a new original
    pub fn apply_sharpen(&mut self, params: &SharpenParams, history: &mut HistoryStore) -> Result<()> {
        self.end_brightness(history);
        let (path, before) = self.editable()?;
        let rendered = transform::render(&before.pixels, self.rotation, self.brightness);
        let sharpened = transform::sharpen(&rendered, params)?;

        history.push(&path, before);
        self.bake(sharpened);
        tracing::info!(radius = params.radius, amount = params.amount, "Sharpened {}", path);
        Ok(())
    }

    /// Restore the previous snapshot; `Some(true)` when it undid a crop
    pub fn undo(&mut self, history: &mut HistoryStore) -> Result<Option<bool>> {
        self.end_brightness(history);
        let (path, current) = self.editable()?;
        Ok(history.undo(&path, current).map(|previous| {
            let from_crop = previous.origin == SnapshotOrigin::Crop;
            self.apply_snapshot(previous);
            from_crop
        }))
    }

    /// Re-apply the next snapshot; `Some(true)` when it redid a crop
    pub fn redo(&mut self, history: &mut HistoryStore) -> Result<Option<bool>> {
        self.end_brightness(history);
        let (path, current) = self.editable()?;
        Ok(history.redo(&path, current).map(|next| {
            let from_crop = next.origin == SnapshotOrigin::Crop;
            self.apply_snapshot(next);
            from_crop
        }))
    }

    fn width(&self) -> u32 {
        self.original.as_ref().map(|p| p.width()).unwrap_or(0)
    }

    fn height(&self) -> u32 {
        self.original.as_ref().map(|p| p.height()).unwrap_or(0)
    }

    fn editable(&self) -> Result<(UniversalPath, EditSnapshot)> {
        let path = self.path.clone().ok_or(AppError::NoImage)?;
        match self.snapshot() {
            Some(snapshot) => Ok((path, snapshot)),
            None => Err(AppError::Loading(path.display())),
        }
    }

    fn bake(&mut self, pixels: RgbaImage) {
        self.original = Some(Arc::new(pixels));
        self.rotation = 0.0;
        self.brightness = NEUTRAL_BRIGHTNESS;
        self.modified = true;
        self.display = None;
    }

    fn apply_snapshot(&mut self, snapshot: EditSnapshot) {
        self.original = Some(snapshot.pixels);
        self.rotation = snapshot.rotation;
        self.brightness = snapshot.brightness;
        self.modified = snapshot.modified;
        self.display = None;
    }
}
