//! PhotoCuller core domain logic
//!
//! This crate contains:
//! - Configuration and error types
//! - Decoded image cache and background loading
//! - Non-destructive edits (rotation, brightness) and baked edits (crop, sharpen)
//! - Per-image undo/redo history
//! - Folder library with filters, favorites and compare marks
//! - The controller tying them together

pub mod config;
pub mod controller;
pub mod decode_cache;
pub mod error;
pub mod history;
pub mod library;
pub mod loader;
pub mod sidecar;
pub mod state;
pub mod transform;
pub mod viewer;

pub use config::{AppConfig, CacheConfig, GeneralConfig, LibraryConfig, ViewerConfig};
pub use controller::{ControllerSettings, LibraryController, SaveMode, StartAt};
pub use decode_cache::{CacheStats, DecodeCache, DecodedImage};
pub use error::{AppError, Result};
pub use history::{BrightnessGesture, EditHistory, EditSnapshot, HistoryStore, SnapshotOrigin};
pub use library::{Filter, LibraryState, MarkSet, Notice};
pub use loader::{
    decode_file, FileDecoder, ImageSource, LoadDispatcher, LoadEvent, LoadGate, LoadId,
    LoadRequest, LoadStatus,
};
pub use sidecar::{JsonSidecar, MarkStore, MarkedSets, SIDECAR_FILE_NAME};
pub use state::AppState;
pub use transform::{CropRect, CropSpec, SharpenParams};
pub use viewer::{ViewTransform, ViewerState};
