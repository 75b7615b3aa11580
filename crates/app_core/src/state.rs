//! Application state management

use crate::config::AppConfig;
use crate::controller::{ControllerSettings, LibraryController};
use crate::decode_cache::DecodeCache;
use crate::error::AppError;
use crate::loader::{FileDecoder, ImageSource, LoadDispatcher};
use crate::sidecar::{JsonSidecar, MarkStore};
use app_fs::{DefaultFileOperations, FileOperations};
use parking_lot::RwLock;
use std::sync::Arc;

/// Long-lived services shared by every controller
pub struct AppState {
    /// Application configuration
    pub config: RwLock<AppConfig>,

    /// Decoded pixel cache
    pub cache: Arc<DecodeCache>,

    /// Background decoder
    pub dispatcher: Arc<LoadDispatcher>,

    /// Trash / permanent delete
    pub file_ops: Arc<dyn FileOperations>,

    /// Favorites and compare persistence
    pub marks: Arc<dyn MarkStore>,
}

impl AppState {
    /// Create a new application state
    pub fn new(config: AppConfig) -> Result<Self, AppError> {
        Self::with_source(config, Arc::new(FileDecoder))
    }

    /// Create a state decoding through `source` instead of the file system
    pub fn with_source(config: AppConfig, source: Arc<dyn ImageSource>) -> Result<Self, AppError> {
        let cache = Arc::new(DecodeCache::new(config.cache.capacity));
        let dispatcher = LoadDispatcher::with_source(
            Arc::clone(&cache),
            source,
            config.cache.worker_threads,
            config.viewer.max_dimension,
        )
        .map_err(|e| AppError::Init(e.to_string()))?;

        Ok(Self::from_parts(
            config,
            cache,
            Arc::new(dispatcher),
            Arc::new(DefaultFileOperations::new()),
            Arc::new(JsonSidecar::new()),
        ))
    }

    pub fn from_parts(
        config: AppConfig,
        cache: Arc<DecodeCache>,
        dispatcher: Arc<LoadDispatcher>,
        file_ops: Arc<dyn FileOperations>,
        marks: Arc<dyn MarkStore>,
    ) -> Self {
        Self {
            config: RwLock::new(config),
            cache,
            dispatcher,
            file_ops,
            marks,
        }
    }

    /// A controller configured from the current settings
    pub fn controller(&self) -> LibraryController {
        let settings = ControllerSettings::from(&*self.config.read());
        LibraryController::new(
            settings,
            Arc::clone(&self.dispatcher),
            Arc::clone(&self.file_ops),
            Arc::clone(&self.marks),
        )
    }

    /// Record folder, position and sort order for the next start
    pub fn remember_session(&self, controller: &LibraryController) {
        let mut config = self.config.write();
        config.general.last_directory = controller
            .library()
            .directory()
            .map(|d| d.to_path_buf());
        config.general.last_index = usize::try_from(controller.current_index()).unwrap_or(0);
        config.library.sort_by = controller.settings().sort_by;
        config.library.sort_order = controller.settings().sort_order;
    }

    /// Save the current configuration
    pub fn save_config(&self) -> anyhow::Result<()> {
        self.config.read().save()
    }
}
