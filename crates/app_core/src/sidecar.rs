//! Per-folder favorites/compare persistence (`Favorites.json`)

use crate::error::Result;
use app_fs::{natural_sort_key, UniversalPath};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

/// File name of the sidecar inside the image folder
pub const SIDECAR_FILE_NAME: &str = "Favorites.json";

/// Favorites and compare membership of one folder
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkedSets {
    pub favorites: HashSet<UniversalPath>,
    pub compare: HashSet<UniversalPath>,
}

/// Persistence of the mark sets, keyed by folder
pub trait MarkStore: Send + Sync {
    fn load_marked(&self, directory: &UniversalPath) -> Result<MarkedSets>;
    fn save_marked(&self, directory: &UniversalPath, marks: &MarkedSets) -> Result<()>;
}

#[derive(Debug, Serialize, Deserialize)]
struct SidecarFile {
    directory: PathBuf,
    #[serde(default)]
    favorites: Vec<MarkEntry>,
    #[serde(default)]
    compare: Vec<MarkEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct MarkEntry {
    filename: String,
    full_path: PathBuf,
    /// Seconds since the Unix epoch
    modification_date: f64,
    starred_at: Option<f64>,
}

/// JSON sidecar stored next to the images
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSidecar;

impl JsonSidecar {
    pub fn new() -> Self {
        Self
    }

    pub fn sidecar_path(directory: &UniversalPath) -> PathBuf {
        directory.as_path().join(SIDECAR_FILE_NAME)
    }
}

impl MarkStore for JsonSidecar {
    fn load_marked(&self, directory: &UniversalPath) -> Result<MarkedSets> {
        let path = Self::sidecar_path(directory);
        if !path.exists() {
            return Ok(MarkedSets::default());
        }

        let content = std::fs::read_to_string(&path)?;
        let file: SidecarFile = serde_json::from_str(&content)?;

        // A sidecar copied along with a folder describes the old location
        if UniversalPath::new(&file.directory) != *directory {
            tracing::warn!(
                "Ignoring sidecar written for {}: {}",
                file.directory.display(),
                path.display()
            );
            return Ok(MarkedSets::default());
        }

        let collect = |entries: Vec<MarkEntry>| {
            entries
                .into_iter()
                .map(|e| UniversalPath::new(e.full_path))
                .collect::<HashSet<_>>()
        };

        let marks = MarkedSets {
            favorites: collect(file.favorites),
            compare: collect(file.compare),
        };
        tracing::debug!(
            favorites = marks.favorites.len(),
            compare = marks.compare.len(),
            "Loaded sidecar {}",
            path.display()
        );
        Ok(marks)
    }

    fn save_marked(&self, directory: &UniversalPath, marks: &MarkedSets) -> Result<()> {
        let file = SidecarFile {
            directory: directory.to_path_buf(),
            favorites: entries_for(&marks.favorites),
            compare: entries_for(&marks.compare),
        };

        let path = Self::sidecar_path(directory);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(&file)?)?;
        std::fs::rename(&tmp, &path)?;

        tracing::debug!("Saved sidecar {}", path.display());
        Ok(())
    }
}

/// Entries for files that still exist, in name order
fn entries_for(set: &HashSet<UniversalPath>) -> Vec<MarkEntry> {
    let mut entries: Vec<MarkEntry> = set
        .iter()
        .filter_map(|path| {
            let modified = std::fs::metadata(path.as_path()).ok()?.modified().ok()?;
            Some(MarkEntry {
                filename: path.file_name().unwrap_or_default().to_string(),
                full_path: path.to_path_buf(),
                modification_date: seconds_since_epoch(modified),
                starred_at: None,
            })
        })
        .collect();

    entries.sort_by(|a, b| natural_sort_key(&a.filename).cmp(&natural_sort_key(&b.filename)));
    entries
}

fn seconds_since_epoch(time: std::time::SystemTime) -> f64 {
    time.duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
