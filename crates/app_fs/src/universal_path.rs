//! UniversalPath - normalized absolute paths used as lookup keys

use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use std::path::{Component, Path, PathBuf};

/// A path wrapper that yields one stable key per file
///
/// - Relative paths are resolved against the working directory
/// - `.` and `..` components are resolved lexically (the file need not exist)
/// - The lookup key is case-folded on case-insensitive platforms
///
/// Equality and hashing use the key, so `photo.JPG` and `photo.jpg` are the
/// same entry on Windows and macOS.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "PathBuf", into = "PathBuf")]
pub struct UniversalPath {
    /// Absolute path for file system operations
    raw: PathBuf,

    /// Normalized lookup key
    key: String,
}

impl UniversalPath {
    /// Create a new UniversalPath from any path-like type
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let raw = Self::normalize_path(path.as_ref());
        let key = Self::fold_case(raw.to_string_lossy().into_owned());
        Self { raw, key }
    }

    /// Get the absolute path for file system operations
    pub fn as_path(&self) -> &Path {
        &self.raw
    }

    /// Get the absolute path (owned)
    pub fn to_path_buf(&self) -> PathBuf {
        self.raw.clone()
    }

    /// Normalized key used by caches, histories and mark sets
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Lossy UTF-8 display string
    pub fn display(&self) -> String {
        self.raw.to_string_lossy().into_owned()
    }

    /// Get parent directory
    pub fn parent(&self) -> Option<Self> {
        self.raw.parent().map(Self::new)
    }

    /// Get file name
    pub fn file_name(&self) -> Option<&str> {
        self.raw.file_name()?.to_str()
    }

    /// Get file name without extension
    pub fn file_stem(&self) -> Option<&str> {
        self.raw.file_stem()?.to_str()
    }

    /// Get file extension
    pub fn extension(&self) -> Option<&str> {
        self.raw.extension()?.to_str()
    }

    /// Check if path exists
    pub fn exists(&self) -> bool {
        self.raw.exists()
    }

    /// Check if path is a directory
    pub fn is_dir(&self) -> bool {
        self.raw.is_dir()
    }

    /// Check if path is a file
    pub fn is_file(&self) -> bool {
        self.raw.is_file()
    }

    /// Join with another path component
    pub fn join<P: AsRef<Path>>(&self, path: P) -> Self {
        Self::new(self.raw.join(path))
    }

    fn normalize_path(path: &Path) -> PathBuf {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir().unwrap_or_default().join(path)
        };

        let mut normalized = PathBuf::new();
        for component in absolute.components() {
            match component {
                Component::ParentDir => {
                    normalized.pop();
                }
                Component::CurDir => {}
                _ => normalized.push(component),
            }
        }
        normalized
    }

    #[cfg(any(windows, target_os = "macos"))]
    fn fold_case(key: String) -> String {
        key.to_lowercase()
    }

    #[cfg(not(any(windows, target_os = "macos")))]
    fn fold_case(key: String) -> String {
        key
    }
}

impl PartialEq for UniversalPath {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for UniversalPath {}

impl Hash for UniversalPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl AsRef<Path> for UniversalPath {
    fn as_ref(&self) -> &Path {
        &self.raw
    }
}

impl From<PathBuf> for UniversalPath {
    fn from(path: PathBuf) -> Self {
        Self::new(path)
    }
}

impl From<&Path> for UniversalPath {
    fn from(path: &Path) -> Self {
        Self::new(path)
    }
}

impl From<&str> for UniversalPath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<UniversalPath> for PathBuf {
    fn from(path: UniversalPath) -> Self {
        path.raw
    }
}

impl std::fmt::Display for UniversalPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw.display())
    }
}
