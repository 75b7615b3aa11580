//! File operations module
//! Provides delete (trash or permanent) and copy-name generation

use std::path::{Path, PathBuf};
use thiserror::Error;

/// File operation errors
#[derive(Debug, Error)]
pub enum FileOpError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Trash error: {0}")]
    #[cfg(feature = "trash-support")]
    Trash(#[from] trash::Error),

    #[error("File not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

pub type Result<T> = std::result::Result<T, FileOpError>;

/// File operations trait
pub trait FileOperations: Send + Sync {
    /// Delete files (move to trash or permanent delete)
    fn delete(&self, paths: &[PathBuf], use_trash: bool) -> Result<()>;
}

/// Default implementation of file operations
#[derive(Debug, Default)]
pub struct DefaultFileOperations;

impl DefaultFileOperations {
    pub fn new() -> Self {
        Self
    }
}

impl FileOperations for DefaultFileOperations {
    #[cfg(feature = "trash-support")]
    fn delete(&self, paths: &[PathBuf], use_trash: bool) -> Result<()> {
        for path in paths {
            if !path.exists() {
                return Err(FileOpError::NotFound(path.clone()));
            }

            if use_trash {
                trash::delete(path)?;
                tracing::info!("Moved to trash: {}", path.display());
            } else {
                remove_permanently(path)?;
            }
        }

        Ok(())
    }

    #[cfg(not(feature = "trash-support"))]
    fn delete(&self, paths: &[PathBuf], _use_trash: bool) -> Result<()> {
        // Fallback: always permanent delete
        for path in paths {
            if !path.exists() {
                return Err(FileOpError::NotFound(path.clone()));
            }
            remove_permanently(path)?;
        }

        Ok(())
    }
}

fn remove_permanently(path: &Path) -> Result<()> {
    if path.is_dir() {
        std::fs::remove_dir_all(path)?;
    } else {
        std::fs::remove_file(path)?;
    }
    tracing::warn!("Permanently deleted: {}", path.display());
    Ok(())
}

/// Next free `<stem>_copy<.ext>` sibling of `source`
///
/// Tries `name_copy.ext`, then `name_copy_1.ext`, `name_copy_2.ext`, ...
pub fn unique_copy_path(source: &Path) -> Result<PathBuf> {
    let folder = source
        .parent()
        .ok_or_else(|| FileOpError::InvalidOperation(format!("No parent folder: {}", source.display())))?;
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .ok_or_else(|| FileOpError::InvalidOperation(format!("No file name: {}", source.display())))?;
    let ext = source
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut candidate = folder.join(format!("{}_copy{}", stem, ext));
    let mut counter = 1;
    while candidate.exists() {
        candidate = folder.join(format!("{}_copy_{}{}", stem, counter, ext));
        counter += 1;
    }

    Ok(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_unique_copy_path() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("shot.jpg");
        fs::write(&source, b"x").unwrap();

        let first = unique_copy_path(&source).unwrap();
        assert_eq!(first, dir.path().join("shot_copy.jpg"));

        fs::write(&first, b"x").unwrap();
        let second = unique_copy_path(&source).unwrap();
        assert_eq!(second, dir.path().join("shot_copy_1.jpg"));

        fs::write(&second, b"x").unwrap();
        assert_eq!(unique_copy_path(&source).unwrap(), dir.path().join("shot_copy_2.jpg"));
    }

    #[test]
    fn test_permanent_delete() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("gone.png");
        fs::write(&file, b"x").unwrap();

        let ops = DefaultFileOperations::new();
        ops.delete(&[file.clone()], false).unwrap();
        assert!(!file.exists());
    }

    #[test]
    fn test_delete_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let ops = DefaultFileOperations::new();
        let result = ops.delete(&[dir.path().join("never.png")], false);
        assert!(matches!(result, Err(FileOpError::NotFound(_))));
    }
}
