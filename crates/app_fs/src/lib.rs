//! PhotoCuller File System Layer
//!
//! Provides a unified interface for file system operations, including:
//! - UniversalPath: normalized absolute paths with a stable lookup key
//! - Directory browsing restricted to supported image formats
//! - File operations (trash/permanent delete, unique copy names)

mod browser;
mod file_operations;
mod universal_path;

pub use browser::{
    is_image_path, list_images, natural_sort_key, NaturalSortPart, SortBy, SortOrder,
    IMAGE_EXTENSIONS,
};
pub use file_operations::{
    unique_copy_path, DefaultFileOperations, FileOpError, FileOperations,
};
pub use universal_path::UniversalPath;

use thiserror::Error;

/// File system errors
#[derive(Error, Debug)]
pub enum FsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

pub type Result<T> = std::result::Result<T, FsError>;
