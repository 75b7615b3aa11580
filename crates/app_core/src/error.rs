//! Application error types

use thiserror::Error;

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    // ===== Recoverable Errors (notify user, continue) =====
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Image decode error: {0}")]
    ImageDecode(String),

    #[error("Image encode error: {0}")]
    ImageEncode(String),

    #[error("Invalid edit: {0}")]
    InvalidEdit(String),

    #[error("No image selected")]
    NoImage,

    #[error("Image is still loading: {0}")]
    Loading(String),

    #[error("Image was loaded at reduced size: {0}")]
    Downscaled(String),

    #[error("Sidecar error: {0}")]
    Sidecar(String),

    // ===== Fatal Errors (application termination) =====
    #[error("Worker pool error: {0}")]
    WorkerPool(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Initialization failed: {0}")]
    Init(String),
}

impl AppError {
    /// Is this error recoverable?
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::Io(_)
                | AppError::FileNotFound(_)
                | AppError::UnsupportedFormat(_)
                | AppError::ImageDecode(_)
                | AppError::ImageEncode(_)
                | AppError::InvalidEdit(_)
                | AppError::NoImage
                | AppError::Loading(_)
                | AppError::Downscaled(_)
                | AppError::Sidecar(_)
        )
    }

    /// Is this a fatal error?
    pub fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Get a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            AppError::FileNotFound(path) => format!("The file no longer exists: {}", path),
            AppError::UnsupportedFormat(ext) => format!("Unsupported format: {}", ext),
            AppError::ImageDecode(msg) => format!("Cannot load image: {}", msg),
            AppError::ImageEncode(msg) => format!("Cannot save image: {}", msg),
            AppError::NoImage => "There is no image to work on.".to_string(),
            AppError::Loading(_) => "Please wait until the image has loaded.".to_string(),
            AppError::Downscaled(path) => format!(
                "{} was loaded at reduced size; save a copy instead of overwriting it",
                path
            ),
            _ => self.to_string(),
        }
    }
}

impl From<app_fs::FsError> for AppError {
    fn from(e: app_fs::FsError) -> Self {
        match e {
            app_fs::FsError::NotFound(p) => AppError::FileNotFound(p),
            app_fs::FsError::Io(io) => AppError::Io(io),
            other => AppError::Io(std::io::Error::new(std::io::ErrorKind::Other, other.to_string())),
        }
    }
}

impl From<app_fs::FileOpError> for AppError {
    fn from(e: app_fs::FileOpError) -> Self {
        match e {
            app_fs::FileOpError::NotFound(p) => AppError::FileNotFound(p.display().to_string()),
            app_fs::FileOpError::Io(io) => AppError::Io(io),
            other => AppError::Io(std::io::Error::new(std::io::ErrorKind::Other, other.to_string())),
        }
    }
}

impl From<image::ImageError> for AppError {
    fn from(e: image::ImageError) -> Self {
        match e {
            image::ImageError::Unsupported(u) => AppError::UnsupportedFormat(u.to_string()),
            image::ImageError::IoError(io) => AppError::Io(io),
            other => AppError::ImageDecode(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Sidecar(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(AppError::ImageDecode("bad".into()).is_recoverable());
        assert!(AppError::FileNotFound("x".into()).is_recoverable());
        assert!(AppError::WorkerPool("spawn".into()).is_fatal());
        assert!(AppError::Init("boom".into()).is_fatal());
    }

    #[test]
    fn test_fs_not_found_maps_to_file_not_found() {
        let err: AppError = app_fs::FileOpError::NotFound("/tmp/a.png".into()).into();
        assert!(matches!(err, AppError::FileNotFound(_)));
        assert!(err.user_message().contains("a.png"));
    }
}
