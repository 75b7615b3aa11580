//! Timestamped error reports written for fatal failures

use chrono::Local;
use std::path::{Path, PathBuf};

/// Write `body` into a new `error_log_<timestamp>.txt` inside [`crate::report_dir`].
pub fn write_error_report(body: &str) -> std::io::Result<PathBuf> {
    write_report_to(&crate::report_dir(), body)
}

/// Write `body` into a new timestamped report file inside `dir`.
///
/// Reports created within the same second get a numeric suffix instead of
/// overwriting each other.
pub fn write_report_to(dir: &Path, body: &str) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;

    let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let mut path = dir.join(format!("error_log_{}.txt", stamp));
    let mut counter = 1;
    while path.exists() {
        path = dir.join(format!("error_log_{}_{}.txt", stamp, counter));
        counter += 1;
    }

    std::fs::write(&path, body)?;
    tracing::error!(report = %path.display(), "Error report written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_file_is_timestamped_and_unique() {
        let dir = tempfile::tempdir().unwrap();

        let first = write_report_to(dir.path(), "boom").unwrap();
        let second = write_report_to(dir.path(), "boom again").unwrap();

        assert_ne!(first, second);
        let name = first.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("error_log_"));
        assert!(name.ends_with(".txt"));
        assert_eq!(std::fs::read_to_string(&second).unwrap(), "boom again");
    }
}
