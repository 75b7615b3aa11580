//! File system browser - directory listing restricted to image files

use crate::{FsError, Result, UniversalPath};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Extensions the viewer can decode (lowercase, without dot)
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif", "webp", "tiff", "tif"];

/// Check whether a path carries a supported image extension
pub fn is_image_path<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.as_str()))
        .unwrap_or(false)
}

/// Sort key for file listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortBy {
    #[default]
    #[serde(rename = "name")]
    Name,
    #[serde(rename = "modified")]
    Modified,
    #[serde(rename = "size")]
    Size,
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    #[serde(rename = "asc")]
    Ascending,
    #[serde(rename = "desc")]
    Descending,
}

/// One listed image with the metadata it sorts by
struct ImageEntry {
    path: UniversalPath,
    name: String,
    size: u64,
    /// Modification time in nanoseconds since the Unix epoch
    modified: Option<i128>,
}

impl ImageEntry {
    /// Stat `path`; `None` for directories, hidden files and other formats
    fn from_path(path: &Path) -> Result<Option<Self>> {
        let metadata = fs::metadata(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        if !metadata.is_file() || is_hidden_file(path, &name) || !is_image_path(path) {
            return Ok(None);
        }

        let modified = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_nanos() as i128);

        Ok(Some(Self {
            path: UniversalPath::new(path),
            name,
            size: metadata.len(),
            modified,
        }))
    }
}

/// List the supported images of a folder in display order
pub fn list_images<P: AsRef<Path>>(
    path: P,
    sort_by: SortBy,
    sort_order: SortOrder,
) -> Result<Vec<UniversalPath>> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(FsError::NotFound(path.display().to_string()));
    }

    if !path.is_dir() {
        return Err(FsError::InvalidPath(format!("Not a directory: {}", path.display())));
    }

    let mut entries = Vec::new();
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        match ImageEntry::from_path(&entry.path()) {
            Ok(Some(image)) => entries.push(image),
            Ok(None) => {}
            Err(_) => continue, // Vanished or unreadable between read_dir and stat
        }
    }

    sort_entries(&mut entries, sort_by, sort_order);
    tracing::debug!(count = entries.len(), "Listed images in {}", path.display());

    Ok(entries.into_iter().map(|e| e.path).collect())
}

fn sort_entries(entries: &mut [ImageEntry], sort_by: SortBy, order: SortOrder) {
    entries.sort_by(|a, b| {
        let by_name = || natural_sort_key(&a.name).cmp(&natural_sort_key(&b.name));
        let cmp = match sort_by {
            SortBy::Name => by_name(),
            SortBy::Size => a.size.cmp(&b.size).then_with(by_name),
            SortBy::Modified => a.modified.cmp(&b.modified).then_with(by_name),
        };

        match order {
            SortOrder::Ascending => cmp,
            SortOrder::Descending => cmp.reverse(),
        }
    });
}

/// Generate a natural sort key (handles numbers correctly)
/// "image2.jpg" < "image10.jpg"
pub fn natural_sort_key(s: &str) -> Vec<NaturalSortPart> {
    let mut parts = Vec::new();
    let mut current_num = String::new();
    let mut current_str = String::new();

    for c in s.chars() {
        if c.is_ascii_digit() {
            if !current_str.is_empty() {
                parts.push(NaturalSortPart::Str(current_str.to_lowercase()));
                current_str.clear();
            }
            current_num.push(c);
        } else {
            if !current_num.is_empty() {
                parts.push(NaturalSortPart::number(&current_num));
                current_num.clear();
            }
            current_str.push(c);
        }
    }

    if !current_num.is_empty() {
        parts.push(NaturalSortPart::number(&current_num));
    }
    if !current_str.is_empty() {
        parts.push(NaturalSortPart::Str(current_str.to_lowercase()));
    }

    parts
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum NaturalSortPart {
    Num(u64),
    Str(String),
}

impl NaturalSortPart {
    fn number(digits: &str) -> Self {
        // Runs too long for u64 still sort after every shorter number
        digits
            .parse::<u64>()
            .map(Self::Num)
            .unwrap_or_else(|_| Self::Num(u64::MAX))
    }
}

/// Check if a file is hidden
#[cfg(windows)]
fn is_hidden_file(path: &Path, _name: &str) -> bool {
    use std::os::windows::fs::MetadataExt;

    const FILE_ATTRIBUTE_HIDDEN: u32 = 0x2;

    fs::metadata(path)
        .map(|m| m.file_attributes() & FILE_ATTRIBUTE_HIDDEN != 0)
        .unwrap_or(false)
}

#[cfg(not(windows))]
fn is_hidden_file(_path: &Path, name: &str) -> bool {
    name.starts_with('.')
}
