//! Local course file source.

use super::{parse_course_document, CourseDocument};
use crate::error::{Result, SyllabusError};
use std::path::{Path, PathBuf};

/// Supported course document extensions.
const COURSE_EXTENSIONS: &[&str] = &["txt"];

/// Check if path is a supported course document.
pub fn is_course_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| COURSE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// List course documents in a directory, sorted by file name.
pub fn list_course_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Err(SyllabusError::InvalidInput(format!(
            "Directory not found: {}",
            dir.display()
        )));
    }

    if !dir.is_dir() {
        return Err(SyllabusError::InvalidInput(format!(
            "Not a directory: {}",
            dir.display()
        )));
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && is_course_file(p))
        .collect();

    files.sort();
    Ok(files)
}

/// Read and parse a course document from disk.
///
/// The file stem is used as the title when the document has no title header.
pub async fn load_course_file(path: &Path) -> Result<CourseDocument> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| SyllabusError::ingestion(path, e.to_string()))?;

    let fallback_title = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Untitled");

    parse_course_document(&text, fallback_title).map_err(|e| match e {
        SyllabusError::InvalidInput(reason) => SyllabusError::ingestion(path, reason),
        other => other,
    })
}
