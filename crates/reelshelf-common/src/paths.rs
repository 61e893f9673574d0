//! Path utilities for filtering the watched directory by extension.
//!
//! Extensions are stored lowercase and without the leading dot. Matching is
//! case-insensitive on the file side.

use std::collections::BTreeSet;
use std::path::Path;

/// Container extensions catalogued when no explicit set is configured.
const DEFAULT_VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "avi", "mov", "webm"];

/// Get the default set of video file extensions.
///
/// # Examples
///
/// ```
/// use reelshelf_common::paths::default_video_extensions;
///
/// let extensions = default_video_extensions();
/// assert!(extensions.contains("mkv"));
/// assert!(extensions.contains("mp4"));
/// ```
#[must_use]
pub fn default_video_extensions() -> BTreeSet<String> {
    DEFAULT_VIDEO_EXTENSIONS
        .iter()
        .map(|ext| (*ext).to_string())
        .collect()
}

/// Normalize a configured extension: trim, drop a leading dot, lowercase.
///
/// Returns `None` for blank input.
pub fn normalize_extension(ext: &str) -> Option<String> {
    let ext = ext.trim().trim_start_matches('.');
    if ext.is_empty() {
        None
    } else {
        Some(ext.to_lowercase())
    }
}

/// Check if a path's extension is in the allowed set.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use reelshelf_common::paths::{default_video_extensions, has_allowed_extension};
///
/// let allowed = default_video_extensions();
/// assert!(has_allowed_extension(Path::new("movie.MKV"), &allowed));
/// assert!(!has_allowed_extension(Path::new("subtitle.srt"), &allowed));
/// ```
pub fn has_allowed_extension(path: &Path, allowed: &BTreeSet<String>) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| allowed.contains(&ext.to_lowercase()))
        .unwrap_or(false)
}
