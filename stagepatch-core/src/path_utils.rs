//! Cross-platform path utilities
//!
//! Descriptor locations always use forward slashes, but paths handed to us by a
//! build machine may use backslashes. These helpers normalize separators and
//! split paths into segments so markers are matched against whole directory
//! names rather than raw substrings.

use std::path::Path;

/// Normalize path to forward slashes
#[inline]
pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
}

/// Convert a Path to a normalized string
#[inline]
pub fn path_to_string(path: &Path) -> String {
    normalize_path(&path.to_string_lossy())
}

/// Split a path string into its segments.
///
/// Both separators are accepted. A leading separator yields an empty first
/// segment, so `/a/b` becomes `["", "a", "b"]` and a segment at index 0 is
/// never preceded by a separator.
pub fn path_segments(path: &str) -> Vec<&str> {
    path.split(['/', '\\']).collect()
}

/// Join the non-empty segments with forward slashes
pub fn join_segments(segments: &[&str]) -> String {
    segments
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("/")
}

/// Keep only alphanumeric characters (used for workspace names)
pub fn sanitize_name(name: &str) -> String {
    name.chars().filter(|c| c.is_alphanumeric()).collect()
}
