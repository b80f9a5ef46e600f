//! File system utility functions.
//!
//! Provides simple wrappers around std::fs for common file operations.

use std::path::{Path, PathBuf};

/// Check if a file exists at the given path.
pub fn file_exists(path: &Path) -> bool {
    path.exists() && path.is_file()
}

/// Get the filename from a path.
pub fn get_file_name(path: &Path) -> Option<String> {
    path.file_name().map(|s| s.to_string_lossy().into_owned())
}

/// Resolve a command line path against a working directory.
///
/// Absolute paths are returned unchanged.
pub fn resolve_against(working_directory: &Path, path: &Path) -> PathBuf {
    working_directory.join(path)
}
