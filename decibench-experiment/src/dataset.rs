//! Dataset discovery

use decibench_core::Result;
use std::path::{Path, PathBuf};
use tracing::warn;

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

/// Regular, non-hidden files in `dir` accepted by `keep`, sorted by name.
///
/// A missing directory is not an error: it yields no files and a warning.
pub fn list_files<F>(dir: &Path, keep: F) -> Result<Vec<PathBuf>>
where
    F: Fn(&Path) -> bool,
{
    if !dir.is_dir() {
        warn!(dir = %dir.display(), "Dataset directory not found");
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && !is_hidden(&path) && keep(&path) {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// `.obj` models of a prepared dataset
pub fn discover_models(dir: &Path) -> Result<Vec<PathBuf>> {
    list_files(dir, |p| {
        p.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("obj"))
    })
}

/// Every raw download, whatever its format
pub fn discover_raw_files(dir: &Path) -> Result<Vec<PathBuf>> {
    list_files(dir, |_| true)
}
