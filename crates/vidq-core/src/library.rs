//! Finished downloads in the output directory.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::error::CoreError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileEntry {
    pub name: String,
    pub size: u64,
    /// Seconds since the Unix epoch.
    pub mtime: f64,
}

/// Regular, non-hidden files directly in `dir`, newest first.
/// A missing directory lists as empty.
pub fn list_files(dir: &Path) -> Result<Vec<FileEntry>, CoreError> {
    let resource = |source: io::Error| CoreError::Resource {
        path: dir.to_path_buf(),
        source,
    };
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(resource(e)),
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(resource)?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        // Entries removed between read_dir and stat are skipped.
        let Ok(meta) = entry.metadata() else { continue };
        if !meta.is_file() {
            continue;
        }
        let mtime = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        files.push(FileEntry {
            name,
            size: meta.len(),
            mtime,
        });
    }
    files.sort_by(|a, b| b.mtime.total_cmp(&a.mtime).then_with(|| a.name.cmp(&b.name)));
    Ok(files)
}

/// Path of `name` inside `dir`. Anything that could leave `dir` (absolute
/// paths, `..`, hidden names) or does not name an existing file is NotFound.
pub fn resolve_file(dir: &Path, name: &str) -> Result<PathBuf, CoreError> {
    let not_found = || CoreError::not_found("file", name);
    let relative = Path::new(name);
    let mut components = relative.components().peekable();
    if components.peek().is_none() {
        return Err(not_found());
    }
    for component in components {
        match component {
            Component::Normal(part) if !part.to_string_lossy().starts_with('.') => {}
            _ => return Err(not_found()),
        }
    }
    let path = dir.join(relative);
    if path.is_file() {
        Ok(path)
    } else {
        Err(not_found())
    }
}
