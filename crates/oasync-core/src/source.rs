//! Local document sources
//!
//! Import sources are JSON-LD files or directories searched recursively for
//! them. Directory entries are returned in sorted order so a run visits
//! files in a stable sequence.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::{SyncError, SyncResult};

/// File extension of importable JSON-LD documents
pub const JSONLD_EXTENSION: &str = "jsonld";

/// List the entries of `directory` that can be imported
///
/// Returns subdirectories and `.jsonld` files; everything else is skipped.
pub fn select_files(directory: &Path) -> SyncResult<Vec<PathBuf>> {
    let read_error = |source: std::io::Error| SyncError::Read {
        path: directory.to_path_buf(),
        source,
    };

    let mut selected = Vec::new();
    for entry in fs::read_dir(directory).map_err(read_error)? {
        let path = entry.map_err(read_error)?.path();
        if path.is_dir() || is_jsonld(&path) {
            selected.push(path);
        }
    }
    selected.sort();
    Ok(selected)
}

/// Check whether a path has the JSON-LD extension
pub fn is_jsonld(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == JSONLD_EXTENSION)
}

/// Read a UTF-8 text file
pub fn read_text_file(path: &Path) -> SyncResult<String> {
    fs::read_to_string(path).map_err(|source| SyncError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Read and parse a JSON file
pub fn read_json_file(path: &Path) -> SyncResult<Value> {
    let text = read_text_file(path)?;
    Ok(serde_json::from_str(&text)?)
}
