//! Python project file collection.
//!
//! Walks a project root and returns every `.py` file keyed by its root-relative,
//! forward-slash path. A file that cannot be read still gets an entry, with a
//! sentinel string starting with [`READ_ERROR_PREFIX`] as its content, so one
//! bad file never aborts the scan.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

/// Content prefix marking a file that could not be read.
pub const READ_ERROR_PREFIX: &str = "Error reading file:";

/// Error message of the collection when no Python file exists under the root.
pub const NO_FILES_MESSAGE: &str = "No Python files found in the specified path.";

// ============================================================================
// Error Types
// ============================================================================

/// Error type for file collection.
#[derive(Debug, Error)]
pub enum CollectError {
    /// Project root does not exist.
    #[error("path not found: {path}")]
    PathNotFound { path: String },

    /// Project root exists but could not be resolved.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for file collection.
pub type CollectResult<T> = Result<T, CollectError>;

// ============================================================================
// Collection Output
// ============================================================================

/// Whole-collection failure, serialized as `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CollectFailure {
    pub error: String,
}

/// Collector output: a path → content mapping, or a single error object.
///
/// Downstream stages branch on the two shapes, so both serialize exactly as
/// `{"a.py": "...", ...}` and `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceCollection {
    Error(CollectFailure),
    Files(BTreeMap<String, String>),
}

impl SourceCollection {
    pub fn error(message: impl Into<String>) -> Self {
        SourceCollection::Error(CollectFailure {
            error: message.into(),
        })
    }

    /// The collected files, or None for the error shape.
    pub fn files(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            SourceCollection::Files(files) => Some(files),
            SourceCollection::Error(_) => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, SourceCollection::Error(_))
    }
}

/// Returns true if `content` is a read-error sentinel rather than source text.
pub fn is_read_error(content: &str) -> bool {
    content.starts_with(READ_ERROR_PREFIX)
}

// ============================================================================
// File Collection
// ============================================================================

/// Collect every Python file under `root`.
///
/// # Example
///
/// ```ignore
/// let collection = collect_python_files(Path::new("my_project"))?;
/// if let Some(files) = collection.files() {
///     for (path, content) in files {
///         println!("{} ({} bytes)", path, content.len());
///     }
/// }
/// ```
pub fn collect_python_files(root: &Path) -> CollectResult<SourceCollection> {
    collect_python_files_excluding(root, &[])
}

/// Collect Python files, skipping any path with a component named in
/// `exclude_dirs` (e.g. `"venv"`, `"__pycache__"`).
pub fn collect_python_files_excluding(
    root: &Path,
    exclude_dirs: &[&str],
) -> CollectResult<SourceCollection> {
    if !root.exists() {
        error!(path = %root.display(), "project path does not exist");
        return Err(CollectError::PathNotFound {
            path: root.display().to_string(),
        });
    }

    let resolved_root = root.canonicalize()?;
    info!(root = %resolved_root.display(), "collecting Python files");

    let mut files = BTreeMap::new();
    let mut error_count = 0usize;

    for entry in WalkDir::new(&resolved_root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let at = e.path().unwrap_or(resolved_root.as_path()).display().to_string();
                warn!(path = %at, "skipping unreadable entry: {}", e);
                continue;
            }
        };
        let path = entry.path();
        if entry.file_type().is_dir() || path.extension().is_none_or(|ext| ext != "py") {
            continue;
        }

        let rel_path = match path.strip_prefix(&resolved_root) {
            Ok(p) => p,
            Err(_) => continue,
        };

        if is_excluded(rel_path, exclude_dirs) {
            continue;
        }

        // Symlinks may point outside the project
        if !resolves_inside(path, &resolved_root) {
            warn!(path = %rel_path.display(), "skipping file outside project root");
            continue;
        }

        let key = normalize_rel_path(rel_path);
        match fs::read_to_string(path) {
            Ok(content) => {
                debug!(path = %key, "read file");
                files.insert(key, content);
            }
            Err(e) => {
                error_count += 1;
                error!(path = %key, error = %e, "error reading file");
                files.insert(key, format!("{} {}", READ_ERROR_PREFIX, e));
            }
        }
    }

    info!(
        files = files.len(),
        errors = error_count,
        "finished collecting Python files"
    );

    if files.is_empty() {
        warn!(root = %root.display(), "no Python files found");
        return Ok(SourceCollection::error(NO_FILES_MESSAGE));
    }

    Ok(SourceCollection::Files(files))
}

fn is_excluded(rel_path: &Path, exclude_dirs: &[&str]) -> bool {
    if exclude_dirs.is_empty() {
        return false;
    }
    let Some(parent) = rel_path.parent() else {
        return false;
    };
    parent.components().any(|c| {
        let name = c.as_os_str().to_string_lossy();
        exclude_dirs.iter().any(|d| *d == name)
    })
}

fn resolves_inside(path: &Path, resolved_root: &Path) -> bool {
    match path.canonicalize() {
        Ok(resolved) => resolved.starts_with(resolved_root),
        // Broken symlinks still get a sentinel entry when read
        Err(_) => path.starts_with(resolved_root),
    }
}

fn normalize_rel_path(rel_path: &Path) -> String {
    rel_path
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Resolve a collected relative path against the project root.
pub fn source_path(root: &Path, rel_path: &str) -> PathBuf {
    rel_path.split('/').fold(root.to_path_buf(), |acc, seg| acc.join(seg))
}

// ============================================================================
// Tests
// ============================================================================
