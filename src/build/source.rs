use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use super::parse::parse_document;
use super::paths::entry_name;
use super::tree::{Document, SourceFile};

/// Extensions treated as content documents.
const DOCUMENT_EXTENSIONS: &[&str] = &["md", "mdx", "markdown"];

// =============================================================================
// Errors
// =============================================================================

#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error("content path does not exist: {0}")]
    PathNotFound(PathBuf),

    #[error("content path is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("failed to read directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: walkdir::Error,
    },

    #[error("failed to read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },
}

// =============================================================================
// Document source
// =============================================================================

/// Supplies the documents to build.
pub trait DocumentSource: Send + Sync {
    /// All entries: logical name to absolute source path.
    fn entries(&self) -> Result<BTreeMap<String, PathBuf>, SourceError>;

    /// Parse one document.
    fn load(&self, path: &Path) -> Result<(Document, SourceFile), SourceError>;
}

/// Documents read from a content directory on disk.
#[derive(Debug, Clone)]
pub struct FsDocumentSource {
    content_dir: PathBuf,
}

impl FsDocumentSource {
    pub fn new(content_dir: impl Into<PathBuf>) -> Self {
        Self {
            content_dir: content_dir.into(),
        }
    }

    pub fn content_dir(&self) -> &Path {
        &self.content_dir
    }
}

impl DocumentSource for FsDocumentSource {
    fn entries(&self) -> Result<BTreeMap<String, PathBuf>, SourceError> {
        let dir = &self.content_dir;
        if !dir.exists() {
            return Err(SourceError::PathNotFound(dir.clone()));
        }
        if !dir.is_dir() {
            return Err(SourceError::NotADirectory(dir.clone()));
        }

        let mut entries = BTreeMap::new();
        let walker = WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_skipped(e));

        for entry in walker {
            let entry = entry.map_err(|e| SourceError::ReadDir {
                path: dir.clone(),
                source: e,
            })?;
            if !entry.file_type().is_file() || !is_document(entry.path()) {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(dir) else {
                continue;
            };
            entries.insert(entry_name(relative), entry.path().to_path_buf());
        }

        Ok(entries)
    }

    fn load(&self, path: &Path) -> Result<(Document, SourceFile), SourceError> {
        let content = std::fs::read_to_string(path).map_err(|e| SourceError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok((parse_document(&content), SourceFile::new(path)))
    }
}

/// Hidden files and common non-content directories.
fn is_skipped(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.')
        || (entry.file_type().is_dir()
            && matches!(name.as_ref(), "node_modules" | "__pycache__" | "target"))
}

fn is_document(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .is_some_and(|e| DOCUMENT_EXTENSIONS.contains(&e.as_str()))
}
