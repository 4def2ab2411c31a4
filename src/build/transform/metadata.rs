//! Frontmatter extraction.
//!
//! During compilation each document's frontmatter is parsed and stored
//! against the document's resolved real path. The head injection step reads
//! it back once every page has been compiled.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::warn;

use crate::build::document::FrontMatter;
use crate::build::tree::{Document, SourceFile};

/// Per-page frontmatter, keyed by resolved real path.
#[derive(Debug, Default)]
pub struct MetadataStore {
    pages: Mutex<HashMap<PathBuf, FrontMatter>>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, real_path: PathBuf, front_matter: FrontMatter) {
        self.pages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(real_path, front_matter);
    }

    /// Look up a page by any path that resolves to it.
    pub fn get(&self, path: &Path) -> Option<FrontMatter> {
        let real_path = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        self.pages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&real_path)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.pages.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn clear(&self) {
        self.pages.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

/// Record a document's frontmatter.
///
/// Documents without frontmatter get an empty record so every compiled page
/// has one. Invalid YAML is reported and treated as empty, the same as a
/// missing block.
pub fn extract_metadata(doc: &Document, file: &SourceFile, store: &MetadataStore) {
    let front_matter = match doc.frontmatter() {
        Some(yaml) => FrontMatter::from_yaml(yaml).unwrap_or_else(|e| {
            warn!(document = %file.path.display(), error = %e, "failed to parse front matter");
            FrontMatter::default()
        }),
        None => FrontMatter::default(),
    };
    store.insert(file.real_path.clone(), front_matter);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::tree::Node;

    #[test]
    fn test_extract_metadata_by_real_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("post.mdx");
        std::fs::write(&path, "").unwrap();

        let doc = Document::new(vec![Node::Frontmatter(
            "title: Hello\ndescription: World".to_string(),
        )]);
        let store = MetadataStore::new();
        extract_metadata(&doc, &SourceFile::new(&path), &store);

        let fm = store.get(&path).unwrap();
        assert_eq!(fm.title, Some("Hello".to_string()));
        assert_eq!(fm.description, Some("World".to_string()));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_content_directory_resolves() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("real");
        std::fs::create_dir_all(&real).unwrap();
        std::fs::write(real.join("post.mdx"), "").unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let doc = Document::new(vec![Node::Frontmatter("title: Linked".to_string())]);
        let store = MetadataStore::new();
        extract_metadata(&doc, &SourceFile::new(link.join("post.mdx")), &store);

        let fm = store.get(&real.join("post.mdx")).unwrap();
        assert_eq!(fm.title, Some("Linked".to_string()));
    }

    #[test]
    fn test_invalid_yaml_is_empty() {
        let doc = Document::new(vec![Node::Frontmatter("title: [unclosed".to_string())]);
        let store = MetadataStore::new();
        let file = SourceFile::new("/nonexistent/post.mdx");
        extract_metadata(&doc, &file, &store);
        assert_eq!(store.get(&file.path), Some(FrontMatter::default()));
    }

    #[test]
    fn test_missing_frontmatter_records_default() {
        let store = MetadataStore::new();
        let file = SourceFile::new("/nonexistent/plain.md");
        extract_metadata(&Document::default(), &file, &store);
        assert_eq!(store.len(), 1);
        store.clear();
        assert_eq!(store.len(), 0);
    }
}
