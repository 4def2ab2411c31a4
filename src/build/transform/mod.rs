//! Content transform stage.
//!
//! Three transforms run over every document as the bundler compiles it:
//!
//! 1. [`metadata`]: record the frontmatter for the head injection step
//! 2. [`imports`]: wrap the page and inject missing component imports
//! 3. [`rewrite`]: rebase image and link targets
//!
//! All cross-document state (diagnostics, the default-export cache, the
//! frontmatter store) lives on a [`TransformStage`] constructed once per
//! build. Binding it to the run's component registry yields the plugin
//! handed to the bundler.

pub mod esm;
pub mod imports;
pub mod metadata;
pub mod rewrite;

use std::path::PathBuf;

use tracing::debug;

use crate::build::diagnostics::Diagnostics;
use crate::build::registry::ComponentRegistry;
use crate::build::tree::{Document, SourceFile};

pub use esm::ExportCache;
pub use metadata::MetadataStore;

// =============================================================================
// Plugin contract
// =============================================================================

/// Error a plugin may raise for a document it cannot process.
#[derive(thiserror::Error, Debug)]
pub enum PluginError {
    #[error("{plugin}: {message}")]
    Failed {
        plugin: &'static str,
        message: String,
    },
}

/// A tree transform the bundler runs over every document it compiles.
pub trait DocumentPlugin: Send + Sync {
    fn name(&self) -> &'static str;

    fn transform(&self, doc: &mut Document, file: &SourceFile) -> Result<(), PluginError>;
}

// =============================================================================
// Stage
// =============================================================================

/// Per-build settings for the transforms.
#[derive(Debug, Clone)]
pub struct TransformSettings {
    /// Absolute content root; document directories are taken relative to it.
    pub content_root: PathBuf,
    /// Normalized base path (`/site`), or `None`.
    pub base_path: Option<String>,
    /// Component that wraps every page, if registered.
    pub page_wrapper: Option<String>,
}

/// Transform state shared by every document in one build.
#[derive(Debug)]
pub struct TransformStage {
    settings: TransformSettings,
    diagnostics: Diagnostics,
    exports: ExportCache,
    metadata: MetadataStore,
}

impl TransformStage {
    pub fn new(settings: TransformSettings) -> Self {
        Self {
            settings,
            diagnostics: Diagnostics::new(),
            exports: ExportCache::new(),
            metadata: MetadataStore::new(),
        }
    }

    /// Reset per-build state. Component files may have changed since the
    /// last build, so the default-export cache is invalidated here too.
    pub fn begin_build(&self) {
        debug!(
            cached_exports = self.exports.len(),
            pages = self.metadata.len(),
            "resetting transform stage"
        );
        self.exports.clear();
        self.metadata.clear();
        self.diagnostics.drain();
    }

    /// Bind the stage to this run's component registry.
    pub fn bind<'a>(&'a self, registry: &'a ComponentRegistry) -> ContentTransforms<'a> {
        ContentTransforms {
            stage: self,
            registry,
        }
    }

    pub fn settings(&self) -> &TransformSettings {
        &self.settings
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }
}

/// The transform stage bound to a registry, as a bundler plugin.
#[derive(Debug, Clone, Copy)]
pub struct ContentTransforms<'a> {
    stage: &'a TransformStage,
    registry: &'a ComponentRegistry,
}

impl DocumentPlugin for ContentTransforms<'_> {
    fn name(&self) -> &'static str {
        "content-transforms"
    }

    fn transform(&self, doc: &mut Document, file: &SourceFile) -> Result<(), PluginError> {
        let settings = &self.stage.settings;

        metadata::extract_metadata(doc, file, &self.stage.metadata);

        imports::inject_imports(
            doc,
            file,
            &imports::ImportContext {
                registry: self.registry,
                page_wrapper: settings.page_wrapper.as_deref(),
                exports: &self.stage.exports,
                diagnostics: &self.stage.diagnostics,
            },
        );

        rewrite::rewrite_paths(
            doc,
            file,
            &rewrite::RewriteContext {
                content_root: &settings.content_root,
                base_path: settings.base_path.as_deref(),
            },
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::parse::parse_document;
    use crate::build::tree::{Node, walk};

    fn write(path: &std::path::Path, content: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_transforms_run_together() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(&root.join("components/Layout.tsx"), "export default function Layout() {}");
        write(&root.join("components/Card.tsx"), "export function Card() {}");
        let doc_path = root.join("content/blog/post.mdx");
        write(&doc_path, "");

        let registry = ComponentRegistry::scan(&root.join("components")).unwrap();
        let stage = TransformStage::new(TransformSettings {
            content_root: root.join("content"),
            base_path: Some("/site".to_string()),
            page_wrapper: Some("Layout".to_string()),
        });
        stage.begin_build();

        let mut doc = parse_document("---\ntitle: Post\n---\n\n<Card />\n\n![a](./a.png)\n");
        let file = SourceFile::new(&doc_path);
        stage.bind(&registry).transform(&mut doc, &file).unwrap();

        let esm: Vec<&str> = doc.esm_blocks().collect();
        assert!(esm.contains(&"import Layout from \"../../components/Layout.tsx\";"));
        assert!(esm.contains(&"import { Card } from \"../../components/Card.tsx\";"));

        let mut image_src = None;
        walk(&doc.children, &mut |node| {
            if let Node::Image(image) = node {
                image_src = Some(image.src.clone());
            }
        });
        assert_eq!(image_src.as_deref(), Some("/site/blog/a.png"));

        let fm = stage.metadata().get(&doc_path).unwrap();
        assert_eq!(fm.title, Some("Post".to_string()));
        assert!(stage.diagnostics().is_empty());
    }

    #[test]
    fn test_begin_build_resets_state() {
        let stage = TransformStage::new(TransformSettings {
            content_root: PathBuf::from("/content"),
            base_path: None,
            page_wrapper: None,
        });
        let registry = ComponentRegistry::new();
        let mut doc = Document::default();
        stage
            .bind(&registry)
            .transform(&mut doc, &SourceFile::new("/content/a.md"))
            .unwrap();
        assert_eq!(stage.metadata().len(), 1);

        stage.begin_build();
        assert_eq!(stage.metadata().len(), 0);
    }
}
