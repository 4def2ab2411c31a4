//! Content compilation.
//!
//! The pipeline treats compilation as an opaque capability behind
//! [`Bundler`]: hand it entry points and plugins, get back the files it
//! produced. [`StaticBundler`] is the built-in implementation. It runs the
//! plugins over each document, renders the tree to HTML and writes one
//! content-hashed ES module per entry.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use serde_json::Value;
use tracing::debug;

use super::html::render_document;
use super::source::{DocumentSource, SourceError};
use super::transform::imports::collect_references;
use super::transform::{DocumentPlugin, PluginError};
use super::tree::{Document, SourceFile};
use crate::util::content_hash;

/// Client-side hydration runtime shared by every page.
const RUNTIME: &str = r#"// Hydrates component placeholders rendered at build time.
export function hydrate(registry, root = document) {
  for (const el of root.querySelectorAll("[data-component]")) {
    const component = registry[el.dataset.component];
    if (!component) continue;
    const props = el.dataset.props ? JSON.parse(el.dataset.props) : {};
    component(el, props);
  }
}
"#;

// =============================================================================
// Contract
// =============================================================================

#[derive(thiserror::Error, Debug)]
pub enum BundleError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("plugin {plugin} failed on {document}: {source}")]
    Plugin {
        plugin: &'static str,
        document: PathBuf,
        source: PluginError,
    },

    #[error("{document}: component '{component}' is not imported or defined")]
    UnresolvedReference { document: PathBuf, component: String },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to serialize module for {document}: {source}")]
    Serialize {
        document: PathBuf,
        source: serde_json::Error,
    },
}

/// What a produced file is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// The compiled module for one entry.
    EntryPoint,
    /// Code shared between entries.
    Chunk,
    /// Anything else (images, fonts).
    Asset,
}

/// A file the bundler wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub kind: OutputKind,
}

/// A compilation job.
#[derive(Debug, Clone)]
pub struct BundleRequest {
    /// Absolute source paths, one per entry.
    pub entry_points: Vec<PathBuf>,
    /// Entry modules are laid out under `assets_dir` mirroring this root.
    pub content_root: PathBuf,
    pub assets_dir: PathBuf,
}

pub trait Bundler: Send + Sync {
    fn bundle(
        &self,
        request: &BundleRequest,
        plugins: &[&dyn DocumentPlugin],
    ) -> Result<Vec<Artifact>, BundleError>;
}

// =============================================================================
// Static bundler
// =============================================================================

/// Compiles documents to static HTML-exporting modules.
pub struct StaticBundler {
    source: Arc<dyn DocumentSource>,
}

impl StaticBundler {
    pub fn new(source: Arc<dyn DocumentSource>) -> Self {
        Self { source }
    }

    fn compile_entry(
        &self,
        path: &Path,
        request: &BundleRequest,
        plugins: &[&dyn DocumentPlugin],
    ) -> Result<Artifact, BundleError> {
        let (mut doc, file) = self.source.load(path)?;

        for plugin in plugins {
            plugin
                .transform(&mut doc, &file)
                .map_err(|source| BundleError::Plugin {
                    plugin: plugin.name(),
                    document: file.path.clone(),
                    source,
                })?;
        }

        check_references(&doc, &file)?;

        let module = entry_module(&doc).map_err(|source| BundleError::Serialize {
            document: file.path.clone(),
            source,
        })?;

        let relative = path
            .strip_prefix(&request.content_root)
            .unwrap_or_else(|_| Path::new(path.file_name().unwrap_or_default()));
        let stem = relative
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let file_name = format!("{stem}-{}.js", content_hash(module.as_bytes()));
        let out_path = match relative.parent() {
            Some(parent) => request.assets_dir.join(parent).join(file_name),
            None => request.assets_dir.join(file_name),
        };

        write_file(&out_path, &module)?;
        debug!(entry = %path.display(), module = %out_path.display(), "compiled entry");

        Ok(Artifact {
            path: out_path,
            kind: OutputKind::EntryPoint,
        })
    }
}

impl Bundler for StaticBundler {
    fn bundle(
        &self,
        request: &BundleRequest,
        plugins: &[&dyn DocumentPlugin],
    ) -> Result<Vec<Artifact>, BundleError> {
        let compiled: Vec<Result<Artifact, BundleError>> = request
            .entry_points
            .par_iter()
            .map(|path| self.compile_entry(path, request, plugins))
            .collect();
        // First failure in entry order wins
        let mut artifacts = compiled.into_iter().collect::<Result<Vec<_>, _>>()?;

        let runtime_path = request
            .assets_dir
            .join(format!("runtime-{}.js", content_hash(RUNTIME.as_bytes())));
        write_file(&runtime_path, RUNTIME)?;
        artifacts.push(Artifact {
            path: runtime_path,
            kind: OutputKind::Chunk,
        });

        Ok(artifacts)
    }
}

/// Every invoked component must be bound by an import or a local export.
fn check_references(doc: &Document, file: &SourceFile) -> Result<(), BundleError> {
    let refs = collect_references(doc);
    match refs.invoked.difference(&refs.imported).next() {
        Some(component) => Err(BundleError::UnresolvedReference {
            document: file.path.clone(),
            component: component.clone(),
        }),
        None => Ok(()),
    }
}

/// The ES module for one compiled entry.
fn entry_module(doc: &Document) -> Result<String, serde_json::Error> {
    let html = render_document(doc);
    let frontmatter: Value = doc
        .frontmatter()
        .and_then(|yaml| serde_yaml::from_str(yaml).ok())
        .unwrap_or(Value::Null);
    let imports: Vec<&str> = doc.esm_blocks().collect();

    Ok(format!(
        "export const html = {};\nexport const frontmatter = {};\nexport const imports = {};\n",
        serde_json::to_string(&html)?,
        serde_json::to_string(&frontmatter)?,
        serde_json::to_string(&imports)?,
    ))
}

fn write_file(path: &Path, contents: &str) -> Result<(), BundleError> {
    let write = || -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)
    };
    write().map_err(|source| BundleError::Write {
        path: path.to_path_buf(),
        source,
    })
}
