//! Build context shared by every step.

use std::path::PathBuf;
use std::sync::Arc;

use crate::build::bundle::{Bundler, StaticBundler};
use crate::build::render::{ModuleRenderer, PageRenderer, RenderError, ShellRenderer, SiteContext};
use crate::build::source::{DocumentSource, FsDocumentSource};
use crate::build::transform::{TransformSettings, TransformStage};

/// Directory under the output root for compiled assets.
pub const ASSETS_DIR: &str = "_assets";

/// Absolute project locations.
#[derive(Debug, Clone)]
pub struct ProjectPaths {
    pub root: PathBuf,
    pub content: PathBuf,
    pub components: PathBuf,
    pub public: PathBuf,
    pub styles: PathBuf,
    pub output: PathBuf,
    /// Custom HTML shell template
    pub shell: Option<PathBuf>,
}

impl ProjectPaths {
    pub fn assets_dir(&self) -> PathBuf {
        self.output.join(ASSETS_DIR)
    }
}

/// Read-only resources and collaborators for one build.
///
/// Unlike [`PipelineState`](super::PipelineState), nothing here is produced
/// by a step. Steps share it by reference, including across parallel groups.
pub struct BuildContext {
    pub paths: ProjectPaths,
    pub site: SiteContext,
    pub source: Arc<dyn DocumentSource>,
    pub bundler: Box<dyn Bundler>,
    pub renderer: Box<dyn PageRenderer>,
    pub transforms: TransformStage,
    pub shells: ShellRenderer,
}

impl BuildContext {
    /// Create a context with the filesystem source, the static bundler and
    /// the module pre-renderer.
    pub fn new(
        paths: ProjectPaths,
        site: SiteContext,
        base_path: Option<String>,
        page_wrapper: Option<String>,
    ) -> Result<Self, RenderError> {
        let source: Arc<dyn DocumentSource> = Arc::new(FsDocumentSource::new(&paths.content));
        let shells = ShellRenderer::new(paths.shell.as_deref())?;
        let transforms = TransformStage::new(TransformSettings {
            content_root: paths.content.clone(),
            base_path,
            page_wrapper,
        });

        Ok(Self {
            bundler: Box::new(StaticBundler::new(Arc::clone(&source))),
            renderer: Box::new(ModuleRenderer),
            source,
            transforms,
            shells,
            paths,
            site,
        })
    }

    pub fn with_bundler(mut self, bundler: impl Bundler + 'static) -> Self {
        self.bundler = Box::new(bundler);
        self
    }

    pub fn with_renderer(mut self, renderer: impl PageRenderer + 'static) -> Self {
        self.renderer = Box::new(renderer);
        self
    }
}
