use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::config::{Config, ConfigError};

use super::paths::normalize_base_path;
use super::pipeline::{
    BuildContext, BuildOptions, Pipeline, PipelineFailure, ProjectPaths, keys,
};
use super::render::{RenderError, SiteContext};

#[derive(thiserror::Error, Debug)]
pub enum BuildError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("render error: {0}")]
    Render(#[from] RenderError),

    #[error(transparent)]
    Pipeline(#[from] Box<PipelineFailure>),

    #[error("build task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl BuildError {
    /// The pipeline failure, if the build got as far as running steps.
    pub fn pipeline_failure(&self) -> Option<&PipelineFailure> {
        match self {
            Self::Pipeline(failure) => Some(failure),
            _ => None,
        }
    }
}

/// Overrides applied on top of the project config.
#[derive(Debug, Clone, Default)]
pub struct BuildOverrides {
    pub prerender: Option<bool>,
    pub static_copy: Option<bool>,
    pub base_path: Option<String>,
}

#[derive(Debug)]
pub struct BuildResult {
    pub output_dir: PathBuf,
    pub pages: usize,
    pub static_files: usize,
    /// Per-step durations; members of a parallel group overlap.
    pub timings: Vec<(&'static str, Duration)>,
    /// Wall-clock time of the whole pipeline.
    pub total: Duration,
}

pub struct Builder {
    context: Arc<BuildContext>,
    options: BuildOptions,
    pipeline: Arc<Pipeline>,
}

impl Builder {
    /// Resolve a project's config into a builder for the default pipeline.
    pub fn new(config: Config, root: PathBuf, overrides: BuildOverrides) -> Result<Self, BuildError> {
        let base_path = normalize_base_path(
            overrides
                .base_path
                .as_deref()
                .or(config.site.base_path.as_deref()),
        );
        let options = BuildOptions {
            prerender: overrides.prerender.unwrap_or(config.build.prerender),
            static_copy: overrides.static_copy.unwrap_or(config.build.static_copy),
            base_path: base_path.clone(),
        };

        let paths = ProjectPaths {
            content: root.join(&config.paths.content),
            components: root.join(&config.paths.components),
            public: root.join(&config.paths.public),
            styles: root.join(&config.paths.styles),
            output: root.join(&config.paths.output),
            shell: config.paths.shell.as_ref().map(|shell| root.join(shell)),
            root,
        };
        let site = SiteContext {
            name: config.site.name,
            url: config.site.url,
            lang: config.site.lang,
            description: config.site.description,
        };
        let page_wrapper = Some(config.build.page_wrapper).filter(|name| !name.is_empty());

        let context = BuildContext::new(paths, site, base_path, page_wrapper)?;
        Ok(Self::with_context(context, options, Pipeline::default_pipeline()))
    }

    pub fn with_context(context: BuildContext, options: BuildOptions, pipeline: Pipeline) -> Self {
        debug!(steps = ?pipeline.step_names(), "pipeline");
        Self {
            context: Arc::new(context),
            options,
            pipeline: Arc::new(pipeline),
        }
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    pub async fn build(&self) -> Result<BuildResult, BuildError> {
        info!(
            project = %self.context.paths.root.display(),
            prerender = self.options.prerender,
            base_path = self.options.base_path.as_deref().unwrap_or("/"),
            "starting build"
        );

        // Per-build transform state must not leak between builds
        self.context.transforms.begin_build();

        let context = Arc::clone(&self.context);
        let pipeline = Arc::clone(&self.pipeline);
        let options = self.options.clone();
        let state = tokio::task::spawn_blocking(move || pipeline.run(&context, options))
            .await?
            .map_err(Box::new)?;

        let pages = state
            .outputs
            .get(keys::HTML_FILES)
            .map(|files| files.len())
            .unwrap_or(0);
        let static_files = state.outputs.get(keys::STATIC_FILES).map(|n| *n).unwrap_or(0);

        Ok(BuildResult {
            output_dir: self.context.paths.output.clone(),
            pages,
            static_files,
            timings: state.timings().to_vec(),
            total: state.total_time(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::build::bundle::{Artifact, BundleError, BundleRequest, Bundler};
    use crate::build::pipeline::StepError;
    use crate::build::render::PageRenderer;
    use crate::build::transform::DocumentPlugin;

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    fn project() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();

        write(
            &root,
            "components/Layout.tsx",
            "export default function Layout({ children }) {\n  return children;\n}\n",
        );
        write(
            &root,
            "components/Card.tsx",
            "export function Card(props) {\n  return null;\n}\n",
        );
        write(
            &root,
            "content/index.mdx",
            "---\ntitle: Home\ndescription: Welcome home\n---\n\n# Hello\n\n<Card title=\"Hi\" />\n",
        );
        write(
            &root,
            "content/blog/post.md",
            "# A post\n\n![Diagram](./diagram.png)\n",
        );
        write(&root, "styles/site.css", "body { color: red; }\n");
        write(&root, "public/robots.txt", "User-agent: *\n");

        (dir, root)
    }

    fn config() -> Config {
        let mut config = Config::default();
        config.site.url = Some("https://example.com".to_string());
        config
    }

    #[tokio::test]
    async fn test_build_project() {
        let (_dir, root) = project();
        let overrides = BuildOverrides {
            base_path: Some("/docs/".to_string()),
            ..Default::default()
        };
        let builder = Builder::new(config(), root.clone(), overrides).unwrap();
        assert_eq!(builder.options().base_path.as_deref(), Some("/docs"));

        let result = builder.build().await.unwrap();
        assert_eq!(result.output_dir, root.join("dist"));
        assert_eq!(result.pages, 2);
        assert_eq!(result.static_files, 1);
        let slowest = result.timings.iter().map(|(_, d)| *d).max().unwrap();
        assert!(result.total >= slowest);

        let steps: Vec<&str> = result.timings.iter().map(|(name, _)| *name).collect();
        for step in [
            "reset-directories",
            "discover-entries",
            "scan-components",
            "compile-content",
            "generate-styles",
            "copy-static",
            "prerender",
            "write-shells",
            "inject-head",
        ] {
            assert!(steps.contains(&step), "missing timing for {step}");
        }

        let index = std::fs::read_to_string(root.join("dist/index.html")).unwrap();
        assert!(index.contains("<title>Home</title>"));
        assert!(index.contains(r#"<meta name="description" content="Welcome home" />"#));
        assert!(index.contains(r#"<meta property="og:title" content="Home" />"#));
        assert!(index.contains("og:url"));
        assert!(index.contains(r#"data-component="Layout""#));
        assert!(index.contains(r#"data-component="Card""#));
        assert!(index.contains("<h1>Hello</h1>"));

        let post = std::fs::read_to_string(root.join("dist/blog/post/index.html")).unwrap();
        assert!(post.contains("<title>Post | Site</title>"));
        assert!(post.contains("diagram.png"));
        assert!(!post.contains("./diagram.png"));

        assert!(root.join("dist/robots.txt").is_file());
        let assets: Vec<String> = std::fs::read_dir(root.join("dist/_assets"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert!(assets.iter().any(|name| name.starts_with("styles-") && name.ends_with(".css")));
        assert!(assets.iter().any(|name| name.starts_with("index-") && name.ends_with(".js")));
    }

    #[tokio::test]
    async fn test_build_without_prerender() {
        let (_dir, root) = project();
        let overrides = BuildOverrides {
            prerender: Some(false),
            static_copy: Some(false),
            ..Default::default()
        };
        let builder = Builder::new(config(), root.clone(), overrides).unwrap();
        let result = builder.build().await.unwrap();

        assert_eq!(result.static_files, 0);
        assert!(!result.timings.iter().any(|(name, _)| *name == "prerender"));
        assert!(!result.timings.iter().any(|(name, _)| *name == "copy-static"));
        assert!(!root.join("dist/robots.txt").exists());

        let index = std::fs::read_to_string(root.join("dist/index.html")).unwrap();
        assert!(index.contains(r#"<div id="root"></div>"#));
        assert!(index.contains("<title>Home</title>"));
    }

    #[tokio::test]
    async fn test_ambiguous_component_halts_build() {
        let (_dir, root) = project();
        write(
            &root,
            "components/cards/Card.tsx",
            "export default function Card() {\n  return null;\n}\n",
        );

        let builder = Builder::new(config(), root.clone(), BuildOverrides::default()).unwrap();
        let err = builder.build().await.unwrap_err();
        let failure = err.pipeline_failure().unwrap();

        assert_eq!(failure.state.failed_step(), Some("compile-content"));
        assert!(!failure.error.diagnostics().is_empty());
        assert!(failure.state.timing("write-shells").is_none());
        assert!(!root.join("dist/index.html").exists());
    }

    #[tokio::test]
    async fn test_rebuild_is_repeatable() {
        let (_dir, root) = project();
        let builder = Builder::new(config(), root.clone(), BuildOverrides::default()).unwrap();

        let first = builder.build().await.unwrap();
        let second = builder.build().await.unwrap();
        assert_eq!(first.pages, second.pages);
        assert!(root.join("dist/index.html").is_file());
    }

    /// Reports success without emitting anything.
    struct EmptyBundler;

    impl Bundler for EmptyBundler {
        fn bundle(
            &self,
            _request: &BundleRequest,
            _plugins: &[&dyn DocumentPlugin],
        ) -> Result<Vec<Artifact>, BundleError> {
            Ok(Vec::new())
        }
    }

    struct FixedRenderer;

    impl PageRenderer for FixedRenderer {
        fn render(&self, _module: &Path) -> Result<String, RenderError> {
            Ok("<p>from the renderer</p>".to_string())
        }
    }

    fn context(root: &Path) -> BuildContext {
        let config = config();
        let paths = ProjectPaths {
            root: root.to_path_buf(),
            content: root.join("content"),
            components: root.join("components"),
            public: root.join("public"),
            styles: root.join("styles"),
            output: root.join("dist"),
            shell: None,
        };
        let site = SiteContext {
            name: config.site.name,
            url: config.site.url,
            lang: config.site.lang,
            description: config.site.description,
        };
        BuildContext::new(paths, site, None, Some("Layout".to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_custom_renderer_output_lands_in_shells() {
        let (_dir, root) = project();
        let builder = Builder::with_context(
            context(&root).with_renderer(FixedRenderer),
            BuildOptions::default(),
            Pipeline::default_pipeline(),
        );
        builder.build().await.unwrap();

        let post = std::fs::read_to_string(root.join("dist/blog/post/index.html")).unwrap();
        assert!(post.contains(r#"<div id="root"><p>from the renderer</p></div>"#));
    }

    #[tokio::test]
    async fn test_missing_bundler_artifact_fails_compile() {
        let (_dir, root) = project();
        let builder = Builder::with_context(
            context(&root).with_bundler(EmptyBundler),
            BuildOptions::default(),
            Pipeline::default_pipeline(),
        );
        let err = builder.build().await.unwrap_err();
        let failure = err.pipeline_failure().unwrap();

        assert_eq!(failure.state.failed_step(), Some("compile-content"));
        assert!(matches!(failure.error.step_error(), StepError::OutputMap(_)));
        assert!(!failure.state.outputs.contains(keys::JS_OUTPUTS));
    }
}
