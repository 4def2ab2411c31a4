use std::path::{Path, PathBuf};

use serde::Serialize;
use tera::{Context, Tera};

#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error("template error: {0}")]
    Template(#[from] tera::Error),

    #[error("failed to read shell template {path}: {source}")]
    ReadTemplate {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read module {path}: {source}")]
    ReadModule {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("module {0} has no html export")]
    MissingHtmlExport(PathBuf),

    #[error("module {path} has an invalid html export: {source}")]
    InvalidHtmlExport {
        path: PathBuf,
        source: serde_json::Error,
    },
}

// =============================================================================
// Shells
// =============================================================================

const SHELL_TEMPLATE: &str = "shell.html";

/// Built-in page shell, used when the project has none.
const DEFAULT_SHELL: &str = r#"<!DOCTYPE html>
<html lang="{{ page.lang }}">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>{{ page.title }}{% if page.title != site.name %} | {{ site.name }}{% endif %}</title>
  <link rel="stylesheet" href="{{ stylesheet }}" />
</head>
<body>
  <div id="root">{{ content | safe }}</div>
  <script type="module" src="{{ script }}"></script>
</body>
</html>
"#;

/// Renders the HTML shell each page is served in, wrapping Tera.
pub struct ShellRenderer {
    tera: Tera,
}

impl ShellRenderer {
    /// Load the project's shell template, or the built-in one.
    pub fn new(custom: Option<&Path>) -> Result<Self, RenderError> {
        let template = match custom {
            Some(path) => std::fs::read_to_string(path).map_err(|source| {
                RenderError::ReadTemplate {
                    path: path.to_path_buf(),
                    source,
                }
            })?,
            None => DEFAULT_SHELL.to_string(),
        };

        let mut tera = Tera::default();
        tera.add_raw_template(SHELL_TEMPLATE, &template)?;
        Ok(Self { tera })
    }

    pub fn render(&self, context: &ShellContext) -> Result<String, RenderError> {
        let mut tera_context = Context::new();
        tera_context.insert("site", &context.site);
        tera_context.insert("page", &context.page);
        tera_context.insert("content", &context.content);
        tera_context.insert("script", &context.script);
        tera_context.insert("stylesheet", &context.stylesheet);

        Ok(self.tera.render(SHELL_TEMPLATE, &tera_context)?)
    }
}

/// Context passed to the shell template.
#[derive(Debug, Serialize)]
pub struct ShellContext {
    pub site: SiteContext,
    pub page: PageInfo,
    /// Pre-rendered page HTML; empty when pre-rendering is off.
    pub content: String,
    /// URL of the page's entry module.
    pub script: String,
    /// URL of the site stylesheet.
    pub stylesheet: String,
}

/// Site-level information.
#[derive(Debug, Clone, Serialize)]
pub struct SiteContext {
    pub name: String,
    pub url: Option<String>,
    pub lang: String,
    pub description: Option<String>,
}

/// Information about the current page.
#[derive(Debug, Serialize)]
pub struct PageInfo {
    pub title: String,
    pub url: String,
    /// Logical entry name
    pub entry: String,
    pub lang: String,
}

// =============================================================================
// Pre-rendering
// =============================================================================

/// Produces the HTML for a compiled page ahead of time.
pub trait PageRenderer: Send + Sync {
    fn render(&self, module: &Path) -> Result<String, RenderError>;
}

/// Reads the `html` export of a module written by the static bundler.
pub struct ModuleRenderer;

const HTML_EXPORT: &str = "export const html = ";

impl PageRenderer for ModuleRenderer {
    fn render(&self, module: &Path) -> Result<String, RenderError> {
        let source = std::fs::read_to_string(module).map_err(|source| RenderError::ReadModule {
            path: module.to_path_buf(),
            source,
        })?;

        let literal = source
            .lines()
            .find_map(|line| line.strip_prefix(HTML_EXPORT))
            .ok_or_else(|| RenderError::MissingHtmlExport(module.to_path_buf()))?;
        let literal = literal.trim_end().trim_end_matches(';');

        serde_json::from_str(literal).map_err(|source| RenderError::InvalidHtmlExport {
            path: module.to_path_buf(),
            source,
        })
    }
}
