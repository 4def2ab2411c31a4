//! HTML shell writing.
//!
//! Each entry gets `<output>/<url>/index.html`: the shell template with the
//! page's entry module, the site stylesheet and, when pre-rendering, the
//! page HTML.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::info;

use crate::build::paths::{entry_url, to_slash, url_to_output_path, with_base_path};
use crate::build::pipeline::{ASSETS_DIR, BuildContext, PipelineState, Step, StepError, keys};
use crate::build::render::{PageInfo, ShellContext};
use crate::util::title_case;

pub struct WriteShells;

impl Step for WriteShells {
    fn name(&self) -> &'static str {
        "write-shells"
    }

    fn execute(&self, ctx: &BuildContext, state: &PipelineState) -> Result<(), StepError> {
        let entries = state.outputs.get(keys::ENTRIES)?;
        let js_outputs = state.outputs.get(keys::JS_OUTPUTS)?;
        let css_filename = state.outputs.get(keys::CSS_FILENAME)?;
        let prerendered = if state.options().prerender {
            Some(state.outputs.get(keys::PRERENDERED)?)
        } else {
            None
        };

        let base = state.options().base_path.as_deref();
        let output = &ctx.paths.output;
        let stylesheet = with_base_path(&format!("/{ASSETS_DIR}/{css_filename}"), base);

        let mut html_files = BTreeMap::new();
        for entry in entries.keys() {
            let module = js_outputs.get(entry).ok_or_else(|| {
                StepError::Failed(format!("entry '{entry}' has no compiled module"))
            })?;
            let content = prerendered
                .as_ref()
                .and_then(|pages| pages.get(entry).cloned())
                .unwrap_or_default();

            let context = ShellContext {
                site: ctx.site.clone(),
                page: PageInfo {
                    title: default_title(entry, &ctx.site.name),
                    url: entry_url(entry, base),
                    entry: entry.clone(),
                    lang: ctx.site.lang.clone(),
                },
                content,
                script: with_base_path(&asset_url(module, output), base),
                stylesheet: stylesheet.clone(),
            };
            let html = ctx.shells.render(&context)?;

            // The output root is served at the base path
            let path = url_to_output_path(&entry_url(entry, None), output);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| StepError::io(parent, e))?;
            }
            std::fs::write(&path, html).map_err(|e| StepError::io(&path, e))?;
            html_files.insert(entry.clone(), path);
        }

        info!(pages = html_files.len(), "wrote page shells");
        state.outputs.put(keys::HTML_FILES, html_files)?;
        Ok(())
    }
}

/// Title for a page without one in its frontmatter.
fn default_title(entry: &str, site_name: &str) -> String {
    let slug = entry.rsplit('/').next().unwrap_or(entry);
    if slug == "index" {
        let parent = entry.trim_end_matches("index").trim_end_matches('/');
        match parent.rsplit('/').next() {
            Some(dir) if !dir.is_empty() => title_case(dir),
            _ => site_name.to_string(),
        }
    } else {
        title_case(slug)
    }
}

/// Root-absolute URL of a file in the output directory.
fn asset_url(path: &Path, output: &Path) -> String {
    let relative = path.strip_prefix(output).unwrap_or(path);
    format!("/{}", to_slash(relative))
}
