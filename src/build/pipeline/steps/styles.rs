//! Stylesheet generation.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::build::pipeline::{BuildContext, PipelineState, Step, StepError, keys};
use crate::util::content_hash;

/// Rules every site gets, ahead of the project's own styles.
const BASE_CSS: &str = r#"*, *::before, *::after { box-sizing: border-box; }
html { -webkit-text-size-adjust: 100%; }
body { margin: 0; line-height: 1.5; font-family: system-ui, sans-serif; }
img, svg, video { max-width: 100%; height: auto; }
pre { overflow-x: auto; }
[data-component] { display: contents; }
"#;

/// Concatenate the base stylesheet and `styles/*.css` into one hashed file.
pub struct GenerateStyles;

impl Step for GenerateStyles {
    fn name(&self) -> &'static str {
        "generate-styles"
    }

    fn execute(&self, ctx: &BuildContext, state: &PipelineState) -> Result<(), StepError> {
        let mut css = String::from(BASE_CSS);
        let sheets = stylesheets(&ctx.paths.styles)?;
        for sheet in &sheets {
            let source = std::fs::read_to_string(sheet).map_err(|e| StepError::io(sheet, e))?;
            css.push_str(&format!("\n/* {} */\n", file_name(sheet)));
            css.push_str(&source);
            if !source.ends_with('\n') {
                css.push('\n');
            }
        }

        let filename = format!("styles-{}.css", content_hash(css.as_bytes()));
        let assets_dir = ctx.paths.assets_dir();
        std::fs::create_dir_all(&assets_dir).map_err(|e| StepError::io(&assets_dir, e))?;
        let path = assets_dir.join(&filename);
        std::fs::write(&path, &css).map_err(|e| StepError::io(&path, e))?;

        info!(sheets = sheets.len(), file = %filename, "generated styles");
        state.outputs.put(keys::CSS_FILENAME, filename)?;
        Ok(())
    }
}

/// Top-level `.css` files in the styles directory, sorted by name.
fn stylesheets(dir: &Path) -> Result<Vec<PathBuf>, StepError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let entries = std::fs::read_dir(dir).map_err(|e| StepError::io(dir, e))?;

    let mut sheets = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| StepError::io(dir, e))?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "css") {
            sheets.push(path);
        }
    }
    sheets.sort();
    Ok(sheets)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default()
}
