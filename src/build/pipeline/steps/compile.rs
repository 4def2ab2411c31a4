//! Content compilation step.
//!
//! Runs the bundler over every entry with the content transforms as its
//! plugin, then checks what the transforms reported. The bundler may not
//! surface errors raised inside a plugin, so the diagnostics sink is
//! drained here and any entry in it fails the step.

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::build::bundle::BundleRequest;
use crate::build::output_map::build_output_map;
use crate::build::pipeline::{BuildContext, PipelineState, Step, StepError, keys};
use crate::build::transform::DocumentPlugin;

pub struct CompileContent;

impl Step for CompileContent {
    fn name(&self) -> &'static str {
        "compile-content"
    }

    fn execute(&self, ctx: &BuildContext, state: &PipelineState) -> Result<(), StepError> {
        let entries = state.outputs.get(keys::ENTRIES)?;
        let registry = state.outputs.get(keys::COMPONENTS)?;

        let transforms = ctx.transforms.bind(&registry);
        let plugins: [&dyn DocumentPlugin; 1] = [&transforms];
        let request = BundleRequest {
            entry_points: entries.values().cloned().collect(),
            content_root: ctx.paths.content.clone(),
            assets_dir: ctx.paths.assets_dir(),
        };
        let bundled = ctx.bundler.bundle(&request, &plugins);

        // Diagnostics first: an ambiguous component also surfaces as an
        // unresolved reference from the bundler, and the diagnostic says why
        let diagnostics = ctx.transforms.diagnostics().drain();
        if !diagnostics.is_empty() {
            for diagnostic in &diagnostics {
                warn!(document = %diagnostic.document().display(), "{diagnostic}");
            }
            return Err(StepError::Diagnostics(diagnostics));
        }
        let artifacts = bundled?;

        let js_outputs = build_output_map(
            &entries,
            &request.content_root,
            &request.assets_dir,
            &artifacts,
        )?;
        info!(entries = js_outputs.len(), artifacts = artifacts.len(), "compiled content");

        let page_metadata: BTreeMap<_, _> = entries
            .iter()
            .map(|(name, path)| {
                let front_matter = ctx.transforms.metadata().get(path).unwrap_or_default();
                (name.clone(), front_matter)
            })
            .collect();

        state.outputs.put(keys::JS_OUTPUTS, js_outputs)?;
        state.outputs.put(keys::PAGE_METADATA, page_metadata)?;
        Ok(())
    }
}
