use std::collections::BTreeMap;

use rayon::prelude::*;
use tracing::info;

use crate::build::pipeline::{BuildContext, PipelineState, Step, StepError, keys};

/// Render every compiled page to HTML at build time.
pub struct Prerender;

impl Step for Prerender {
    fn name(&self) -> &'static str {
        "prerender"
    }

    fn should_run(&self, _ctx: &BuildContext, state: &PipelineState) -> bool {
        state.options().prerender
    }

    fn execute(&self, ctx: &BuildContext, state: &PipelineState) -> Result<(), StepError> {
        let js_outputs = state.outputs.get(keys::JS_OUTPUTS)?;

        let rendered = js_outputs
            .par_iter()
            .map(|(entry, module)| Ok((entry.clone(), ctx.renderer.render(module)?)))
            .collect::<Result<BTreeMap<_, _>, StepError>>()?;

        info!(pages = rendered.len(), "pre-rendered pages");
        state.outputs.put(keys::PRERENDERED, rendered)?;
        Ok(())
    }
}
