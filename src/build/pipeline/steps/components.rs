use tracing::info;

use crate::build::pipeline::{BuildContext, PipelineState, Step, StepError, keys};
use crate::build::registry::ComponentRegistry;

/// Build the component registry from the component directory.
pub struct ScanComponents;

impl Step for ScanComponents {
    fn name(&self) -> &'static str {
        "scan-components"
    }

    fn execute(&self, ctx: &BuildContext, state: &PipelineState) -> Result<(), StepError> {
        let registry = ComponentRegistry::scan(&ctx.paths.components)?;
        info!(
            components = registry.len(),
            conflicts = registry.conflict_names().len(),
            "scanned components"
        );
        state.outputs.put(keys::COMPONENTS, registry)?;
        Ok(())
    }
}
