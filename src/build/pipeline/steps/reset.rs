//! Output directory reset.

use tracing::debug;

use crate::build::pipeline::{BuildContext, PipelineState, Step, StepError};

/// Delete and recreate the output directory so no stale files survive.
pub struct ResetDirectories;

impl Step for ResetDirectories {
    fn name(&self) -> &'static str {
        "reset-directories"
    }

    fn execute(&self, ctx: &BuildContext, _state: &PipelineState) -> Result<(), StepError> {
        let output = &ctx.paths.output;

        // Never wipe the project itself
        if ctx.paths.root.starts_with(output) || ctx.paths.content.starts_with(output) {
            return Err(StepError::Failed(format!(
                "refusing to clear output directory {}: it contains the project",
                output.display()
            )));
        }

        if output.exists() {
            debug!(path = %output.display(), "removing output directory");
            std::fs::remove_dir_all(output).map_err(|e| StepError::io(output, e))?;
        }
        std::fs::create_dir_all(output).map_err(|e| StepError::io(output, e))?;
        Ok(())
    }
}
