use tracing::info;
use walkdir::WalkDir;

use crate::build::pipeline::{BuildContext, PipelineState, Step, StepError, keys};

/// Copy the public directory into the output, preserving layout.
pub struct CopyStatic;

impl Step for CopyStatic {
    fn name(&self) -> &'static str {
        "copy-static"
    }

    fn should_run(&self, ctx: &BuildContext, state: &PipelineState) -> bool {
        state.options().static_copy && ctx.paths.public.is_dir()
    }

    fn execute(&self, ctx: &BuildContext, state: &PipelineState) -> Result<(), StepError> {
        let public = &ctx.paths.public;
        let mut copied = 0;

        for entry in WalkDir::new(public).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(public).to_path_buf();
                StepError::io(path, e.into())
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(public) else {
                continue;
            };

            let target = ctx.paths.output.join(relative);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent).map_err(|e| StepError::io(parent, e))?;
            }
            std::fs::copy(entry.path(), &target).map_err(|e| StepError::io(&target, e))?;
            copied += 1;
        }

        info!(files = copied, "copied static files");
        state.outputs.put(keys::STATIC_FILES, copied)?;
        Ok(())
    }
}
