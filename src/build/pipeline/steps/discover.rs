//! Entry discovery.

use tracing::{info, warn};

use crate::build::pipeline::{BuildContext, PipelineState, Step, StepError, keys};

/// Ask the document source for every entry.
pub struct DiscoverEntries;

impl Step for DiscoverEntries {
    fn name(&self) -> &'static str {
        "discover-entries"
    }

    fn execute(&self, ctx: &BuildContext, state: &PipelineState) -> Result<(), StepError> {
        let entries = ctx.source.entries()?;
        if entries.is_empty() {
            warn!(path = %ctx.paths.content.display(), "no content documents found");
        } else {
            info!(entries = entries.len(), "discovered entries");
        }
        state.outputs.put(keys::ENTRIES, entries)?;
        Ok(())
    }
}
