//! Pipeline error types.

use std::path::PathBuf;

use crate::build::bundle::BundleError;
use crate::build::diagnostics::Diagnostic;
use crate::build::output_map::OutputMapError;
use crate::build::registry::RegistryError;
use crate::build::render::RenderError;
use crate::build::source::SourceError;

use super::state::OutputError;

/// Errors a step's `execute` can return.
#[derive(thiserror::Error, Debug)]
pub enum StepError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Output(#[from] OutputError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Bundle(#[from] BundleError),

    #[error(transparent)]
    OutputMap(#[from] OutputMapError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("content transforms reported {} error(s)", .0.len())]
    Diagnostics(Vec<Diagnostic>),

    #[error("{0}")]
    Failed(String),
}

impl StepError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// A step failure, wrapped with the failing step's name.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("step '{step}' failed: {source}")]
    Step {
        step: &'static str,
        source: StepError,
    },
}

impl PipelineError {
    /// Create a step-specific error.
    pub fn step(step: &'static str, source: StepError) -> Self {
        Self::Step { step, source }
    }

    /// Name of the step that failed.
    pub fn step_name(&self) -> &'static str {
        match self {
            Self::Step { step, .. } => step,
        }
    }

    /// The error the step returned.
    pub fn step_error(&self) -> &StepError {
        match self {
            Self::Step { source, .. } => source,
        }
    }

    /// Diagnostics carried by the failure, if the transforms reported any.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self.step_error() {
            StepError::Diagnostics(diagnostics) => diagnostics,
            _ => &[],
        }
    }
}
