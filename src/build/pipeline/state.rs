//! Pipeline state shared by every step of one build.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Configuration snapshot for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    /// Render page HTML into the shells at build time.
    pub prerender: bool,
    /// Copy the public directory into the output.
    pub static_copy: bool,
    /// Normalized deployment sub-path, e.g. `/docs`.
    pub base_path: Option<String>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            prerender: true,
            static_copy: true,
            base_path: None,
        }
    }
}

// =============================================================================
// Outputs
// =============================================================================

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum OutputError {
    #[error("output '{key}' has not been produced yet")]
    Missing { key: &'static str },

    #[error("output '{key}' was already written")]
    AlreadyWritten { key: &'static str },

    #[error("output '{key}' holds a value of a different type")]
    TypeMismatch { key: &'static str },
}

/// A typed name for an entry in the outputs bag.
pub struct OutputKey<T> {
    name: &'static str,
    _type: PhantomData<fn() -> T>,
}

impl<T> OutputKey<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _type: PhantomData,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for OutputKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for OutputKey<T> {}

impl<T> fmt::Debug for OutputKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OutputKey({})", self.name)
    }
}

/// Write-once values produced by steps.
///
/// Members of a parallel group write through a shared reference, so values
/// sit behind a mutex. Readers get an `Arc` and never hold the lock.
#[derive(Default)]
pub struct Outputs {
    values: Mutex<HashMap<&'static str, Arc<dyn Any + Send + Sync>>>,
}

impl Outputs {
    pub fn put<T: Any + Send + Sync>(&self, key: OutputKey<T>, value: T) -> Result<(), OutputError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        if values.contains_key(key.name) {
            return Err(OutputError::AlreadyWritten { key: key.name });
        }
        values.insert(key.name, Arc::new(value));
        Ok(())
    }

    pub fn get<T: Any + Send + Sync>(&self, key: OutputKey<T>) -> Result<Arc<T>, OutputError> {
        let value = self
            .values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key.name)
            .cloned()
            .ok_or(OutputError::Missing { key: key.name })?;
        value
            .downcast::<T>()
            .map_err(|_| OutputError::TypeMismatch { key: key.name })
    }

    pub fn contains<T>(&self, key: OutputKey<T>) -> bool {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key.name)
    }

    /// Names of every written output, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self
            .values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for Outputs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

/// Keys written by the default pipeline, with their producers.
pub mod keys {
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    use super::OutputKey;
    use crate::build::document::FrontMatter;
    use crate::build::registry::ComponentRegistry;

    /// discover-entries: entry name to source path.
    pub const ENTRIES: OutputKey<BTreeMap<String, PathBuf>> = OutputKey::new("entries");
    /// scan-components
    pub const COMPONENTS: OutputKey<ComponentRegistry> = OutputKey::new("components");
    /// compile-content: entry name to compiled module.
    pub const JS_OUTPUTS: OutputKey<BTreeMap<String, PathBuf>> = OutputKey::new("js output map");
    /// compile-content: entry name to frontmatter.
    pub const PAGE_METADATA: OutputKey<BTreeMap<String, FrontMatter>> =
        OutputKey::new("page metadata");
    /// generate-styles: stylesheet file name under the assets directory.
    pub const CSS_FILENAME: OutputKey<String> = OutputKey::new("css filename");
    /// copy-static: number of files copied.
    pub const STATIC_FILES: OutputKey<usize> = OutputKey::new("static files");
    /// prerender: entry name to page HTML.
    pub const PRERENDERED: OutputKey<BTreeMap<String, String>> = OutputKey::new("prerendered");
    /// write-shells: entry name to written HTML file.
    pub const HTML_FILES: OutputKey<BTreeMap<String, PathBuf>> = OutputKey::new("html files");
}

// =============================================================================
// State
// =============================================================================

/// Everything that flows through one pipeline run.
#[derive(Debug)]
pub struct PipelineState {
    options: BuildOptions,
    pub outputs: Outputs,
    timings: Vec<(&'static str, Duration)>,
    /// Wall-clock time across pipeline positions.
    elapsed: Duration,
    failed_step: Option<&'static str>,
}

impl PipelineState {
    pub fn new(options: BuildOptions) -> Self {
        Self {
            options,
            outputs: Outputs::default(),
            timings: Vec::new(),
            elapsed: Duration::ZERO,
            failed_step: None,
        }
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// Step durations in the order steps finished.
    pub fn timings(&self) -> &[(&'static str, Duration)] {
        &self.timings
    }

    pub fn timing(&self, step: &str) -> Option<Duration> {
        self.timings
            .iter()
            .find(|(name, _)| *name == step)
            .map(|(_, duration)| *duration)
    }

    /// Wall-clock time of the run. A parallel group counts once, for as
    /// long as its slowest member took, so this is less than the sum of
    /// [`timings`](Self::timings) whenever members overlapped.
    pub fn total_time(&self) -> Duration {
        self.elapsed
    }

    pub fn failed_step(&self) -> Option<&'static str> {
        self.failed_step
    }

    pub(super) fn record_timing(&mut self, step: &'static str, duration: Duration) {
        self.timings.push((step, duration));
    }

    pub(super) fn record_position(&mut self, duration: Duration) {
        self.elapsed += duration;
    }

    pub(super) fn mark_failed(&mut self, step: &'static str) {
        if self.failed_step.is_none() {
            self.failed_step = Some(step);
        }
    }
}
