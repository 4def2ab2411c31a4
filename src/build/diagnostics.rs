//! Build-time diagnostics collected by the content transforms.
//!
//! Transforms never fail a document directly: the bundler that invokes them
//! may swallow plugin errors. Problems are collected here instead and the
//! compile step drains the sink once per build, failing if it is non-empty.

use std::fmt;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

/// A problem found while transforming a document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Diagnostic {
    /// An auto-injected component name resolves to more than one file.
    AmbiguousReference {
        document: PathBuf,
        component: String,
        candidates: Vec<PathBuf>,
    },
    /// A synthesized import statement failed to parse.
    MalformedImport {
        document: PathBuf,
        component: String,
        statement: String,
        reason: String,
    },
}

impl Diagnostic {
    /// The document the diagnostic was reported against.
    pub fn document(&self) -> &PathBuf {
        match self {
            Diagnostic::AmbiguousReference { document, .. }
            | Diagnostic::MalformedImport { document, .. } => document,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::AmbiguousReference {
                document,
                component,
                candidates,
            } => {
                write!(
                    f,
                    "{}: component '{}' is ambiguous ({} candidates: {}); add an explicit import",
                    document.display(),
                    component,
                    candidates.len(),
                    candidates
                        .iter()
                        .map(|p| p.display().to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            }
            Diagnostic::MalformedImport {
                document,
                component,
                statement,
                reason,
            } => write!(
                f,
                "{}: generated import for '{}' is malformed ({}): {}",
                document.display(),
                component,
                reason,
                statement
            ),
        }
    }
}

/// Append-only diagnostics collection shared by every document compile.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Mutex<Vec<Diagnostic>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, diagnostic: Diagnostic) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(diagnostic);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take every collected diagnostic, leaving the sink empty.
    ///
    /// Documents compile in parallel, so the result is sorted to keep
    /// reports stable.
    pub fn drain(&self) -> Vec<Diagnostic> {
        let mut drained =
            std::mem::take(&mut *self.entries.lock().unwrap_or_else(PoisonError::into_inner));
        drained.sort();
        drained
    }
}
