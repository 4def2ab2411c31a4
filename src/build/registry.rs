//! Component registry.
//!
//! Maps component names to the file that defines them, built once per build
//! from a scan of the project's component directory. Names defined by more
//! than one file land in the conflict set and are never auto-resolved.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

/// File extensions that define components.
const COMPONENT_EXTENSIONS: &[&str] = &["tsx", "jsx", "ts", "js", "mdx"];

#[derive(thiserror::Error, Debug)]
pub enum RegistryError {
    #[error("failed to scan component directory {path}: {source}")]
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },
}

/// Component name lookup plus the set of ambiguous names.
#[derive(Debug, Clone, Default)]
pub struct ComponentRegistry {
    /// Every name with all of its candidate files, in scan order.
    candidates: BTreeMap<String, Vec<PathBuf>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan a component directory.
    ///
    /// A missing directory yields an empty registry. Files are visited in
    /// sorted order so the result is deterministic.
    pub fn scan(dir: &Path) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        if !dir.is_dir() {
            debug!(path = %dir.display(), "no component directory");
            return Ok(registry);
        }

        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(|source| RegistryError::Walk {
                path: dir.to_path_buf(),
                source,
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if let Some(name) = component_name(path) {
                registry.insert(name, path.to_path_buf());
            }
        }

        for (name, paths) in registry.conflicts() {
            warn!(component = %name, candidates = paths.len(), "component name is defined more than once");
        }

        Ok(registry)
    }

    /// Register a component file under a name.
    pub fn insert(&mut self, name: impl Into<String>, path: impl Into<PathBuf>) {
        let paths = self.candidates.entry(name.into()).or_default();
        let path = path.into();
        if !paths.contains(&path) {
            paths.push(path);
        }
    }

    /// Returns true if the name is registered, ambiguous or not.
    pub fn contains(&self, name: &str) -> bool {
        self.candidates.contains_key(name)
    }

    /// The defining file for an unambiguous name.
    pub fn resolve(&self, name: &str) -> Option<&Path> {
        match self.candidates.get(name) {
            Some(paths) if paths.len() == 1 => Some(&paths[0]),
            _ => None,
        }
    }

    /// Returns true if the name resolves to more than one file.
    pub fn is_conflict(&self, name: &str) -> bool {
        self.candidates.get(name).is_some_and(|paths| paths.len() > 1)
    }

    /// All candidate files for a name.
    pub fn candidates(&self, name: &str) -> &[PathBuf] {
        self.candidates.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The conflict set: ambiguous names with their candidates.
    pub fn conflicts(&self) -> impl Iterator<Item = (&str, &[PathBuf])> {
        self.candidates
            .iter()
            .filter(|(_, paths)| paths.len() > 1)
            .map(|(name, paths)| (name.as_str(), paths.as_slice()))
    }

    /// Names of the conflict set.
    pub fn conflict_names(&self) -> BTreeSet<&str> {
        self.conflicts().map(|(name, _)| name).collect()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// The component name a file defines.
///
/// `Card.tsx` defines `Card`; `Card/index.tsx` also defines `Card`.
fn component_name(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    if !COMPONENT_EXTENSIONS.contains(&ext.as_str()) {
        return None;
    }
    // Type declaration files (`Card.d.ts`) define no component
    let stem = path.file_stem()?.to_str()?;
    if stem.ends_with(".d") {
        return None;
    }
    if stem == "index" {
        return path
            .parent()?
            .file_name()?
            .to_str()
            .map(|s| s.to_string());
    }
    Some(stem.to_string())
}
