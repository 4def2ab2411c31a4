//! Logical entry name to hashed artifact lookup.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::bundle::{Artifact, OutputKind};
use super::paths::to_slash;
use crate::util::HASH_LEN;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum OutputMapError {
    #[error("no compiled output was produced for entry '{entry}'")]
    MissingArtifact { entry: String },
}

/// Map each logical entry to the entry-point artifact compiled from it.
///
/// Artifacts are matched by their pre-hash path: `_assets/blog/post-1a2b3c4d.js`
/// comes from the entry whose source is `<content_root>/blog/post.*`. Every
/// entry must have an artifact.
pub fn build_output_map(
    entries: &BTreeMap<String, PathBuf>,
    content_root: &Path,
    assets_dir: &Path,
    artifacts: &[Artifact],
) -> Result<BTreeMap<String, PathBuf>, OutputMapError> {
    let by_source: HashMap<String, &str> = entries
        .iter()
        .map(|(name, path)| {
            let relative = path
                .strip_prefix(content_root)
                .unwrap_or_else(|_| Path::new(path.file_name().unwrap_or_default()));
            (to_slash(&relative.with_extension("")), name.as_str())
        })
        .collect();

    let mut map = BTreeMap::new();
    for artifact in artifacts.iter().filter(|a| a.kind == OutputKind::EntryPoint) {
        let relative = artifact
            .path
            .strip_prefix(assets_dir)
            .unwrap_or_else(|_| Path::new(artifact.path.file_name().unwrap_or_default()));
        let hashed = to_slash(&relative.with_extension(""));
        let key = strip_content_hash(&hashed);

        match by_source.get(key) {
            Some(name) => {
                map.insert(name.to_string(), artifact.path.clone());
            }
            None => debug!(artifact = %artifact.path.display(), "artifact matches no entry"),
        }
    }

    if let Some(entry) = entries.keys().find(|name| !map.contains_key(*name)) {
        return Err(OutputMapError::MissingArtifact {
            entry: entry.clone(),
        });
    }

    Ok(map)
}

/// Strip a trailing `-<hash>` from a file stem.
fn strip_content_hash(stem: &str) -> &str {
    match stem.rsplit_once('-') {
        Some((base, hash))
            if !base.is_empty()
                && hash.len() >= HASH_LEN
                && hash.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            base
        }
        _ => stem,
    }
}
