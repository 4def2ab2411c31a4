use std::path::{Path, PathBuf};

pub mod build;
pub mod clean;

/// The project directory: the given path, or the working directory.
fn project_root(path: Option<&Path>) -> Result<PathBuf, anyhow::Error> {
    let root = match path {
        Some(path) if path.is_absolute() => path.to_path_buf(),
        Some(path) => std::env::current_dir()?.join(path),
        None => std::env::current_dir()?,
    };
    if !root.is_dir() {
        anyhow::bail!("project directory {} does not exist", root.display());
    }
    Ok(root.canonicalize()?)
}
