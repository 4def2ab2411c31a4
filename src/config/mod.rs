//! Project configuration.
//!
//! - Type definitions (`types`)
//! - Loading from `pagewright.yaml` and the environment (`load`)

mod load;
mod types;

use std::path::PathBuf;

pub use types::{BuildConfig, Config, PathsConfig, SiteConfig};

/// Config file name, looked up in the project root.
pub const CONFIG_FILE: &str = "pagewright.yaml";

/// Environment variables `PAGEWRIGHT__SECTION__KEY` override the file.
pub const ENV_PREFIX: &str = "PAGEWRIGHT";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Deserialize(#[from] config::ConfigError),

    #[error("config path is not valid UTF-8: {}", .0.display())]
    EncodePath(PathBuf),
}
