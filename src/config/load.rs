//! Configuration loading from the project file and the environment.

use std::path::Path;

use tracing::debug;

use super::{CONFIG_FILE, Config, ConfigError, ENV_PREFIX};

impl Config {
    /// Load `pagewright.yaml` from the project root, then apply
    /// `PAGEWRIGHT__*` environment overrides.
    ///
    /// A missing file is not an error; every field has a default.
    pub fn load(project_root: &Path) -> Result<Self, ConfigError> {
        let path = project_root.join(CONFIG_FILE);
        let path_str = path
            .as_os_str()
            .to_str()
            .ok_or_else(|| ConfigError::EncodePath(path.clone()))?;

        let config = config::Config::builder()
            .add_source(config::File::new(path_str, config::FileFormat::Yaml).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize::<Config>()?;

        debug!(path = %path.display(), exists = path.is_file(), "loaded config");
        Ok(config)
    }
}
