use std::{collections::HashMap, env, fs, path::Path, path::PathBuf};

use tracing::debug;

use crate::errors::ConfigError;

use super::app_config::{
    JobscopeConfig, PartialJobscopeConfig, CONFIG_DIR_NAME, CONFIG_FILE_NAME, ENV_PREFIX,
    USER_CONFIG_PATH,
};

/// Configuration loader responsible for loading config from files and environment
pub struct ConfigLoader {
    base_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new config loader with default paths
    pub fn new() -> Self {
        Self { base_path: None }
    }

    /// Create a config loader with custom base path (for testing)
    pub fn with_base_path(base_path: PathBuf) -> Self {
        Self {
            base_path: Some(base_path),
        }
    }

    /// Load complete configuration. A missing file yields the defaults.
    pub fn load_config(&self) -> Result<JobscopeConfig, ConfigError> {
        let config_path = self.config_path()?;
        let partial_config = self.load_partial_config(&config_path)?;
        let env_map = self.collect_env_vars();

        JobscopeConfig::from_partial_and_env(partial_config, env_map)
    }

    /// Load a configuration file at an explicit path, ignoring the environment
    pub fn load_file(path: impl AsRef<Path>) -> Result<JobscopeConfig, ConfigError> {
        let path = PathBuf::from(shellexpand::tilde(&path.as_ref().to_string_lossy()).as_ref());
        let partial = Self::read_partial(&path)?;
        JobscopeConfig::from_partial_and_env(Some(partial), HashMap::new())
    }

    /// Resolve the configuration file path
    pub fn config_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(base_path) = &self.base_path {
            return Ok(base_path.join(CONFIG_FILE_NAME));
        }

        let dir = match dirs::config_dir() {
            Some(dir) => dir.join(CONFIG_DIR_NAME),
            None => {
                let expanded = shellexpand::tilde(USER_CONFIG_PATH);
                if expanded.starts_with('~') {
                    return Err(ConfigError::NoConfigDir);
                }
                PathBuf::from(expanded.as_ref())
            }
        };
        Ok(dir.join(CONFIG_FILE_NAME))
    }

    fn load_partial_config(
        &self,
        config_path: &Path,
    ) -> Result<Option<PartialJobscopeConfig>, ConfigError> {
        if !config_path.exists() {
            debug!(path = %config_path.display(), "No configuration file, using defaults");
            return Ok(None);
        }
        Self::read_partial(config_path).map(Some)
    }

    fn read_partial(path: &Path) -> Result<PartialJobscopeConfig, ConfigError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.display().to_string(), e))?;

        toml::from_str(&content).map_err(|e| ConfigError::TomlParse(path.display().to_string(), e))
    }

    /// Collect environment variables with the `JOBSCOPE_` prefix
    fn collect_env_vars(&self) -> HashMap<String, String> {
        env::vars()
            .filter(|(key, _)| key.starts_with(ENV_PREFIX))
            .collect()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
