use serde::{Deserialize, Serialize};
use std::{collections::HashMap, path::PathBuf};

use crate::errors::ConfigError;

use super::{
    activator_config::{ActivatorConfig, PartialActivatorConfig},
    container_config::{ContainerConfig, PartialContainerConfig},
    loader::ConfigLoader,
    logging_config::{LogConfig, PartialLogConfig},
};

// Configuration location constants
pub const USER_CONFIG_PATH: &str = "~/.config/jobscope";
pub const CONFIG_DIR_NAME: &str = "jobscope";
pub const CONFIG_FILE_NAME: &str = "jobscope.toml";

/// Environment variables recognised as overrides
pub const ENV_PREFIX: &str = "JOBSCOPE_";

/// Main configuration
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct JobscopeConfig {
    pub logging: LogConfig,
    pub container: ContainerConfig,
    pub activator: ActivatorConfig,
}

/// Partial configuration for loading from files
#[derive(Deserialize, Debug, Default)]
pub struct PartialJobscopeConfig {
    logging: Option<PartialLogConfig>,
    container: Option<PartialContainerConfig>,
    activator: Option<PartialActivatorConfig>,
}

impl JobscopeConfig {
    /// Load configuration from the user config directory and environment
    pub fn load() -> Result<Self, ConfigError> {
        ConfigLoader::new().load_config()
    }

    /// Load configuration with custom base path (for testing)
    pub fn load_with_base_path(base_path: PathBuf) -> Result<Self, ConfigError> {
        ConfigLoader::with_base_path(base_path).load_config()
    }

    /// Create config from partial config and environment
    pub fn from_partial_and_env(
        partial: Option<PartialJobscopeConfig>,
        env_map: HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let partial = partial.unwrap_or_default();

        let config = JobscopeConfig {
            logging: LogConfig::from_env_or_file(partial.logging, &env_map),
            container: ContainerConfig::from_env_or_file(partial.container, &env_map)?,
            activator: ActivatorConfig::from_env_or_file(partial.activator, &env_map)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.logging.validate()?;

        if self.container.root_scope_name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "container.root_scope_name".to_string(),
                value: self.container.root_scope_name.clone(),
            });
        }
        if self.activator.scope_name_prefix.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "activator.scope_name_prefix".to_string(),
                value: self.activator.scope_name_prefix.clone(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file_or_env() {
        let config = JobscopeConfig::from_partial_and_env(None, HashMap::new()).unwrap();
        assert_eq!(config, JobscopeConfig::default());
        assert_eq!(config.logging.level, "info");
        assert!(!config.container.validate_scopes);
        assert_eq!(config.activator.scope_name_prefix, "job");
    }

    #[test]
    fn test_partial_sections_from_toml() {
        let partial: PartialJobscopeConfig = toml::from_str(
            r#"
            [container]
            validate_scopes = true

            [activator]
            warn_on_implicit_close = false
            "#,
        )
        .unwrap();

        let config = JobscopeConfig::from_partial_and_env(Some(partial), HashMap::new()).unwrap();
        assert!(config.container.validate_scopes);
        assert_eq!(config.container.root_scope_name, "root"); // default
        assert!(!config.activator.warn_on_implicit_close);
        assert_eq!(config.logging, LogConfig::default());
    }

    #[test]
    fn test_empty_prefix_is_rejected() {
        let partial: PartialJobscopeConfig = toml::from_str(
            r#"
            [activator]
            scope_name_prefix = "  "
            "#,
        )
        .unwrap();

        let result = JobscopeConfig::from_partial_and_env(Some(partial), HashMap::new());
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { key, .. }) if key == "activator.scope_name_prefix"
        ));
    }
}
