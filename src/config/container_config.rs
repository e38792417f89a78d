use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::errors::ConfigError;
use crate::infrastructure::container::ContainerOptions;

/// Configuration for the reference service container
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ContainerConfig {
    /// Reject scoped services resolved from the root
    #[serde(default)]
    pub validate_scopes: bool,

    /// Name given to the container's root scope in logs and errors
    #[serde(default = "default_root_scope_name")]
    pub root_scope_name: String,
}

/// Partial container configuration for loading from files
#[derive(Deserialize, Debug, Default)]
pub struct PartialContainerConfig {
    pub validate_scopes: Option<bool>,
    pub root_scope_name: Option<String>,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            validate_scopes: false,
            root_scope_name: default_root_scope_name(),
        }
    }
}

impl ContainerConfig {
    pub fn from_env_or_file(
        partial: Option<PartialContainerConfig>,
        env_map: &HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let partial = partial.unwrap_or_default();

        let validate_scopes = match env_map.get("JOBSCOPE_VALIDATE_SCOPES") {
            Some(raw) => parse_flag("JOBSCOPE_VALIDATE_SCOPES", raw)?,
            None => partial.validate_scopes.unwrap_or(false),
        };

        Ok(Self {
            validate_scopes,
            root_scope_name: partial
                .root_scope_name
                .unwrap_or_else(default_root_scope_name),
        })
    }

    /// Options for [`ServiceContainer::with_options`](crate::ServiceContainer::with_options)
    pub fn to_options(&self) -> ContainerOptions {
        ContainerOptions {
            validate_scopes: self.validate_scopes,
            root_scope_name: self.root_scope_name.clone(),
        }
    }
}

/// Parse a boolean environment flag (true/false/1/0/yes/no)
pub(crate) fn parse_flag(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.to_string(),
        }),
    }
}

fn default_root_scope_name() -> String {
    "root".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_container_options() {
        let config = ContainerConfig::from_env_or_file(None, &HashMap::new()).unwrap();
        assert_eq!(config, ContainerConfig::default());

        let options = config.to_options();
        let defaults = ContainerOptions::default();
        assert_eq!(options.validate_scopes, defaults.validate_scopes);
        assert_eq!(options.root_scope_name, defaults.root_scope_name);
    }

    #[test]
    fn test_env_flag_overrides_file() {
        let partial = PartialContainerConfig {
            validate_scopes: Some(false),
            root_scope_name: Some("app".to_string()),
        };
        let mut env_map = HashMap::new();
        env_map.insert("JOBSCOPE_VALIDATE_SCOPES".to_string(), "yes".to_string());

        let config = ContainerConfig::from_env_or_file(Some(partial), &env_map).unwrap();
        assert!(config.validate_scopes);
        assert_eq!(config.root_scope_name, "app");
    }

    #[test]
    fn test_invalid_env_flag() {
        let mut env_map = HashMap::new();
        env_map.insert("JOBSCOPE_VALIDATE_SCOPES".to_string(), "maybe".to_string());

        let result = ContainerConfig::from_env_or_file(None, &env_map);
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }
}
