use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::container_config::parse_flag;
use crate::errors::ConfigError;

/// Configuration for job activators
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ActivatorConfig {
    /// Prefix used to label job scopes in logs
    #[serde(default = "default_scope_name_prefix")]
    pub scope_name_prefix: String,

    /// Log a warning when a job scope is released by drop instead of `dispose_scope`
    #[serde(default = "default_warn_on_implicit_close")]
    pub warn_on_implicit_close: bool,
}

/// Partial activator configuration for loading from files
#[derive(Deserialize, Debug, Default)]
pub struct PartialActivatorConfig {
    pub scope_name_prefix: Option<String>,
    pub warn_on_implicit_close: Option<bool>,
}

impl Default for ActivatorConfig {
    fn default() -> Self {
        Self {
            scope_name_prefix: default_scope_name_prefix(),
            warn_on_implicit_close: default_warn_on_implicit_close(),
        }
    }
}

impl ActivatorConfig {
    pub fn from_env_or_file(
        partial: Option<PartialActivatorConfig>,
        env_map: &HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let partial = partial.unwrap_or_default();

        let warn_on_implicit_close = match env_map.get("JOBSCOPE_WARN_ON_IMPLICIT_CLOSE") {
            Some(raw) => parse_flag("JOBSCOPE_WARN_ON_IMPLICIT_CLOSE", raw)?,
            None => partial
                .warn_on_implicit_close
                .unwrap_or_else(default_warn_on_implicit_close),
        };

        Ok(Self {
            scope_name_prefix: partial
                .scope_name_prefix
                .unwrap_or_else(default_scope_name_prefix),
            warn_on_implicit_close,
        })
    }

    /// Label for a scope, e.g. `job-<id>`
    pub fn scope_label(&self, suffix: impl std::fmt::Display) -> String {
        format!("{}-{}", self.scope_name_prefix, suffix)
    }
}

fn default_scope_name_prefix() -> String {
    "job".to_string()
}

fn default_warn_on_implicit_close() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_partial_with_defaults() {
        let partial = PartialActivatorConfig {
            scope_name_prefix: Some("worker".to_string()),
            warn_on_implicit_close: None,
        };

        let config = ActivatorConfig::from_env_or_file(Some(partial), &HashMap::new()).unwrap();
        assert_eq!(config.scope_name_prefix, "worker");
        assert!(config.warn_on_implicit_close); // default
        assert_eq!(config.scope_label(7), "worker-7");
    }

    #[test]
    fn test_env_disables_warning() {
        let mut env_map = HashMap::new();
        env_map.insert("JOBSCOPE_WARN_ON_IMPLICIT_CLOSE".to_string(), "0".to_string());

        let config = ActivatorConfig::from_env_or_file(None, &env_map).unwrap();
        assert!(!config.warn_on_implicit_close);
    }
}
