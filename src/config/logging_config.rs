use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::errors::ConfigError;

const SUPPORTED_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const SUPPORTED_FORMATS: [&str; 2] = ["pretty", "compact"];

/// Logging section of the configuration file
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LogConfig {
    /// Minimum level (trace, debug, info, warn, error)
    #[serde(default = "default_level")]
    pub level: String,

    /// Output format (pretty or compact)
    #[serde(default = "default_format")]
    pub format: String,
}

/// Partial logging configuration for loading from files
#[derive(Deserialize, Debug, Default)]
pub struct PartialLogConfig {
    pub level: Option<String>,
    pub format: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: default_format(),
        }
    }
}

impl LogConfig {
    /// Build from file values, letting `JOBSCOPE_LOG_LEVEL` override the level
    pub fn from_env_or_file(
        partial: Option<PartialLogConfig>,
        env_map: &HashMap<String, String>,
    ) -> Self {
        let partial = partial.unwrap_or_default();

        let level = env_map
            .get("JOBSCOPE_LOG_LEVEL")
            .cloned()
            .or(partial.level)
            .unwrap_or_else(default_level)
            .to_lowercase();

        Self {
            level,
            format: partial.format.unwrap_or_else(default_format).to_lowercase(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !SUPPORTED_LEVELS.contains(&self.level.as_str()) {
            return Err(ConfigError::InvalidValue {
                key: "logging.level".to_string(),
                value: self.level.clone(),
            });
        }
        if !SUPPORTED_FORMATS.contains(&self.format.as_str()) {
            return Err(ConfigError::InvalidValue {
                key: "logging.format".to_string(),
                value: self.format.clone(),
            });
        }
        Ok(())
    }
}

fn default_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "compact".to_string()
}
