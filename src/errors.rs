use thiserror::Error;

use crate::infrastructure::container::ContainerError;

/// 作业激活错误
///
/// 容器产生的错误原样透传（`transparent`），激活层自身只产生 `InvalidArgument`。
#[derive(Debug, Error)]
pub enum ActivationError {
    #[error("Invalid argument '{argument}': {reason}")]
    InvalidArgument {
        argument: &'static str,
        reason: String,
    },
    /// 解析（或创建作用域）时容器返回的错误
    #[error(transparent)]
    Resolution(ContainerError),
    /// 关闭作用域时容器返回的错误
    #[error(transparent)]
    Disposal(ContainerError),
}

impl ActivationError {
    pub(crate) fn missing(argument: &'static str) -> Self {
        ActivationError::InvalidArgument {
            argument,
            reason: "value must not be absent".to_string(),
        }
    }

    /// 底层的容器错误（如果有）
    pub fn container_error(&self) -> Option<&ContainerError> {
        match self {
            ActivationError::Resolution(e) | ActivationError::Disposal(e) => Some(e),
            ActivationError::InvalidArgument { .. } => None,
        }
    }
}

/// 执行单个作业时的错误
#[derive(Debug, Error)]
pub enum PerformError {
    #[error("Job type '{0}' could not be activated: no registration found")]
    JobNotActivated(&'static str),
    #[error(transparent)]
    Activation(#[from] ActivationError),
    #[error("Job '{job_type}' failed: {source}")]
    JobFailed {
        job_type: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read file '{0}': {1}")]
    FileRead(String, #[source] std::io::Error),
    #[error("Failed to parse TOML from file '{0}': {1}")]
    TomlParse(String, #[source] toml::de::Error),
    #[error("Invalid value '{value}' for '{key}'")]
    InvalidValue { key: String, value: String },
    #[error("Configuration directory could not be determined")]
    NoConfigDir,
}
