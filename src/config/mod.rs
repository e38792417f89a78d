pub mod activator_config;
pub mod app_config;
pub mod container_config;
pub mod loader;
pub mod logging_config;

// Re-export commonly used types
pub use activator_config::ActivatorConfig;
pub use app_config::JobscopeConfig;
pub use container_config::ContainerConfig;
pub use loader::ConfigLoader;
pub use logging_config::LogConfig;

// Re-export constants
pub use app_config::{CONFIG_FILE_NAME, ENV_PREFIX};
