pub mod activation;
pub mod config;
pub mod errors;
pub mod infrastructure;
pub mod logging;
pub mod server; // 作业服务器边界：激活器选择与单个作业执行

// Re-export commonly used items for convenience
pub use activation::{
    ContainerJobActivator, ContainerJobActivatorScope, DefaultJobActivator, JobActivator,
    JobActivatorContext, JobActivatorScope,
};
pub use config::JobscopeConfig;
pub use errors::{ActivationError, ConfigError, PerformError};
pub use infrastructure::container::{
    BoxError, ContainerError, ContainerFacade, ContainerOptions, Dispose, Instance, LifetimeScope,
    ServiceContainer, ServiceKey, ServiceLifetime, ServiceScope,
};
pub use server::{JobPerformer, JobServerConfiguration};
