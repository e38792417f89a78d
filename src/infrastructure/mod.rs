//! 基础设施层
//!
//! 提供依赖注入容器：服务注册、按生命周期解析以及作用域释放。

// 容器实现
pub mod container;

// 重新导出API
pub use container::{
    ContainerError, ContainerFacade, ContainerOptions, ContainerStats, Dispose, Instance,
    LifetimeScope, Resolver, ServiceContainer, ServiceKey, ServiceLifetime, ServiceScope,
};
