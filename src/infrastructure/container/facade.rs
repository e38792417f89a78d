//! 容器门面
//!
//! 作业激活层只依赖这里的两个 trait：根级解析、创建子作用域、
//! 在作用域内解析以及关闭作用域。任何支持作用域解析与释放的容器都可以实现它们。

use uuid::Uuid;

use super::error::ContainerError;
use super::scope::ServiceScope;
use super::service_container::ServiceContainer;
use super::{Instance, ServiceKey};

/// 根容器能力
pub trait ContainerFacade: Send + Sync {
    /// 在根上解析服务；没有注册时返回 `Ok(None)`
    fn resolve(&self, key: ServiceKey) -> Result<Option<Instance>, ContainerError>;

    /// 创建子作用域
    fn create_scope(&self) -> Result<Box<dyn LifetimeScope>, ContainerError>;
}

/// 子作用域（作用域令牌）
pub trait LifetimeScope: Send {
    fn id(&self) -> Uuid;

    /// 在本作用域内解析服务；没有注册时返回 `Ok(None)`
    fn resolve(&self, key: ServiceKey) -> Result<Option<Instance>, ContainerError>;

    /// 释放本作用域跟踪的全部作用域/瞬态实例，单例除外。重复调用是安全的。
    fn close(&self) -> Result<(), ContainerError>;
}

impl ContainerFacade for ServiceContainer {
    fn resolve(&self, key: ServiceKey) -> Result<Option<Instance>, ContainerError> {
        self.resolve_key(key)
    }

    fn create_scope(&self) -> Result<Box<dyn LifetimeScope>, ContainerError> {
        Ok(Box::new(ServiceContainer::create_scope(self)?))
    }
}

impl LifetimeScope for ServiceScope {
    fn id(&self) -> Uuid {
        ServiceScope::id(self)
    }

    fn resolve(&self, key: ServiceKey) -> Result<Option<Instance>, ContainerError> {
        self.resolve_key(key)
    }

    fn close(&self) -> Result<(), ContainerError> {
        ServiceScope::close(self)
    }
}
