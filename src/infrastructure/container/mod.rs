//! 依赖注入容器
//!
//! 提供按类型注册与解析的服务容器，支持：
//! - 单例 / 作用域 / 瞬态三种生命周期
//! - 作用域关闭时按 LIFO 顺序释放可释放实例
//! - 循环依赖检测
//! - 解析统计

pub mod dispose;
pub mod error;
pub mod facade;
pub mod scope;
pub mod service_container;

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

pub use dispose::{BoxError, Dispose};
pub use error::{ContainerError, DisposalFailure};
pub use facade::{ContainerFacade, LifetimeScope};
pub use scope::{ScopeInfo, ScopeState, ServiceScope};
pub use service_container::{ContainerOptions, ContainerStats, Resolver, ServiceContainer};

/// 解析得到的实例（类型擦除）
pub type Instance = Arc<dyn Any + Send + Sync>;

/// 服务生命周期
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceLifetime {
    /// 单例 - 整个容器生命周期只有一个实例，作用域关闭时不会释放
    Singleton,
    /// 作用域 - 在同一个作用域内共享实例，作用域关闭时释放
    Scoped,
    /// 瞬态 - 每次解析都创建新实例
    Transient,
}

/// 服务类型键
///
/// 以 `TypeId` 作为身份，同时保留类型名用于错误信息和日志。
#[derive(Clone, Copy)]
pub struct ServiceKey {
    id: TypeId,
    name: &'static str,
}

impl ServiceKey {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.id
    }

    pub fn type_name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for ServiceKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ServiceKey {}

impl Hash for ServiceKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServiceKey({})", self.name)
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// 将类型擦除的实例转换回 `Arc<T>`
pub fn downcast_instance<T: Send + Sync + 'static>(
    instance: Instance,
) -> Result<Arc<T>, ContainerError> {
    instance
        .downcast::<T>()
        .map_err(|_| ContainerError::TypeCastFailed {
            expected: std::any::type_name::<T>(),
        })
}
