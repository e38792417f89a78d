//! 作业激活
//!
//! 作业框架通过 [`JobActivator`] 获取作业实例：要么直接在根上激活，
//! 要么为每次作业执行开启一个 [`JobActivatorScope`]，在其中解析作业及其依赖，
//! 作业结束后释放作用域。

pub mod container_activator;
pub mod context;
pub mod default_activator;

use std::sync::Arc;

use crate::errors::ActivationError;
use crate::infrastructure::container::{downcast_instance, Instance, ServiceKey};

pub use container_activator::{ContainerJobActivator, ContainerJobActivatorScope};
pub use context::JobActivatorContext;
pub use default_activator::{DefaultJobActivator, DefaultJobActivatorScope};

/// 作业激活器
pub trait JobActivator: Send + Sync {
    /// 不经过作用域直接激活作业类型；无注册时返回 `Ok(None)`
    fn activate_job(&self, job_type: ServiceKey) -> Result<Option<Instance>, ActivationError>;

    /// 开启作用域（旧接口，不携带上下文）
    fn begin_scope(&self) -> Result<Box<dyn JobActivatorScope>, ActivationError>;

    /// 开启作用域。上下文只为接口兼容而接收，不影响解析行为。
    fn begin_scope_with_context(
        &self,
        _context: &JobActivatorContext,
    ) -> Result<Box<dyn JobActivatorScope>, ActivationError> {
        self.begin_scope()
    }
}

/// 单次作业执行的激活作用域
pub trait JobActivatorScope: Send {
    /// 在作用域内解析类型；无注册时返回 `Ok(None)`
    fn resolve(&self, job_type: ServiceKey) -> Result<Option<Instance>, ActivationError>;

    /// 释放作用域。第二次调用不会再次释放任何实例。
    fn dispose_scope(&mut self) -> Result<(), ActivationError>;
}

impl dyn JobActivator + '_ {
    /// 按类型激活并转换为 `Arc<T>`
    pub fn activate<T: Send + Sync + 'static>(&self) -> Result<Option<Arc<T>>, ActivationError> {
        self.activate_job(ServiceKey::of::<T>())?
            .map(|instance| downcast_instance::<T>(instance).map_err(ActivationError::Resolution))
            .transpose()
    }
}

impl dyn JobActivatorScope + '_ {
    /// 按类型解析并转换为 `Arc<T>`
    pub fn resolve_as<T: Send + Sync + 'static>(&self) -> Result<Option<Arc<T>>, ActivationError> {
        self.resolve(ServiceKey::of::<T>())?
            .map(|instance| downcast_instance::<T>(instance).map_err(ActivationError::Resolution))
            .transpose()
    }
}
