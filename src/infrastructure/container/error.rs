use thiserror::Error;
use uuid::Uuid;

/// 单个实例的释放失败记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisposalFailure {
    pub service: &'static str,
    pub reason: String,
}

/// 依赖注入容器错误
#[derive(Debug, Error)]
pub enum ContainerError {
    /// 必需的服务未注册
    #[error("Service '{service}' is not registered")]
    ServiceNotRegistered { service: &'static str },

    /// 循环依赖
    #[error("Circular dependency detected: {}", .chain.join(" -> "))]
    CircularDependency { chain: Vec<&'static str> },

    /// 服务工厂失败
    #[error("Failed to create service '{service}': {reason}")]
    CreationFailed { service: &'static str, reason: String },

    /// 在根容器上解析作用域服务（仅在开启作用域校验时）
    #[error("Cannot resolve scoped service '{service}' from the root container")]
    ScopedFromRoot { service: &'static str },

    /// 作用域已结束
    #[error("Scope '{scope_name}' ({scope_id}) has ended, cannot {operation}")]
    ScopeEnded {
        scope_id: Uuid,
        scope_name: String,
        operation: &'static str,
    },

    /// 容器已释放
    #[error("Container has been disposed")]
    ContainerDisposed,

    /// 类型转换失败
    #[error("Type cast failed: expected '{expected}'")]
    TypeCastFailed { expected: &'static str },

    /// 关闭作用域时有实例释放失败
    #[error(
        "{} instance(s) failed to dispose in scope '{scope_name}': {}",
        .failures.len(),
        format_failures(.failures)
    )]
    DisposalFailed {
        scope_name: String,
        failures: Vec<DisposalFailure>,
    },
}

fn format_failures(failures: &[DisposalFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{} ({})", f.service, f.reason))
        .collect::<Vec<_>>()
        .join(", ")
}

impl ContainerError {
    /// 便捷构造：工厂创建失败
    pub fn creation_failed<T: ?Sized>(reason: impl Into<String>) -> Self {
        ContainerError::CreationFailed {
            service: std::any::type_name::<T>(),
            reason: reason.into(),
        }
    }
}
