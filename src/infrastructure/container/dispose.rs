//! 资源释放
//!
//! 需要确定性释放的服务（连接、文件句柄等）实现 [`Dispose`]，
//! 并通过 `register_disposable` 注册，容器会在所属作用域关闭时调用它。

use super::{Instance, ServiceKey};

/// 工厂与释放逻辑使用的错误类型
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 同步资源释放
pub trait Dispose: Send + Sync + 'static {
    /// 释放资源。每个被跟踪的实例最多调用一次。
    fn dispose(&self) -> Result<(), BoxError>;
}

/// 类型擦除的释放函数
pub(crate) type Disposer = fn(&Instance) -> Result<(), BoxError>;

pub(crate) fn disposer_for<T: Dispose>() -> Disposer {
    fn dispose_erased<T: Dispose>(instance: &Instance) -> Result<(), BoxError> {
        match instance.downcast_ref::<T>() {
            Some(service) => service.dispose(),
            None => {
                Err(format!("tracked instance is not a {}", std::any::type_name::<T>()).into())
            }
        }
    }
    dispose_erased::<T>
}

/// 被作用域跟踪、等待释放的实例
pub(crate) struct Tracked {
    pub key: ServiceKey,
    pub instance: Instance,
    pub disposer: Disposer,
}

impl Tracked {
    pub fn dispose(&self) -> Result<(), BoxError> {
        (self.disposer)(&self.instance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Counter {
        calls: AtomicUsize,
    }

    impl Dispose for Counter {
        fn dispose(&self) -> Result<(), BoxError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_erased_disposer_calls_dispose() {
        let counter = Arc::new(Counter {
            calls: AtomicUsize::new(0),
        });
        let tracked = Tracked {
            key: ServiceKey::of::<Counter>(),
            instance: counter.clone(),
            disposer: disposer_for::<Counter>(),
        };

        tracked.dispose().unwrap();
        assert_eq!(counter.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_erased_disposer_rejects_wrong_type() {
        let tracked = Tracked {
            key: ServiceKey::of::<Counter>(),
            instance: Arc::new("not a counter"),
            disposer: disposer_for::<Counter>(),
        };

        assert!(tracked.dispose().is_err());
    }
}
