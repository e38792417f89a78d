//! 基于容器的作业激活器
//!
//! 把作业框架的激活契约桥接到 [`ContainerFacade`]：根级激活直接委托给容器，
//! 每次作业执行对应一个新的容器作用域，作业结束时关闭该作用域。

use std::sync::Arc;

use tracing::{debug, warn};

use super::{JobActivator, JobActivatorContext, JobActivatorScope};
use crate::config::ActivatorConfig;
use crate::errors::ActivationError;
use crate::infrastructure::container::{ContainerFacade, Instance, LifetimeScope, ServiceKey};

/// 容器作业激活器
///
/// 不缓存任何实例，所有生命周期语义都由容器决定。
pub struct ContainerJobActivator {
    container: Arc<dyn ContainerFacade>,
    config: ActivatorConfig,
}

impl ContainerJobActivator {
    /// 创建激活器。`container` 缺失时返回 `InvalidArgument`。
    pub fn new(container: Option<Arc<dyn ContainerFacade>>) -> Result<Self, ActivationError> {
        Self::with_config(container, ActivatorConfig::default())
    }

    pub fn with_config(
        container: Option<Arc<dyn ContainerFacade>>,
        config: ActivatorConfig,
    ) -> Result<Self, ActivationError> {
        let container = container.ok_or_else(|| ActivationError::missing("container"))?;
        Ok(Self { container, config })
    }

    /// 两个 `begin_scope` 入口共用的作用域创建逻辑
    fn open_scope(
        &self,
        context: Option<&JobActivatorContext>,
    ) -> Result<ContainerJobActivatorScope, ActivationError> {
        let scope = self
            .container
            .create_scope()
            .map_err(ActivationError::Resolution)?;

        let label = match context {
            Some(context) => self.config.scope_label(context.job_id),
            None => self.config.scope_label(scope.id()),
        };
        debug!(scope = %label, scope_id = %scope.id(), "Job scope opened");

        Ok(ContainerJobActivatorScope {
            scope,
            label,
            closed: false,
            warn_on_implicit_close: self.config.warn_on_implicit_close,
        })
    }
}

impl JobActivator for ContainerJobActivator {
    fn activate_job(&self, job_type: ServiceKey) -> Result<Option<Instance>, ActivationError> {
        self.container
            .resolve(job_type)
            .map_err(ActivationError::Resolution)
    }

    fn begin_scope(&self) -> Result<Box<dyn JobActivatorScope>, ActivationError> {
        Ok(Box::new(self.open_scope(None)?))
    }

    fn begin_scope_with_context(
        &self,
        context: &JobActivatorContext,
    ) -> Result<Box<dyn JobActivatorScope>, ActivationError> {
        Ok(Box::new(self.open_scope(Some(context))?))
    }
}

impl std::fmt::Debug for ContainerJobActivator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerJobActivator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// 单次作业执行的容器作用域句柄
///
/// 独占一个容器作用域。调用方没有调用 [`dispose_scope`](JobActivatorScope::dispose_scope)
/// 时，句柄在 drop 时关闭作用域。
pub struct ContainerJobActivatorScope {
    scope: Box<dyn LifetimeScope>,
    label: String,
    closed: bool,
    warn_on_implicit_close: bool,
}

impl ContainerJobActivatorScope {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl JobActivatorScope for ContainerJobActivatorScope {
    fn resolve(&self, job_type: ServiceKey) -> Result<Option<Instance>, ActivationError> {
        self.scope
            .resolve(job_type)
            .map_err(ActivationError::Resolution)
    }

    fn dispose_scope(&mut self) -> Result<(), ActivationError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        debug!(scope = %self.label, "Disposing job scope");
        self.scope.close().map_err(ActivationError::Disposal)
    }
}

impl Drop for ContainerJobActivatorScope {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if self.warn_on_implicit_close {
            warn!(
                scope = %self.label,
                "Job scope was not disposed explicitly, closing on drop"
            );
        }
        if let Err(e) = self.scope.close() {
            warn!(scope = %self.label, error = %e, "Failed to close job scope on drop");
        }
    }
}

impl std::fmt::Debug for ContainerJobActivatorScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerJobActivatorScope")
            .field("label", &self.label)
            .field("scope_id", &self.scope.id())
            .field("closed", &self.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::container::{
        BoxError, ContainerError, Dispose, ServiceContainer, ServiceLifetime,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Greeter;

    struct Widget {
        disposed: Arc<AtomicUsize>,
    }

    impl Dispose for Widget {
        fn dispose(&self) -> Result<(), BoxError> {
            self.disposed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn activator_for(container: &ServiceContainer) -> ContainerJobActivator {
        ContainerJobActivator::new(Some(Arc::new(container.clone()))).unwrap()
    }

    #[test]
    fn test_absent_container_is_rejected() {
        match ContainerJobActivator::new(None) {
            Err(ActivationError::InvalidArgument { argument, .. }) => {
                assert_eq!(argument, "container")
            }
            other => panic!("expected InvalidArgument, got {:?}", other),
        }
    }

    #[test]
    fn test_activate_job_delegates_to_root() {
        let container = ServiceContainer::new();
        container.register_transient(|_| Ok(Greeter));
        let activator = activator_for(&container);

        assert!(activator
            .activate_job(ServiceKey::of::<Greeter>())
            .unwrap()
            .is_some());
        assert!(activator
            .activate_job(ServiceKey::of::<Widget>())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_dispose_scope_is_idempotent() {
        let disposed = Arc::new(AtomicUsize::new(0));
        let counter = disposed.clone();
        let container = ServiceContainer::new();
        container.register_disposable(ServiceLifetime::Scoped, move |_| {
            Ok(Widget {
                disposed: counter.clone(),
            })
        });
        let activator = activator_for(&container);

        let mut scope = activator.begin_scope().unwrap();
        scope.resolve(ServiceKey::of::<Widget>()).unwrap();
        scope.dispose_scope().unwrap();
        scope.dispose_scope().unwrap();
        drop(scope);

        assert_eq!(disposed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_releases_scope() {
        let disposed = Arc::new(AtomicUsize::new(0));
        let counter = disposed.clone();
        let container = ServiceContainer::new();
        container.register_disposable(ServiceLifetime::Transient, move |_| {
            Ok(Widget {
                disposed: counter.clone(),
            })
        });
        let activator = activator_for(&container);

        {
            let context = JobActivatorContext::for_job::<Widget>();
            let scope = activator.begin_scope_with_context(&context).unwrap();
            scope.resolve(ServiceKey::of::<Widget>()).unwrap();
        }

        assert_eq!(disposed.load(Ordering::SeqCst), 1);
        assert_eq!(container.get_stats().active_scopes(), 0);
    }

    #[test]
    fn test_resolve_after_dispose_passes_container_error_through() {
        let container = ServiceContainer::new();
        container.register_scoped(|_| Ok(Greeter));
        let activator = activator_for(&container);

        let mut scope = activator.begin_scope().unwrap();
        scope.dispose_scope().unwrap();

        let err = scope.resolve(ServiceKey::of::<Greeter>()).unwrap_err();
        assert!(matches!(
            err,
            ActivationError::Resolution(ContainerError::ScopeEnded { .. })
        ));
    }

    #[test]
    fn test_scope_label_uses_job_id() {
        let container = ServiceContainer::new();
        let activator = activator_for(&container);
        let context = JobActivatorContext::for_job::<Greeter>();

        let scope = activator.open_scope(Some(&context)).unwrap();
        assert_eq!(scope.label(), format!("job-{}", context.job_id));
        assert!(!scope.is_closed());
    }
}
