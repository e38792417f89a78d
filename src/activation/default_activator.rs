//! 默认作业激活器
//!
//! 不依赖容器，用作业类型的 [`Default`] 实现构造实例。
//! 作业类型需要先显式注册，未注册的类型解析为 `None`。

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use super::{JobActivator, JobActivatorContext, JobActivatorScope};
use crate::config::ActivatorConfig;
use crate::errors::ActivationError;
use crate::infrastructure::container::dispose::{disposer_for, Disposer, Tracked};
use crate::infrastructure::container::scope::ScopeCache;
use crate::infrastructure::container::{Dispose, Instance, ServiceKey};

#[derive(Clone, Copy)]
struct JobConstructor {
    key: ServiceKey,
    construct: fn() -> Instance,
    disposer: Option<Disposer>,
}

impl JobConstructor {
    fn build(&self) -> (Instance, Option<Tracked>) {
        let instance = (self.construct)();
        let tracked = self.disposer.map(|disposer| Tracked {
            key: self.key,
            instance: instance.clone(),
            disposer,
        });
        (instance, tracked)
    }
}

fn construct_default<T: Default + Send + Sync + 'static>() -> Instance {
    Arc::new(T::default())
}

/// 用 `Default` 构造作业的激活器
#[derive(Clone, Default)]
pub struct DefaultJobActivator {
    constructors: Arc<HashMap<TypeId, JobConstructor>>,
    config: ActivatorConfig,
    scopes_opened: Arc<AtomicU64>,
}

impl DefaultJobActivator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ActivatorConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// 注册作业类型
    pub fn register<T: Default + Send + Sync + 'static>(&mut self) -> &mut Self {
        self.insert(JobConstructor {
            key: ServiceKey::of::<T>(),
            construct: construct_default::<T>,
            disposer: None,
        })
    }

    /// 注册需要随作用域释放的作业类型
    pub fn register_disposable<T: Default + Dispose>(&mut self) -> &mut Self {
        self.insert(JobConstructor {
            key: ServiceKey::of::<T>(),
            construct: construct_default::<T>,
            disposer: Some(disposer_for::<T>()),
        })
    }

    pub fn is_registered<T: ?Sized + 'static>(&self) -> bool {
        self.constructors.contains_key(&TypeId::of::<T>())
    }

    fn insert(&mut self, constructor: JobConstructor) -> &mut Self {
        Arc::make_mut(&mut self.constructors).insert(constructor.key.type_id(), constructor);
        self
    }

    fn open_scope(&self) -> DefaultJobActivatorScope {
        let n = self.scopes_opened.fetch_add(1, Ordering::Relaxed) + 1;
        let cache = ScopeCache::new(self.config.scope_label(n));
        debug!(scope = %cache.name(), "Job scope opened");

        DefaultJobActivatorScope {
            constructors: self.constructors.clone(),
            cache,
            warn_on_implicit_close: self.config.warn_on_implicit_close,
        }
    }
}

impl JobActivator for DefaultJobActivator {
    fn activate_job(&self, job_type: ServiceKey) -> Result<Option<Instance>, ActivationError> {
        // 根级激活不跟踪实例，释放由调用方负责
        Ok(self
            .constructors
            .get(&job_type.type_id())
            .map(|constructor| (constructor.construct)()))
    }

    fn begin_scope(&self) -> Result<Box<dyn JobActivatorScope>, ActivationError> {
        Ok(Box::new(self.open_scope()))
    }

    fn begin_scope_with_context(
        &self,
        _context: &JobActivatorContext,
    ) -> Result<Box<dyn JobActivatorScope>, ActivationError> {
        Ok(Box::new(self.open_scope()))
    }
}

impl std::fmt::Debug for DefaultJobActivator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultJobActivator")
            .field("registered", &self.constructors.len())
            .field("config", &self.config)
            .finish()
    }
}

/// [`DefaultJobActivator`] 的作用域
///
/// 每次解析都构造新实例，可释放的实例在作用域释放时按 LIFO 顺序释放。
pub struct DefaultJobActivatorScope {
    constructors: Arc<HashMap<TypeId, JobConstructor>>,
    cache: ScopeCache,
    warn_on_implicit_close: bool,
}

impl DefaultJobActivatorScope {
    pub fn name(&self) -> &str {
        self.cache.name()
    }
}

impl JobActivatorScope for DefaultJobActivatorScope {
    fn resolve(&self, job_type: ServiceKey) -> Result<Option<Instance>, ActivationError> {
        self.cache
            .ensure_active("resolve")
            .map_err(ActivationError::Resolution)?;

        let Some(constructor) = self.constructors.get(&job_type.type_id()) else {
            return Ok(None);
        };
        let (instance, tracked) = constructor.build();
        if let Some(tracked) = tracked {
            self.cache
                .track(tracked)
                .map_err(ActivationError::Resolution)?;
        }
        Ok(Some(instance))
    }

    fn dispose_scope(&mut self) -> Result<(), ActivationError> {
        match self.cache.end() {
            Some(teardown) => teardown.into_result().map_err(ActivationError::Disposal),
            None => Ok(()),
        }
    }
}

impl Drop for DefaultJobActivatorScope {
    fn drop(&mut self) {
        if !self.cache.is_active() {
            return;
        }
        if self.warn_on_implicit_close {
            warn!(
                scope = %self.cache.name(),
                "Job scope was not disposed explicitly, closing on drop"
            );
        }
        if let Some(teardown) = self.cache.end() {
            if let Err(e) = teardown.into_result() {
                warn!(scope = %self.cache.name(), error = %e, "Failed to close job scope on drop");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::container::{BoxError, ContainerError};
    use std::sync::atomic::AtomicUsize;

    static CLEANUPS: AtomicUsize = AtomicUsize::new(0);

    #[derive(Default)]
    struct CleanupJob;

    impl Dispose for CleanupJob {
        fn dispose(&self) -> Result<(), BoxError> {
            CLEANUPS.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Default)]
    struct PlainJob {
        runs: u32,
    }

    struct Unregistered;

    #[test]
    fn test_registered_types_only() {
        let mut activator = DefaultJobActivator::new();
        activator.register::<PlainJob>();

        let job = (&activator as &dyn JobActivator)
            .activate::<PlainJob>()
            .unwrap()
            .unwrap();
        assert_eq!(job.runs, 0);
        assert!(activator.is_registered::<PlainJob>());
        assert!(activator
            .activate_job(ServiceKey::of::<Unregistered>())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_scope_disposes_created_jobs() {
        let mut activator = DefaultJobActivator::new();
        activator.register_disposable::<CleanupJob>();

        let before = CLEANUPS.load(Ordering::SeqCst);
        let mut scope = activator.begin_scope().unwrap();
        let a = scope.resolve(ServiceKey::of::<CleanupJob>()).unwrap().unwrap();
        let b = scope.resolve(ServiceKey::of::<CleanupJob>()).unwrap().unwrap();
        assert!(!Arc::ptr_eq(&a, &b));

        scope.dispose_scope().unwrap();
        scope.dispose_scope().unwrap();
        assert_eq!(CLEANUPS.load(Ordering::SeqCst) - before, 2);

        let err = scope.resolve(ServiceKey::of::<CleanupJob>()).unwrap_err();
        assert!(matches!(
            err,
            ActivationError::Resolution(ContainerError::ScopeEnded { .. })
        ));
    }

    #[test]
    fn test_scopes_are_labelled_with_prefix() {
        let mut config = ActivatorConfig::default();
        config.scope_name_prefix = "worker".to_string();
        let activator = DefaultJobActivator::with_config(config);

        let first = activator.open_scope();
        let second = activator.open_scope();
        assert_eq!(first.name(), "worker-1");
        assert_eq!(second.name(), "worker-2");
    }
}
