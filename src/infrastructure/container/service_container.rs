//! 服务容器实现
//!
//! 注册表与单例缓存使用 `DashMap`，单例创建以每个类型一把锁保证只创建一次。
//! 作用域实例由 [`ServiceScope`] 持有，根容器自身也有一个根作用域，
//! 用于在不开启作用域校验时承载从根解析的作用域服务。

use std::any::TypeId;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, trace};

use super::dispose::{disposer_for, Disposer, Dispose, Tracked};
use super::error::{ContainerError, DisposalFailure};
use super::scope::{ScopeCache, ServiceScope};
use super::{downcast_instance, Instance, ServiceKey, ServiceLifetime};

type Factory = dyn Fn(&Resolver<'_>) -> Result<Instance, ContainerError> + Send + Sync;

/// 服务注册信息
struct Registration {
    key: ServiceKey,
    lifetime: ServiceLifetime,
    factory: Box<Factory>,
    disposer: Option<Disposer>,
}

/// 容器选项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerOptions {
    /// 禁止从根容器解析作用域服务
    pub validate_scopes: bool,
    /// 根作用域名称（用于日志与错误信息）
    pub root_scope_name: String,
}

impl Default for ContainerOptions {
    fn default() -> Self {
        Self {
            validate_scopes: false,
            root_scope_name: "root".to_string(),
        }
    }
}

/// 内部容器统计信息（原子计数器）
#[derive(Default)]
struct InnerStats {
    total_resolutions: AtomicU64,
    singleton_cache_hits: AtomicU64,
    singleton_cache_misses: AtomicU64,
    scoped_creations: AtomicU64,
    transient_creations: AtomicU64,
    scopes_created: AtomicU64,
    scopes_closed: AtomicU64,
    instances_disposed: AtomicU64,
}

/// 容器统计信息
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainerStats {
    /// 总解析次数（包括依赖的嵌套解析）
    pub total_resolutions: u64,
    pub singleton_cache_hits: u64,
    pub singleton_cache_misses: u64,
    pub scoped_creations: u64,
    pub transient_creations: u64,
    pub scopes_created: u64,
    pub scopes_closed: u64,
    /// 作用域关闭时成功释放的实例数量
    pub instances_disposed: u64,
    pub registered_services: usize,
    pub active_singletons: usize,
}

impl ContainerStats {
    /// 单例缓存命中率（0.0 - 1.0）
    pub fn hit_rate(&self) -> f64 {
        let total = self.singleton_cache_hits + self.singleton_cache_misses;
        if total == 0 {
            0.0
        } else {
            self.singleton_cache_hits as f64 / total as f64
        }
    }

    /// 尚未关闭的作用域数量
    pub fn active_scopes(&self) -> u64 {
        self.scopes_created.saturating_sub(self.scopes_closed)
    }

    pub fn performance_summary(&self) -> String {
        format!(
            "Container Performance: {} total resolutions, {:.1}% cache hit rate, {} registered services, {} active singletons, {} active scopes",
            self.total_resolutions,
            self.hit_rate() * 100.0,
            self.registered_services,
            self.active_singletons,
            self.active_scopes()
        )
    }
}

struct ContainerInner {
    options: ContainerOptions,
    registrations: DashMap<TypeId, Arc<Registration>>,
    /// 单例实例缓存，每个类型一把创建锁
    singletons: DashMap<TypeId, Arc<Mutex<Option<Instance>>>>,
    singleton_disposables: Mutex<Vec<Tracked>>,
    root_scope: Arc<ScopeCache>,
    stats: InnerStats,
    disposed: AtomicBool,
}

/// 依赖注入容器
#[derive(Clone)]
pub struct ServiceContainer {
    inner: Arc<ContainerInner>,
}

impl ServiceContainer {
    /// 创建新的容器实例
    pub fn new() -> Self {
        Self::with_options(ContainerOptions::default())
    }

    pub fn with_options(options: ContainerOptions) -> Self {
        let root_scope = Arc::new(ScopeCache::new(options.root_scope_name.clone()));
        Self {
            inner: Arc::new(ContainerInner {
                options,
                registrations: DashMap::new(),
                singletons: DashMap::new(),
                singleton_disposables: Mutex::new(Vec::new()),
                root_scope,
                stats: InnerStats::default(),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    pub fn options(&self) -> &ContainerOptions {
        &self.inner.options
    }

    /// 注册服务。同一类型重复注册时以最后一次为准。
    pub fn register<T, F>(&self, lifetime: ServiceLifetime, factory: F)
    where
        T: Send + Sync + 'static,
        F: Fn(&Resolver<'_>) -> Result<T, ContainerError> + Send + Sync + 'static,
    {
        self.insert_registration(ServiceKey::of::<T>(), lifetime, erase(factory), None);
    }

    /// 注册需要随作用域释放的服务
    pub fn register_disposable<T, F>(&self, lifetime: ServiceLifetime, factory: F)
    where
        T: Dispose,
        F: Fn(&Resolver<'_>) -> Result<T, ContainerError> + Send + Sync + 'static,
    {
        self.insert_registration(
            ServiceKey::of::<T>(),
            lifetime,
            erase(factory),
            Some(disposer_for::<T>()),
        );
    }

    pub fn register_singleton<T, F>(&self, factory: F)
    where
        T: Send + Sync + 'static,
        F: Fn(&Resolver<'_>) -> Result<T, ContainerError> + Send + Sync + 'static,
    {
        self.register(ServiceLifetime::Singleton, factory);
    }

    pub fn register_scoped<T, F>(&self, factory: F)
    where
        T: Send + Sync + 'static,
        F: Fn(&Resolver<'_>) -> Result<T, ContainerError> + Send + Sync + 'static,
    {
        self.register(ServiceLifetime::Scoped, factory);
    }

    pub fn register_transient<T, F>(&self, factory: F)
    where
        T: Send + Sync + 'static,
        F: Fn(&Resolver<'_>) -> Result<T, ContainerError> + Send + Sync + 'static,
    {
        self.register(ServiceLifetime::Transient, factory);
    }

    /// 注册一个已经构造好的单例。该实例由调用方拥有，容器不会释放它。
    pub fn register_instance<T: Send + Sync + 'static>(&self, instance: T) {
        let instance: Instance = Arc::new(instance);
        self.insert_registration(
            ServiceKey::of::<T>(),
            ServiceLifetime::Singleton,
            Box::new(move |_: &Resolver<'_>| -> Result<Instance, ContainerError> {
                Ok(instance.clone())
            }),
            None,
        );
    }

    fn insert_registration(
        &self,
        key: ServiceKey,
        lifetime: ServiceLifetime,
        factory: Box<Factory>,
        disposer: Option<Disposer>,
    ) {
        debug!(
            service = key.type_name(),
            ?lifetime,
            disposable = disposer.is_some(),
            "Service registered"
        );
        self.inner.registrations.insert(
            key.type_id(),
            Arc::new(Registration {
                key,
                lifetime,
                factory,
                disposer,
            }),
        );
        self.inner.singletons.remove(&key.type_id());
    }

    /// 检查服务是否已注册
    pub fn is_registered<T: ?Sized + 'static>(&self) -> bool {
        self.inner.registrations.contains_key(&TypeId::of::<T>())
    }

    pub fn registered_count(&self) -> usize {
        self.inner.registrations.len()
    }

    /// 在根容器上解析服务；未注册时返回 `Ok(None)`
    pub fn resolve_key(&self, key: ServiceKey) -> Result<Option<Instance>, ContainerError> {
        Resolver::root(self).resolve_key(key)
    }

    pub fn resolve<T: Send + Sync + 'static>(&self) -> Result<Option<Arc<T>>, ContainerError> {
        self.resolve_key(ServiceKey::of::<T>())?
            .map(downcast_instance::<T>)
            .transpose()
    }

    pub fn resolve_required<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, ContainerError> {
        self.resolve::<T>()?.ok_or(ContainerError::ServiceNotRegistered {
            service: std::any::type_name::<T>(),
        })
    }

    /// 创建新的子作用域，按创建顺序命名为 `scope-N`
    pub fn create_scope(&self) -> Result<ServiceScope, ContainerError> {
        self.open_scope(None)
    }

    /// 创建指定名称的子作用域
    pub fn begin_scope(&self, name: impl Into<String>) -> Result<ServiceScope, ContainerError> {
        self.open_scope(Some(name.into()))
    }

    fn open_scope(&self, name: Option<String>) -> Result<ServiceScope, ContainerError> {
        self.ensure_not_disposed()?;
        let sequence = self.inner.stats.scopes_created.fetch_add(1, Ordering::Relaxed) + 1;
        let name = name.unwrap_or_else(|| format!("scope-{}", sequence));
        let cache = Arc::new(ScopeCache::new(name));
        debug!(scope = %cache.name(), scope_id = %cache.id(), "Scope created");
        Ok(ServiceScope::new(self.clone(), cache))
    }

    /// 获取容器统计信息
    pub fn get_stats(&self) -> ContainerStats {
        let stats = &self.inner.stats;
        let active_singletons = self
            .inner
            .singletons
            .iter()
            .filter(|entry| entry.value().try_lock().map_or(false, |slot| slot.is_some()))
            .count();
        ContainerStats {
            total_resolutions: stats.total_resolutions.load(Ordering::Relaxed),
            singleton_cache_hits: stats.singleton_cache_hits.load(Ordering::Relaxed),
            singleton_cache_misses: stats.singleton_cache_misses.load(Ordering::Relaxed),
            scoped_creations: stats.scoped_creations.load(Ordering::Relaxed),
            transient_creations: stats.transient_creations.load(Ordering::Relaxed),
            scopes_created: stats.scopes_created.load(Ordering::Relaxed),
            scopes_closed: stats.scopes_closed.load(Ordering::Relaxed),
            instances_disposed: stats.instances_disposed.load(Ordering::Relaxed),
            registered_services: self.inner.registrations.len(),
            active_singletons,
        }
    }

    /// 重置统计信息（注册数量与活跃单例数量是实时计算的，不受影响）
    pub fn reset_stats(&self) {
        let stats = &self.inner.stats;
        for counter in [
            &stats.total_resolutions,
            &stats.singleton_cache_hits,
            &stats.singleton_cache_misses,
            &stats.scoped_creations,
            &stats.transient_creations,
            &stats.scopes_created,
            &stats.scopes_closed,
            &stats.instances_disposed,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    /// 释放容器：根作用域中的实例与可释放的单例。
    ///
    /// 用于进程退出；作业作用域的关闭不会触发它。重复调用是安全的。
    pub fn dispose(&self) -> Result<(), ContainerError> {
        if self.inner.disposed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let mut failures: Vec<DisposalFailure> = Vec::new();
        if let Some(teardown) = self.inner.root_scope.end() {
            // 根作用域不计入 scopes_created，这里只累计释放数量
            self.inner
                .stats
                .instances_disposed
                .fetch_add(teardown.disposed as u64, Ordering::Relaxed);
            failures.extend(teardown.failures);
        }

        let singletons = std::mem::take(&mut *self.inner.singleton_disposables.lock());
        for entry in singletons.iter().rev() {
            if let Err(e) = entry.dispose() {
                failures.push(DisposalFailure {
                    service: entry.key.type_name(),
                    reason: e.to_string(),
                });
            }
        }
        self.inner.singletons.clear();
        debug!(
            singletons = singletons.len(),
            failed = failures.len(),
            "Container disposed"
        );

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ContainerError::DisposalFailed {
                scope_name: self.inner.options.root_scope_name.clone(),
                failures,
            })
        }
    }

    fn ensure_not_disposed(&self) -> Result<(), ContainerError> {
        if self.is_disposed() {
            Err(ContainerError::ContainerDisposed)
        } else {
            Ok(())
        }
    }

    pub(crate) fn record_scope_closed(&self, disposed: usize) {
        let stats = &self.inner.stats;
        stats.scopes_closed.fetch_add(1, Ordering::Relaxed);
        stats
            .instances_disposed
            .fetch_add(disposed as u64, Ordering::Relaxed);
    }

    fn registration(&self, key: &ServiceKey) -> Option<Arc<Registration>> {
        self.inner
            .registrations
            .get(&key.type_id())
            .map(|entry| entry.value().clone())
    }

    /// 解析单例服务。单例总是在根上下文中创建，其依赖不会被任何作业作用域跟踪。
    fn resolve_singleton(
        &self,
        registration: &Registration,
        chain: &[ServiceKey],
    ) -> Result<Instance, ContainerError> {
        let type_id = registration.key.type_id();
        let cell = self
            .inner
            .singletons
            .entry(type_id)
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone();

        let mut slot = cell.lock();
        if let Some(instance) = slot.as_ref() {
            self.inner
                .stats
                .singleton_cache_hits
                .fetch_add(1, Ordering::Relaxed);
            return Ok(instance.clone());
        }
        self.inner
            .stats
            .singleton_cache_misses
            .fetch_add(1, Ordering::Relaxed);

        let resolver = Resolver {
            container: self,
            scope: &self.inner.root_scope,
            is_root: true,
            chain: chain.to_vec(),
        };
        let instance = resolver.create(registration)?;
        if let Some(disposer) = registration.disposer {
            self.inner.singleton_disposables.lock().push(Tracked {
                key: registration.key,
                instance: instance.clone(),
                disposer,
            });
        }
        *slot = Some(instance.clone());
        Ok(instance)
    }
}

impl Default for ServiceContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ServiceContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContainer")
            .field("registrations", &self.inner.registrations.len())
            .field("options", &self.inner.options)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

fn erase<T, F>(factory: F) -> Box<Factory>
where
    T: Send + Sync + 'static,
    F: Fn(&Resolver<'_>) -> Result<T, ContainerError> + Send + Sync + 'static,
{
    Box::new(move |resolver: &Resolver<'_>| -> Result<Instance, ContainerError> {
        let service = factory(resolver)?;
        Ok(Arc::new(service) as Instance)
    })
}

/// 解析上下文
///
/// 工厂通过它解析自身依赖：依赖与被创建的服务处于同一个作用域，
/// 解析链用于检测循环依赖。
pub struct Resolver<'a> {
    container: &'a ServiceContainer,
    scope: &'a ScopeCache,
    is_root: bool,
    chain: Vec<ServiceKey>,
}

impl<'a> Resolver<'a> {
    pub(crate) fn root(container: &'a ServiceContainer) -> Self {
        Self {
            container,
            scope: &container.inner.root_scope,
            is_root: true,
            chain: Vec::new(),
        }
    }

    pub(crate) fn scoped(container: &'a ServiceContainer, scope: &'a ScopeCache) -> Self {
        Self {
            container,
            scope,
            is_root: false,
            chain: Vec::new(),
        }
    }

    /// 解析服务；未注册时返回 `Ok(None)`。容器释放后所有路径都返回 `ContainerDisposed`。
    pub fn resolve_key(&self, key: ServiceKey) -> Result<Option<Instance>, ContainerError> {
        self.container.ensure_not_disposed()?;
        self.container
            .inner
            .stats
            .total_resolutions
            .fetch_add(1, Ordering::Relaxed);

        let Some(registration) = self.container.registration(&key) else {
            trace!(service = key.type_name(), "No registration found");
            return Ok(None);
        };

        if self.chain.contains(&key) {
            let mut chain: Vec<&'static str> = self.chain.iter().map(|k| k.type_name()).collect();
            chain.push(key.type_name());
            return Err(ContainerError::CircularDependency { chain });
        }

        let instance = match registration.lifetime {
            ServiceLifetime::Singleton => {
                self.container.resolve_singleton(&registration, &self.chain)?
            }
            ServiceLifetime::Scoped => self.resolve_scoped(&registration)?,
            ServiceLifetime::Transient => self.resolve_transient(&registration)?,
        };
        Ok(Some(instance))
    }

    pub fn resolve<T: Send + Sync + 'static>(&self) -> Result<Option<Arc<T>>, ContainerError> {
        self.resolve_key(ServiceKey::of::<T>())?
            .map(downcast_instance::<T>)
            .transpose()
    }

    /// 解析必需的依赖，未注册时返回 `ServiceNotRegistered`
    pub fn resolve_required<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, ContainerError> {
        self.resolve::<T>()?.ok_or(ContainerError::ServiceNotRegistered {
            service: std::any::type_name::<T>(),
        })
    }

    fn create(&self, registration: &Registration) -> Result<Instance, ContainerError> {
        let mut chain = self.chain.clone();
        chain.push(registration.key);
        let child = Resolver {
            container: self.container,
            scope: self.scope,
            is_root: self.is_root,
            chain,
        };
        (registration.factory)(&child)
    }

    fn resolve_scoped(&self, registration: &Registration) -> Result<Instance, ContainerError> {
        if self.is_root && self.container.inner.options.validate_scopes {
            return Err(ContainerError::ScopedFromRoot {
                service: registration.key.type_name(),
            });
        }

        if let Some(existing) = self.scope.cached(&registration.key)? {
            return Ok(existing);
        }

        let instance = self.create(registration)?;
        self.container
            .inner
            .stats
            .scoped_creations
            .fetch_add(1, Ordering::Relaxed);
        let tracked = registration.disposer.map(|disposer| Tracked {
            key: registration.key,
            instance: instance.clone(),
            disposer,
        });
        self.scope.cache(registration.key, instance, tracked)
    }

    fn resolve_transient(&self, registration: &Registration) -> Result<Instance, ContainerError> {
        let instance = self.create(registration)?;
        self.container
            .inner
            .stats
            .transient_creations
            .fetch_add(1, Ordering::Relaxed);

        // 根上下文中的瞬态实例由调用方负责释放
        if !self.is_root {
            if let Some(disposer) = registration.disposer {
                self.scope.track(Tracked {
                    key: registration.key,
                    instance: instance.clone(),
                    disposer,
                })?;
            }
        }
        Ok(instance)
    }
}
