//! 解析作用域
//!
//! 每个作用域拥有通过它创建的作用域实例和瞬态实例，
//! 关闭时按 LIFO 顺序释放其中实现了 [`Dispose`](super::Dispose) 的实例。
//! 单例实例永远不会被作用域跟踪。

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use super::dispose::Tracked;
use super::error::{ContainerError, DisposalFailure};
use super::service_container::{Resolver, ServiceContainer};
use super::{downcast_instance, Instance, ServiceKey};

/// 作用域状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeState {
    /// 作用域已激活，可以解析
    Active,
    /// 作用域已结束，不能继续使用
    Ended,
}

/// 作用域信息
#[derive(Debug, Clone)]
pub struct ScopeInfo {
    pub id: Uuid,
    pub name: String,
    pub state: ScopeState,
    pub created_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    /// 当前缓存的作用域实例数量
    pub cached_instances: usize,
    /// 当前等待释放的实例数量
    pub tracked_disposables: usize,
}

impl ScopeInfo {
    /// 作用域持续时间（未结束时返回 `None`）
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.ended_at.map(|end| end - self.created_at)
    }
}

struct ScopeInner {
    state: ScopeState,
    ended_at: Option<DateTime<Utc>>,
    instances: HashMap<TypeId, Instance>,
    tracked: Vec<Tracked>,
}

/// 作用域的共享状态：实例缓存与释放队列
pub(crate) struct ScopeCache {
    id: Uuid,
    name: String,
    created_at: DateTime<Utc>,
    inner: Mutex<ScopeInner>,
}

impl ScopeCache {
    pub(crate) fn new(name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            created_at: Utc::now(),
            inner: Mutex::new(ScopeInner {
                state: ScopeState::Active,
                ended_at: None,
                instances: HashMap::new(),
                tracked: Vec::new(),
            }),
        }
    }

    pub(crate) fn id(&self) -> Uuid {
        self.id
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn info(&self) -> ScopeInfo {
        let inner = self.inner.lock();
        ScopeInfo {
            id: self.id,
            name: self.name.clone(),
            state: inner.state,
            created_at: self.created_at,
            ended_at: inner.ended_at,
            cached_instances: inner.instances.len(),
            tracked_disposables: inner.tracked.len(),
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        self.inner.lock().state == ScopeState::Active
    }

    fn ended_error(&self, operation: &'static str) -> ContainerError {
        ContainerError::ScopeEnded {
            scope_id: self.id,
            scope_name: self.name.clone(),
            operation,
        }
    }

    pub(crate) fn ensure_active(&self, operation: &'static str) -> Result<(), ContainerError> {
        if self.is_active() {
            Ok(())
        } else {
            Err(self.ended_error(operation))
        }
    }

    /// 查找已缓存的作用域实例
    pub(crate) fn cached(&self, key: &ServiceKey) -> Result<Option<Instance>, ContainerError> {
        let inner = self.inner.lock();
        if inner.state != ScopeState::Active {
            return Err(self.ended_error("resolve"));
        }
        Ok(inner.instances.get(&key.type_id()).cloned())
    }

    /// 缓存新建的作用域实例。若已有实例则保留旧实例，新实例仍会被跟踪释放。
    pub(crate) fn cache(
        &self,
        key: ServiceKey,
        instance: Instance,
        tracked: Option<Tracked>,
    ) -> Result<Instance, ContainerError> {
        let mut inner = self.inner.lock();
        if inner.state != ScopeState::Active {
            drop(inner);
            if let Some(tracked) = tracked {
                dispose_orphan(&tracked, &self.name);
            }
            return Err(self.ended_error("resolve"));
        }
        if let Some(tracked) = tracked {
            inner.tracked.push(tracked);
        }
        let cached = inner
            .instances
            .entry(key.type_id())
            .or_insert(instance)
            .clone();
        Ok(cached)
    }

    /// 跟踪一个需要随作用域释放的实例
    pub(crate) fn track(&self, tracked: Tracked) -> Result<(), ContainerError> {
        let mut inner = self.inner.lock();
        if inner.state != ScopeState::Active {
            drop(inner);
            dispose_orphan(&tracked, &self.name);
            return Err(self.ended_error("resolve"));
        }
        inner.tracked.push(tracked);
        Ok(())
    }

    /// 结束作用域并按 LIFO 顺序释放全部跟踪实例
    ///
    /// 返回 `None` 表示作用域之前已经结束。每个实例都会被尝试释放，
    /// 单个失败不会中断后续释放。
    pub(crate) fn end(&self) -> Option<Teardown> {
        let (tracked, instances) = {
            let mut inner = self.inner.lock();
            if inner.state == ScopeState::Ended {
                return None;
            }
            inner.state = ScopeState::Ended;
            inner.ended_at = Some(Utc::now());
            (
                std::mem::take(&mut inner.tracked),
                std::mem::take(&mut inner.instances),
            )
        };

        let mut teardown = Teardown {
            scope_name: self.name.clone(),
            disposed: 0,
            failures: Vec::new(),
        };
        for entry in tracked.iter().rev() {
            match entry.dispose() {
                Ok(()) => teardown.disposed += 1,
                Err(e) => {
                    warn!(
                        scope = %self.name,
                        service = entry.key.type_name(),
                        error = %e,
                        "Failed to dispose instance"
                    );
                    teardown.failures.push(DisposalFailure {
                        service: entry.key.type_name(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        drop(instances);

        debug!(
            scope = %self.name,
            disposed = teardown.disposed,
            failed = teardown.failures.len(),
            "Scope ended"
        );
        Some(teardown)
    }
}

/// 作用域结束时的释放结果
pub(crate) struct Teardown {
    scope_name: String,
    pub disposed: usize,
    pub failures: Vec<DisposalFailure>,
}

impl Teardown {
    pub(crate) fn into_result(self) -> Result<(), ContainerError> {
        if self.failures.is_empty() {
            Ok(())
        } else {
            Err(ContainerError::DisposalFailed {
                scope_name: self.scope_name,
                failures: self.failures,
            })
        }
    }
}

fn dispose_orphan(tracked: &Tracked, scope: &str) {
    if let Err(e) = tracked.dispose() {
        warn!(
            scope,
            service = tracked.key.type_name(),
            error = %e,
            "Failed to dispose instance created after scope ended"
        );
    }
}

/// 服务作用域
///
/// 由 [`ServiceContainer::create_scope`] 创建。未显式关闭的作用域在 drop 时自动关闭。
pub struct ServiceScope {
    container: ServiceContainer,
    cache: Arc<ScopeCache>,
}

impl ServiceScope {
    pub(crate) fn new(container: ServiceContainer, cache: Arc<ScopeCache>) -> Self {
        Self { container, cache }
    }

    pub fn id(&self) -> Uuid {
        self.cache.id()
    }

    pub fn name(&self) -> &str {
        self.cache.name()
    }

    pub fn info(&self) -> ScopeInfo {
        self.cache.info()
    }

    pub fn is_active(&self) -> bool {
        self.cache.is_active()
    }

    /// 在当前作用域中解析服务；未注册时返回 `Ok(None)`
    pub fn resolve_key(&self, key: ServiceKey) -> Result<Option<Instance>, ContainerError> {
        self.cache.ensure_active("resolve")?;
        Resolver::scoped(&self.container, &self.cache).resolve_key(key)
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

    /// 关闭作用域。重复调用是安全的，第二次调用不做任何事。
    pub fn close(&self) -> Result<(), ContainerError> {
        let Some(teardown) = self.cache.end() else {
            return Ok(());
        };
        self.container.record_scope_closed(teardown.disposed);
        teardown.into_result()
    }
}

impl Drop for ServiceScope {
    fn drop(&mut self) {
        if !self.cache.is_active() {
            return;
        }
        debug!(scope = %self.cache.name(), "Scope dropped while active, closing");
        if let Err(e) = self.close() {
            warn!(scope = %self.cache.name(), error = %e, "Failed to close scope on drop");
        }
    }
}

impl std::fmt::Debug for ServiceScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceScope")
            .field("id", &self.cache.id())
            .field("name", &self.cache.name())
            .finish()
    }
}
