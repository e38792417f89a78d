use std::sync::Arc;

use tracing::info;

use super::performer::JobPerformer;
use crate::activation::{ContainerJobActivator, DefaultJobActivator, JobActivator};
use crate::config::ActivatorConfig;
use crate::errors::ActivationError;
use crate::infrastructure::container::ContainerFacade;

/// 作业服务器配置
///
/// 持有当前生效的作业激活器，默认使用 [`DefaultJobActivator`]。
#[derive(Clone)]
pub struct JobServerConfiguration {
    activator: Arc<dyn JobActivator>,
    activator_config: ActivatorConfig,
}

impl JobServerConfiguration {
    pub fn new() -> Self {
        Self::with_activator_config(ActivatorConfig::default())
    }

    pub fn with_activator_config(activator_config: ActivatorConfig) -> Self {
        Self {
            activator: Arc::new(DefaultJobActivator::with_config(activator_config.clone())),
            activator_config,
        }
    }

    pub fn activator(&self) -> &Arc<dyn JobActivator> {
        &self.activator
    }

    /// 替换当前激活器
    pub fn use_activator(&mut self, activator: Arc<dyn JobActivator>) -> &mut Self {
        self.activator = activator;
        self
    }

    /// 安装基于容器的激活器。`container` 缺失时返回 `InvalidArgument`，当前激活器保持不变。
    pub fn use_service_container_activator(
        &mut self,
        container: Option<Arc<dyn ContainerFacade>>,
    ) -> Result<&mut Self, ActivationError> {
        let activator =
            ContainerJobActivator::with_config(container, self.activator_config.clone())?;
        info!("Service container job activator installed");
        Ok(self.use_activator(Arc::new(activator)))
    }

    /// 基于当前激活器创建作业执行器
    pub fn performer(&self) -> JobPerformer {
        JobPerformer::new(self.activator.clone())
    }
}

impl Default for JobServerConfiguration {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::container::{ServiceContainer, ServiceKey};

    struct ReportJob;

    #[test]
    fn test_absent_container_keeps_current_activator() {
        let mut configuration = JobServerConfiguration::new();
        let before = configuration.activator().clone();

        let result = configuration.use_service_container_activator(None);
        assert!(matches!(result, Err(ActivationError::InvalidArgument { .. })));
        assert!(Arc::ptr_eq(&before, configuration.activator()));
    }

    #[test]
    fn test_container_activator_is_installed() {
        let container = ServiceContainer::new();
        container.register_transient(|_| Ok(ReportJob));

        let mut configuration = JobServerConfiguration::new();
        // 默认激活器不认识未注册的类型
        assert!(configuration
            .activator()
            .activate_job(ServiceKey::of::<ReportJob>())
            .unwrap()
            .is_none());

        configuration
            .use_service_container_activator(Some(Arc::new(container)))
            .unwrap();
        assert!(configuration
            .activator()
            .activate_job(ServiceKey::of::<ReportJob>())
            .unwrap()
            .is_some());
    }
}
