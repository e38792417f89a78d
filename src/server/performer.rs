//! 作业执行
//!
//! 一次作业执行的完整流程：开启作用域、解析作业、运行作业体、释放作用域。
//! 无论作业成功、失败还是 panic，作用域都会被释放。

use std::any::type_name;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::activation::{JobActivator, JobActivatorContext, JobActivatorScope};
use crate::errors::PerformError;
use crate::logging::OperationTimer;

/// 作业执行器
#[derive(Clone)]
pub struct JobPerformer {
    activator: Arc<dyn JobActivator>,
}

impl JobPerformer {
    pub fn new(activator: Arc<dyn JobActivator>) -> Self {
        Self { activator }
    }

    pub fn activator(&self) -> &Arc<dyn JobActivator> {
        &self.activator
    }

    /// 为作业类型 `J` 生成上下文并执行
    pub fn run<J, R, F>(&self, body: F) -> Result<R, PerformError>
    where
        J: Send + Sync + 'static,
        F: FnOnce(&J) -> anyhow::Result<R>,
    {
        self.perform::<J, R, F>(&JobActivatorContext::for_job::<J>(), body)
    }

    /// 在新的激活作用域中执行一次作业
    ///
    /// 作业体失败时优先返回作业错误，随后的释放失败只记录日志。
    pub fn perform<J, R, F>(
        &self,
        context: &JobActivatorContext,
        body: F,
    ) -> Result<R, PerformError>
    where
        J: Send + Sync + 'static,
        F: FnOnce(&J) -> anyhow::Result<R>,
    {
        let timer = OperationTimer::new("perform_job")
            .with_metadata("job_type", type_name::<J>())
            .with_metadata("job_id", context.job_id);

        let mut scope = self.activator.begin_scope_with_context(context)?;
        let outcome = Self::execute::<J, R, F>(scope.as_ref(), body);
        let disposal = scope.dispose_scope();

        match (outcome, disposal) {
            (Ok(value), Ok(())) => {
                timer.finish();
                Ok(value)
            }
            (Ok(_), Err(e)) => Err(e.into()),
            (Err(job_error), Err(disposal_error)) => {
                warn!(
                    job_id = %context.job_id,
                    error = %disposal_error,
                    "Scope disposal failed after job error"
                );
                Err(job_error)
            }
            (Err(job_error), Ok(())) => Err(job_error),
        }
    }

    fn execute<J, R, F>(scope: &dyn JobActivatorScope, body: F) -> Result<R, PerformError>
    where
        J: Send + Sync + 'static,
        F: FnOnce(&J) -> anyhow::Result<R>,
    {
        let job = scope
            .resolve_as::<J>()?
            .ok_or(PerformError::JobNotActivated(type_name::<J>()))?;
        debug!(job_type = type_name::<J>(), "Job activated");

        body(&job).map_err(|source| PerformError::JobFailed {
            job_type: type_name::<J>(),
            source,
        })
    }
}

impl std::fmt::Debug for JobPerformer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobPerformer").finish_non_exhaustive()
    }
}
