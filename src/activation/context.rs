use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::infrastructure::container::ServiceKey;

/// 作业激活上下文
///
/// 描述正在执行的作业。激活器接收它只是为了接口兼容。
#[derive(Debug, Clone)]
pub struct JobActivatorContext {
    pub job_id: Uuid,
    pub job_type: ServiceKey,
    pub created_at: DateTime<Utc>,
    pub parameters: HashMap<String, String>,
}

impl JobActivatorContext {
    pub fn new(job_type: ServiceKey) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            job_type,
            created_at: Utc::now(),
            parameters: HashMap::new(),
        }
    }

    pub fn for_job<T: ?Sized + 'static>() -> Self {
        Self::new(ServiceKey::of::<T>())
    }

    pub fn with_job_id(mut self, job_id: Uuid) -> Self {
        self.job_id = job_id;
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ReportJob;

    #[test]
    fn test_context_builder() {
        let id = Uuid::new_v4();
        let context = JobActivatorContext::for_job::<ReportJob>()
            .with_job_id(id)
            .with_parameter("tenant", "acme");

        assert_eq!(context.job_id, id);
        assert_eq!(context.job_type, ServiceKey::of::<ReportJob>());
        assert_eq!(context.parameter("tenant"), Some("acme"));
        assert_eq!(context.parameter("missing"), None);
    }
}
