//! 作业服务器边界
//!
//! 服务器配置负责选择激活器，执行器按激活契约运行单个作业。

pub mod configuration;
pub mod performer;

pub use configuration::JobServerConfiguration;
pub use performer::JobPerformer;
