use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum SimError {
    #[error("配置错误: {0}")]
    Configuration(String),
    #[error("负载定义无效: {0}")]
    InvalidWorkload(String),
    #[error("主机已经启动: id={id}")]
    HostAlreadyStarted { id: u32 },
}

pub type SimResult<T> = Result<T, SimError>;

impl SimError {
    pub fn config_error<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }
    pub fn invalid_workload<S: Into<String>>(msg: S) -> Self {
        Self::InvalidWorkload(msg.into())
    }
    pub fn host_already_started(id: u32) -> Self {
        Self::HostAlreadyStarted { id }
    }
}
