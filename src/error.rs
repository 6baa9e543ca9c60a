use thiserror::Error;

/// 应用程序错误类型
#[derive(Error, Debug)]
pub enum AppError {
    /// 无法到达设备（连接、TLS、超时），与设备返回的错误响应区分开
    #[error("传输错误: {0}")]
    Transport(#[from] reqwest::Error),

    /// 设备违反了自身的接口约定（例如 202 但缺少 location）
    #[error("协议违规: 域 {domain} 的操作 {action} (HTTP {status}): {detail}")]
    ProtocolViolation {
        domain: String,
        action: String,
        status: u16,
        detail: String,
    },

    #[error("设备拒绝操作: {message}")]
    DeviceRejection { message: String },

    /// 轮询超出预算，设备上的操作状态未知
    #[error("等待域 {domain} 的操作 {action} 超时（{elapsed_secs} 秒），设备上的状态未知")]
    Timeout {
        domain: String,
        action: String,
        elapsed_secs: u64,
    },

    #[error("前置条件不满足: {0}")]
    PreconditionUnmet(String),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("配置错误: {0}")]
    Config(String),

    #[error("验证错误: {0}")]
    Validation(String),

    #[error("内部错误: {0}")]
    Internal(#[from] anyhow::Error),
}

/// 应用程序Result类型别名
pub type AppResult<T> = Result<T, AppError>;

/// 错误构造辅助函数
impl AppError {
    pub fn validation<T: Into<String>>(msg: T) -> Self {
        Self::Validation(msg.into())
    }

    pub fn config<T: Into<String>>(msg: T) -> Self {
        Self::Config(msg.into())
    }

    pub fn protocol_violation<D, A, M>(domain: D, action: A, status: u16, detail: M) -> Self
    where
        D: Into<String>,
        A: Into<String>,
        M: Into<String>,
    {
        Self::ProtocolViolation {
            domain: domain.into(),
            action: action.into(),
            status,
            detail: detail.into(),
        }
    }

    pub fn device_rejection<T: Into<String>>(message: T) -> Self {
        Self::DeviceRejection {
            message: message.into(),
        }
    }

    pub fn timeout<D: Into<String>, A: Into<String>>(domain: D, action: A, elapsed_secs: u64) -> Self {
        Self::Timeout {
            domain: domain.into(),
            action: action.into(),
            elapsed_secs,
        }
    }

    pub fn precondition_unmet<T: Into<String>>(msg: T) -> Self {
        Self::PreconditionUnmet(msg.into())
    }

    pub fn internal<T: Into<String>>(msg: T) -> Self {
        Self::Internal(anyhow::anyhow!(msg.into()))
    }

    /// 是否为传输层错误（网络、TLS、请求超时）
    pub fn is_transport(&self) -> bool {
        matches!(self, AppError::Transport(_))
    }

    /// 错误信息本身已包含模块、域、操作与期望状态
    pub fn names_task(&self) -> bool {
        matches!(self, AppError::DeviceRejection { .. })
    }
}
