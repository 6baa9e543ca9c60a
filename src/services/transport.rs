use crate::{error::AppResult, models::ActionResponse};
use reqwest::Method;
use serde_json::Value as JsonValue;

/// 设备管理接口的传输抽象
///
/// 网络、TLS、超时等无法到达设备的情况返回 `AppError::Transport`；
/// 设备正常返回的任何状态码（包括 4xx/5xx）都以 `ActionResponse` 返回。
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&JsonValue>,
    ) -> AppResult<ActionResponse>;
}
