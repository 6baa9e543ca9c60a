use reqwest::Method;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{
    error::{AppError, AppResult},
    models::{ActionRequest, ActionResult, AsyncHandle},
    services::{idg_client::action_queue_path, transport::Transport},
};

/// 向域的操作队列提交操作，并对即时响应分类
///
/// 不做任何重试：拒绝只报告一次。
#[derive(Clone)]
pub struct ActionInvoker {
    transport: Arc<dyn Transport>,
}

impl ActionInvoker {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub async fn invoke(&self, request: &ActionRequest) -> AppResult<ActionResult> {
        let path = action_queue_path(request.domain());
        debug!(
            domain = request.domain(),
            action = request.action_name(),
            "提交操作到 {}",
            path
        );

        let response = self
            .transport
            .request(Method::POST, &path, Some(&request.payload()))
            .await?;

        match response.http_status {
            200 => {
                info!(
                    domain = request.domain(),
                    action = request.action_name(),
                    "操作已同步完成"
                );
                Ok(ActionResult::SyncOk(response.body))
            }
            202 => {
                let handle = AsyncHandle::from_response(request, &response).ok_or_else(|| {
                    AppError::protocol_violation(
                        request.domain(),
                        request.action_name(),
                        response.http_status,
                        format!("202 响应缺少 _links.location.href: {}", response.body),
                    )
                })?;
                info!(
                    domain = request.domain(),
                    action = request.action_name(),
                    location = %handle.location,
                    "操作已被设备接受，进入异步执行"
                );
                Ok(ActionResult::AsyncAccepted(handle))
            }
            status => {
                warn!(
                    domain = request.domain(),
                    action = request.action_name(),
                    status,
                    reason = %response.http_reason,
                    "设备拒绝操作"
                );
                Ok(ActionResult::Rejected {
                    http_status: status,
                    http_reason: response.http_reason,
                    body: response.body,
                })
            }
        }
    }
}
