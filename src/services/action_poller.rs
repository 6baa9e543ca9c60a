use reqwest::Method;
use std::{sync::Arc, time::Duration};
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use crate::{
    config::PollingConfig,
    error::{AppError, AppResult},
    models::{ActionOutcome, AsyncHandle},
    services::transport::Transport,
};

/// 已知的终态标签，其余非进行中的值同样视为终态，但会记录告警
const KNOWN_TERMINAL_STATES: &[&str] = &["completed", "error"];

/// 异步操作轮询器
///
/// 所有操作类型（检查点、导出、导入、重置、保存）共用同一套完成协议。
#[derive(Clone)]
pub struct ActionPoller {
    transport: Arc<dyn Transport>,
    config: PollingConfig,
}

impl ActionPoller {
    pub fn new(transport: Arc<dyn Transport>, config: PollingConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &PollingConfig {
        &self.config
    }

    /// 按配置的超时轮询
    pub async fn poll_with_defaults(&self, handle: &AsyncHandle) -> AppResult<(ActionOutcome, u32)> {
        self.poll(handle, self.config.timeout()).await
    }

    /// 轮询直到终态或超时，返回结果与轮询次数
    ///
    /// 单次请求失败（网络、TLS、请求超时）直接向上返回，不在此重试；
    /// 单次请求的超时由传输层配置控制，`overall_timeout` 只约束整个循环。
    pub async fn poll(
        &self,
        handle: &AsyncHandle,
        overall_timeout: Duration,
    ) -> AppResult<(ActionOutcome, u32)> {
        let started = Instant::now();
        let mut attempts = 0u32;

        info!(
            domain = %handle.domain,
            action = %handle.action_name,
            location = %handle.location,
            "开始轮询异步操作（超时 {:?}）",
            overall_timeout
        );

        loop {
            attempts += 1;
            let response = self
                .transport
                .request(Method::GET, &handle.location, None)
                .await?;

            if !response.is_ok() {
                return Err(AppError::protocol_violation(
                    &handle.domain,
                    &handle.action_name,
                    response.http_status,
                    format!("轮询 {} 返回非预期状态: {}", handle.location, response.body),
                ));
            }

            let status = response
                .body
                .get("status")
                .and_then(|v| v.as_str())
                .ok_or_else(|| {
                    AppError::protocol_violation(
                        &handle.domain,
                        &handle.action_name,
                        response.http_status,
                        format!("轮询响应缺少 status 字段: {}", response.body),
                    )
                })?
                .to_string();

            if !self.config.is_in_progress(&status) {
                if !KNOWN_TERMINAL_STATES
                    .iter()
                    .any(|s| s.eq_ignore_ascii_case(status.trim()))
                {
                    warn!(
                        domain = %handle.domain,
                        action = %handle.action_name,
                        status = %status,
                        "未识别的终态标签，按终态处理"
                    );
                }
                info!(
                    domain = %handle.domain,
                    action = %handle.action_name,
                    status = %status,
                    attempts,
                    "异步操作到达终态"
                );
                return Ok((
                    ActionOutcome::Completed {
                        detail: response.body,
                    },
                    attempts,
                ));
            }

            let elapsed = started.elapsed();
            if elapsed > overall_timeout {
                warn!(
                    domain = %handle.domain,
                    action = %handle.action_name,
                    attempts,
                    "轮询超时（已等待 {:?}），设备上的操作状态未知",
                    elapsed
                );
                return Ok((ActionOutcome::TimedOut, attempts));
            }

            debug!(
                domain = %handle.domain,
                action = %handle.action_name,
                status = %status,
                "操作仍在执行，第 {} 次轮询",
                attempts
            );
            sleep(self.config.interval()).await;
        }
    }
}
