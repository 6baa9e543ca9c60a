use reqwest::Method;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    config::PollingConfig,
    error::{AppError, AppResult},
    models::{ActionOutcome, ActionRequest, ActionResult, AsyncHandle, ExecutionStats, capitalize},
    services::{
        action_invoker::ActionInvoker,
        action_poller::ActionPoller,
        error_classifier::{Classification, ErrorClassifier, ErrorContext, device_error_text},
        transport::Transport,
    },
};

/// 操作在协议层面的最终结论
#[derive(Debug, Clone, PartialEq)]
pub enum ActionCompletion {
    /// 设备执行了操作；`msg` 为设备给出的状态文本
    Applied { msg: String, detail: JsonValue },
    /// 设备报告目标已处于期望状态
    Unchanged,
}

/// "提交 → 必要时轮询 → 获取结果 → 裁决" 的通用执行器，所有操作类型共用
#[derive(Clone)]
pub struct ActionExecutor {
    transport: Arc<dyn Transport>,
    invoker: ActionInvoker,
    poller: ActionPoller,
    classifier: ErrorClassifier,
}

impl ActionExecutor {
    pub fn new(
        transport: Arc<dyn Transport>,
        polling: PollingConfig,
        classifier: ErrorClassifier,
    ) -> Self {
        Self {
            invoker: ActionInvoker::new(transport.clone()),
            poller: ActionPoller::new(transport.clone(), polling),
            transport,
            classifier,
        }
    }

    /// 执行操作并裁决结果；超时、协议违规和真实失败都以错误返回
    pub async fn run(
        &self,
        request: &ActionRequest,
        context: &ErrorContext,
    ) -> AppResult<ActionCompletion> {
        match self.execute(request).await? {
            ActionOutcome::Completed { detail } => Ok(ActionCompletion::Applied {
                msg: completion_message(request.action_name(), &detail),
                detail,
            }),
            ActionOutcome::Failed { raw_message } => {
                match self.classifier.classify(context, &raw_message) {
                    Classification::Idempotent => Ok(ActionCompletion::Unchanged),
                    Classification::Hard(message) => Err(AppError::device_rejection(message)),
                }
            }
            ActionOutcome::TimedOut => Err(AppError::timeout(
                request.domain(),
                request.action_name(),
                self.poller.config().timeout_secs,
            )),
        }
    }

    /// 执行操作，每个请求恰好产生一个 [`ActionOutcome`]
    pub async fn execute(&self, request: &ActionRequest) -> AppResult<ActionOutcome> {
        let mut stats = ExecutionStats::start();

        let outcome = match self.invoker.invoke(request).await? {
            ActionResult::SyncOk(body) => settle(request, body),
            ActionResult::AsyncAccepted(handle) => {
                stats.asynchronous = true;
                let (outcome, polls) = self.poller.poll_with_defaults(&handle).await?;
                stats.poll_count = polls;
                match outcome {
                    ActionOutcome::Completed { .. } => {
                        let detail = self.fetch_detail(&handle).await?;
                        settle(request, detail)
                    }
                    other => other,
                }
            }
            ActionResult::Rejected {
                http_status,
                http_reason,
                body,
            } => {
                let raw_message = match body.get("error").map(device_error_text) {
                    Some(text) if !text.is_empty() => text,
                    _ => format!("HTTP {} {}: {}", http_status, http_reason, body),
                };
                ActionOutcome::Failed { raw_message }
            }
        };

        stats.finish();
        info!(
            domain = request.domain(),
            action = request.action_name(),
            asynchronous = stats.asynchronous,
            polls = stats.poll_count,
            submitted_at = %stats.submitted_at,
            finished_at = ?stats.finished_at,
            duration = ?stats.total_duration,
            completed = outcome.is_completed(),
            "操作执行结束"
        );

        Ok(outcome)
    }

    /// 终态之后再次获取完整结果
    async fn fetch_detail(&self, handle: &AsyncHandle) -> AppResult<JsonValue> {
        let response = self
            .transport
            .request(Method::GET, &handle.location, None)
            .await?;

        if !response.is_ok() {
            return Err(AppError::protocol_violation(
                &handle.domain,
                &handle.action_name,
                response.http_status,
                format!("无法获取操作结果: {}", response.body),
            ));
        }
        Ok(response.body)
    }
}

/// HTTP 成功不代表操作成功：响应体中的错误一律改判为失败
fn settle(request: &ActionRequest, detail: JsonValue) -> ActionOutcome {
    let status_is_error = detail
        .get("status")
        .and_then(|v| v.as_str())
        .is_some_and(|s| s.eq_ignore_ascii_case("error"));

    if status_is_error || detail.get("error").is_some_and(|v| !v.is_null()) {
        let raw_message = detail
            .get("error")
            .map(device_error_text)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| detail.to_string());
        return ActionOutcome::Failed { raw_message };
    }

    if let Some(code) = detected_errors(request.action_name(), &detail) {
        warn!(
            domain = request.domain(),
            action = request.action_name(),
            code = %code,
            "设备报告检测到错误"
        );
        return ActionOutcome::Failed {
            raw_message: format!("Import failed with error code: \"{}\"", code),
        };
    }

    ActionOutcome::Completed { detail }
}

/// 读取 `import-results.detected-errors`，只有 "false"、false、null 或不存在时视为无错误
fn detected_errors(action_name: &str, detail: &JsonValue) -> Option<String> {
    let pointers = [
        format!("/result/{}/import-results/detected-errors", action_name),
        format!("/{}/import-results/detected-errors", action_name),
    ];
    let value = pointers.iter().find_map(|p| detail.pointer(p))?;

    match value {
        JsonValue::Null | JsonValue::Bool(false) => None,
        JsonValue::String(s) if s.eq_ignore_ascii_case("false") => None,
        JsonValue::Object(obj) => Some(
            obj.get("error")
                .map(device_error_text)
                .unwrap_or_else(|| value.to_string()),
        ),
        other => Some(device_error_text(other)),
    }
}

/// 同步响应把结果放在操作名字段下，异步结果带 status 字段
pub fn completion_message(action_name: &str, detail: &JsonValue) -> String {
    if let Some(status) = detail.get("status").and_then(|v| v.as_str()) {
        return capitalize(status);
    }
    match detail.get(action_name) {
        Some(value) => status_text(value),
        None => "Completed".to_string(),
    }
}

/// 设备的状态字段可能是纯文本，也可能是 `{"value": "..."}`
pub fn status_text(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Object(obj) => obj
            .get("value")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| value.to_string()),
        other => other.to_string(),
    }
}
