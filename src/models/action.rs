use chrono::{DateTime, Utc};
use serde_json::{Map, Value as JsonValue};
use std::time::Duration;

/// 提交到设备操作队列的一次操作请求
///
/// 序列化为 `{"<ActionName>": {<parameters>}}`，构造后不可修改。
#[derive(Debug, Clone, PartialEq)]
pub struct ActionRequest {
    domain: String,
    action_name: String,
    parameters: Map<String, JsonValue>,
}

impl ActionRequest {
    pub fn new<D: Into<String>, A: Into<String>>(
        domain: D,
        action_name: A,
        parameters: Map<String, JsonValue>,
    ) -> Self {
        Self {
            domain: domain.into(),
            action_name: action_name.into(),
            parameters,
        }
    }

    /// 无参数的操作（如 ResetThisDomain、SaveConfig）
    pub fn without_parameters<D: Into<String>, A: Into<String>>(domain: D, action_name: A) -> Self {
        Self::new(domain, action_name, Map::new())
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn action_name(&self) -> &str {
        &self.action_name
    }

    /// 请求体
    pub fn payload(&self) -> JsonValue {
        let mut body = Map::new();
        body.insert(
            self.action_name.clone(),
            JsonValue::Object(self.parameters.clone()),
        );
        JsonValue::Object(body)
    }
}

/// 传输层返回的原始响应
#[derive(Debug, Clone, PartialEq)]
pub struct ActionResponse {
    pub http_status: u16,
    pub http_reason: String,
    pub body: JsonValue,
}

impl ActionResponse {
    pub fn is_ok(&self) -> bool {
        self.http_status == 200
    }

    /// 设备在响应体中报告的错误（`error` 字段）
    pub fn device_error(&self) -> Option<&JsonValue> {
        self.body.get("error").filter(|v| !v.is_null())
    }
}

/// 异步操作句柄，保存设备返回的轮询地址
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsyncHandle {
    pub location: String,
    pub domain: String,
    pub action_name: String,
}

impl AsyncHandle {
    /// 从 202 响应中提取 `_links.location.href`
    pub fn from_response(request: &ActionRequest, response: &ActionResponse) -> Option<Self> {
        let href = response
            .body
            .pointer("/_links/location/href")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())?;

        Some(Self {
            location: href.to_string(),
            domain: request.domain().to_string(),
            action_name: request.action_name().to_string(),
        })
    }
}

/// 提交后的即时分类结果
#[derive(Debug, Clone, PartialEq)]
pub enum ActionResult {
    /// 200，结果已内联在响应中
    SyncOk(JsonValue),
    /// 202，需要轮询
    AsyncAccepted(AsyncHandle),
    /// 其他状态码，由调用方交给错误分类器裁决
    Rejected {
        http_status: u16,
        http_reason: String,
        body: JsonValue,
    },
}

/// 一次操作的最终结果，每个请求恰好产生一个
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    Completed { detail: JsonValue },
    Failed { raw_message: String },
    TimedOut,
}

impl ActionOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, ActionOutcome::Completed { .. })
    }
}

/// 操作执行统计，执行结束时写入日志
#[derive(Debug, Clone)]
pub struct ExecutionStats {
    pub submitted_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub asynchronous: bool,
    pub poll_count: u32,
    pub total_duration: Option<Duration>,
}

impl ExecutionStats {
    pub fn start() -> Self {
        Self {
            submitted_at: Utc::now(),
            finished_at: None,
            asynchronous: false,
            poll_count: 0,
            total_duration: None,
        }
    }

    pub fn finish(&mut self) {
        let end_time = Utc::now();
        let elapsed = end_time.signed_duration_since(self.submitted_at);
        self.finished_at = Some(end_time);
        self.total_duration = Some(Duration::from_millis(
            elapsed.num_milliseconds().max(0) as u64,
        ));
    }
}
