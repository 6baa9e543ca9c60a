use crate::error::AppError;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// 单个步骤产生的不可变结果，最后一次性合并进 [`TaskResult`]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ActionReport {
    pub msg: String,
    pub changed: bool,
    pub results: Option<Vec<JsonValue>>,
    pub file: Option<String>,
}

impl ActionReport {
    /// 设备状态已被修改
    pub fn changed<T: Into<String>>(msg: T) -> Self {
        Self {
            msg: msg.into(),
            changed: true,
            ..Self::default()
        }
    }

    /// 设备已处于期望状态
    pub fn unchanged<T: Into<String>>(msg: T) -> Self {
        Self {
            msg: msg.into(),
            changed: false,
            ..Self::default()
        }
    }

    pub fn with_results(mut self, results: Vec<JsonValue>) -> Self {
        self.results = Some(results);
        self
    }

    pub fn with_file(mut self, file: Option<String>) -> Self {
        self.file = file;
        self
    }
}

/// 任务模块返回给调用方的结果记录
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TaskResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    pub msg: String,
    pub changed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<JsonValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domains: Option<Vec<String>>,
}

impl TaskResult {
    /// 结果记录的标识部分（名称与域）
    pub fn target(name: Option<&str>, domain: Option<&str>) -> Self {
        Self {
            name: name.map(str::to_string),
            domain: domain.map(str::to_string),
            ..Self::default()
        }
    }

    pub fn with_report(self, report: ActionReport) -> Self {
        Self {
            msg: report.msg,
            changed: report.changed,
            failed: None,
            results: report.results,
            file: report.file,
            ..self
        }
    }

    /// 失败时只保留错误信息，不携带部分结果
    pub fn with_error(self, error: &AppError) -> Self {
        self.with_failure(error.to_string())
    }

    pub fn with_failure<T: Into<String>>(self, msg: T) -> Self {
        Self {
            msg: msg.into(),
            changed: false,
            failed: Some(true),
            results: None,
            file: None,
            domains: None,
            ..self
        }
    }

    pub fn is_failed(&self) -> bool {
        self.failed.unwrap_or(false)
    }
}
