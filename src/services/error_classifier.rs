use serde_json::Value as JsonValue;
use tracing::{info, warn};

use crate::{config::IdempotentCondition, error::AppError, models::ActionRequest};

/// 目标名称在提示语模板中的占位符
pub const TARGET_PLACEHOLDER: &str = "{name}";

/// 设备内置的、表示"已处于期望状态"的提示语
///
/// 依赖设备原文做子串匹配：固件版本或本地化导致措辞变化时不会命中，
/// 此时按真实失败上报，可通过配置 `classifier.extra_conditions` 补充。
const BUILTIN_CONDITIONS: &[(&str, &str)] = &[
    (
        "SaveCheckpoint",
        "Configuration Checkpoint '{name}' already exists.",
    ),
    (
        "RemoveCheckpoint",
        "Cannot find Configuration Checkpoint '{name}'.",
    ),
];

/// 错误裁决结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// 设备状态已满足要求，按"成功但未修改"处理
    Idempotent,
    /// 真实失败，附带面向用户的错误信息
    Hard(String),
}

/// 生成错误信息所需的上下文
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    pub module: String,
    pub state: String,
    pub domain: String,
    pub action: String,
    /// 操作目标（如检查点名称）
    pub target: Option<String>,
}

impl ErrorContext {
    pub fn new(module: &str, state: &str, domain: &str, action: &str) -> Self {
        Self {
            module: module.to_string(),
            state: state.to_string(),
            domain: domain.to_string(),
            action: action.to_string(),
            target: None,
        }
    }

    pub fn for_request(module: &str, state: &str, request: &ActionRequest) -> Self {
        Self::new(module, state, request.domain(), request.action_name())
    }

    pub fn with_target<T: Into<String>>(mut self, target: T) -> Self {
        self.target = Some(target.into());
        self
    }
}

/// 设备错误分类器
#[derive(Debug, Clone)]
pub struct ErrorClassifier {
    conditions: Vec<IdempotentCondition>,
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self {
            conditions: BUILTIN_CONDITIONS
                .iter()
                .map(|(action, template)| IdempotentCondition {
                    action: (*action).to_string(),
                    template: (*template).to_string(),
                })
                .collect(),
        }
    }
}

impl ErrorClassifier {
    /// 内置提示语加上配置中的补充提示语
    pub fn with_extra_conditions(extra: &[IdempotentCondition]) -> Self {
        let mut classifier = Self::default();
        classifier.conditions.extend(extra.iter().cloned());
        classifier
    }

    pub fn classify(&self, context: &ErrorContext, raw_error: &str) -> Classification {
        let hit = self
            .conditions
            .iter()
            .filter(|c| c.action == context.action)
            .filter_map(|c| expand_template(&c.template, context.target.as_deref()))
            .find(|phrase| raw_error.contains(phrase.as_str()));

        if let Some(phrase) = hit {
            info!(
                domain = %context.domain,
                action = %context.action,
                phrase = %phrase,
                "设备报告目标已处于期望状态"
            );
            return Classification::Idempotent;
        }

        warn!(
            domain = %context.domain,
            action = %context.action,
            "设备报告操作失败: {}",
            raw_error
        );
        Classification::Hard(hard_failure_message(context, raw_error))
    }
}

/// 把目标名称代入模板；模板需要名称但没有提供时不参与匹配
fn expand_template(template: &str, target: Option<&str>) -> Option<String> {
    if !template.contains(TARGET_PLACEHOLDER) {
        return Some(template.to_string());
    }
    target.map(|name| template.replace(TARGET_PLACEHOLDER, name))
}

/// 面向运维人员的错误信息：模块、期望状态、域、操作以及设备原始错误
pub fn hard_failure_message(context: &ErrorContext, raw_error: &str) -> String {
    format!(
        "模块 {} 在域 {} 上执行 {} 以达到 '{}' 状态时失败，设备返回: {}",
        context.module, context.domain, context.action, context.state, raw_error
    )
}

/// 任务失败时写入结果记录的信息
///
/// 传输、序列化等错误本身不知道是哪个任务在执行，这里补上任务上下文；
/// 已经由 [`hard_failure_message`] 生成的设备拒绝信息原样保留。
pub fn task_failure_message(context: &ErrorContext, error: &AppError) -> String {
    if error.names_task() {
        return error.to_string();
    }
    let action = match &context.target {
        Some(target) => format!("{} ({})", context.action, target),
        None => context.action.clone(),
    };
    format!(
        "模块 {} 在域 {} 上执行 {} 以达到 '{}' 状态时失败: {}",
        context.module, context.domain, action, context.state, error
    )
}

/// 把设备的 error 字段（字符串、字符串数组或对象）展平为可读文本
pub fn device_error_text(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Array(items) => items
            .iter()
            .map(device_error_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" | "),
        JsonValue::Object(obj) => obj
            .iter()
            .map(|(k, v)| format!("{}: {}", k, device_error_text(v)))
            .collect::<Vec<_>>()
            .join(", "),
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}
