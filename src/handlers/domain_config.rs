use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue, json};
use tracing::{debug, info};

use crate::{
    error::{AppError, AppResult},
    handlers::{AppState, finish_task},
    models::{ActionReport, ActionRequest, TaskResult, on_off},
    services::{
        ActionCompletion, ErrorContext,
        action_executor::status_text,
        error_classifier::{device_error_text, hard_failure_message},
        idg_client::filestore_path,
        result_normalizer::import_sections,
    },
};

pub const MODULE_NAME: &str = "idg_domain_config";

/// 文件存储写入不经过操作队列，错误信息中以此代替操作名
const FILESTORE_ACTION: &str = "filestore";

/// 域配置的期望状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DomainConfigState {
    /// 导出域配置
    Exported,
    /// 导入域配置
    Imported,
    /// 重置域
    Reseted,
    /// 保存运行配置
    Saved,
    /// 把文件写入域的文件存储
    Stored,
}

impl DomainConfigState {
    pub fn as_str(self) -> &'static str {
        match self {
            DomainConfigState::Exported => "exported",
            DomainConfigState::Imported => "imported",
            DomainConfigState::Reseted => "reseted",
            DomainConfigState::Saved => "saved",
            DomainConfigState::Stored => "stored",
        }
    }

    /// 达到该状态所执行的设备操作
    pub fn action_name(self) -> &'static str {
        match self {
            DomainConfigState::Exported => "Export",
            DomainConfigState::Imported => "Import",
            DomainConfigState::Reseted => "ResetThisDomain",
            DomainConfigState::Saved => "SaveConfig",
            DomainConfigState::Stored => FILESTORE_ACTION,
        }
    }
}

fn default_import_format() -> String {
    "ZIP".to_string()
}

fn default_true() -> bool {
    true
}

/// 域配置任务参数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainConfigParams {
    /// 域名称
    pub name: String,
    pub state: DomainConfigState,
    /// 导出时的备注
    #[serde(default)]
    pub user_summary: Option<String>,
    #[serde(default)]
    pub all_files: bool,
    #[serde(default)]
    pub persisted: bool,
    #[serde(default = "default_true")]
    pub internal_files: bool,
    /// base64 编码的文件内容（导入或存储）
    #[serde(default)]
    pub input_file: Option<String>,
    /// 文件存储中的目标路径
    #[serde(default)]
    pub output_path: Option<String>,
    #[serde(default)]
    pub overwrite_files: bool,
    #[serde(default)]
    pub overwrite_objects: bool,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub rewrite_local_ip: bool,
    #[serde(default)]
    pub deployment_policy: Option<String>,
    #[serde(default)]
    pub deployment_policy_params: Option<String>,
    #[serde(default = "default_import_format")]
    pub import_format: String,
}

impl DomainConfigParams {
    pub fn new<N: Into<String>>(name: N, state: DomainConfigState) -> Self {
        Self {
            name: name.into(),
            state,
            user_summary: None,
            all_files: false,
            persisted: false,
            internal_files: true,
            input_file: None,
            output_path: None,
            overwrite_files: false,
            overwrite_objects: false,
            dry_run: false,
            rewrite_local_ip: false,
            deployment_policy: None,
            deployment_policy_params: None,
            import_format: default_import_format(),
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::validation("域名称不能为空"));
        }

        let has = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        match self.state {
            DomainConfigState::Imported if !has(&self.input_file) => Err(AppError::validation(
                "state 为 imported 时必须提供 input_file",
            )),
            DomainConfigState::Stored if !has(&self.input_file) || !has(&self.output_path) => {
                Err(AppError::validation(
                    "state 为 stored 时必须提供 input_file 与 output_path",
                ))
            }
            _ => Ok(()),
        }
    }

    fn export_request(&self) -> ActionRequest {
        let mut p = Map::new();
        p.insert("Format".to_string(), json!("ZIP"));
        p.insert(
            "UserComment".to_string(),
            json!(self.user_summary.clone().unwrap_or_default()),
        );
        p.insert("AllFiles".to_string(), json!(on_off(self.all_files)));
        p.insert("Persisted".to_string(), json!(on_off(self.persisted)));
        p.insert(
            "IncludeInternalFiles".to_string(),
            json!(on_off(self.internal_files)),
        );
        ActionRequest::new(&self.name, DomainConfigState::Exported.action_name(), p)
    }

    fn import_request(&self) -> ActionRequest {
        let mut p = Map::new();
        p.insert("Format".to_string(), json!(self.import_format));
        p.insert(
            "InputFile".to_string(),
            json!(self.input_file.clone().unwrap_or_default()),
        );
        p.insert("OverwriteFiles".to_string(), json!(on_off(self.overwrite_files)));
        p.insert(
            "OverwriteObjects".to_string(),
            json!(on_off(self.overwrite_objects)),
        );
        p.insert("DryRun".to_string(), json!(on_off(self.dry_run)));
        p.insert("RewriteLocalIP".to_string(), json!(on_off(self.rewrite_local_ip)));
        if let Some(policy) = &self.deployment_policy {
            p.insert("DeploymentPolicy".to_string(), json!(policy));
            p.insert(
                "DeploymentPolicyParams".to_string(),
                json!(self.deployment_policy_params),
            );
        }
        ActionRequest::new(&self.name, DomainConfigState::Imported.action_name(), p)
    }
}

/// 使域配置达到期望状态
pub async fn apply(app: &AppState, params: &DomainConfigParams) -> AppResult<ActionReport> {
    params.validate()?;
    app.directory
        .ensure_exists(&params.name, params.state.as_str())
        .await?;

    match params.state {
        DomainConfigState::Exported => export(app, params).await,
        DomainConfigState::Imported => import(app, params).await,
        DomainConfigState::Reseted => {
            let request =
                ActionRequest::without_parameters(&params.name, params.state.action_name());
            execute(app, params, &request).await.map(|(report, _)| report)
        }
        DomainConfigState::Saved => save(app, params).await,
        DomainConfigState::Stored => store(app, params).await,
    }
}

pub async fn run(app: &AppState, params: &DomainConfigParams) -> TaskResult {
    let target = TaskResult::target(Some(params.name.as_str()), None);
    let context = ErrorContext::new(
        MODULE_NAME,
        params.state.as_str(),
        &params.name,
        params.state.action_name(),
    );
    finish_task(&context, target, apply(app, params)).await
}

async fn execute(
    app: &AppState,
    params: &DomainConfigParams,
    request: &ActionRequest,
) -> AppResult<(ActionReport, Option<JsonValue>)> {
    let context = ErrorContext::for_request(MODULE_NAME, params.state.as_str(), request);
    let completion = app.executor.run(request, &context).await?;
    let detail = match &completion {
        ActionCompletion::Applied { detail, .. } => Some(detail.clone()),
        ActionCompletion::Unchanged => None,
    };
    Ok((app.report(completion), detail))
}

async fn export(app: &AppState, params: &DomainConfigParams) -> AppResult<ActionReport> {
    let (report, detail) = execute(app, params, &params.export_request()).await?;
    let file = detail
        .as_ref()
        .and_then(|d| d.pointer("/result/file"))
        .and_then(|v| v.as_str())
        .map(str::to_string);

    if let Some(file) = &file {
        info!(domain = %params.name, size = file.len(), "已获取导出文件");
    }
    Ok(report.with_file(file))
}

async fn import(app: &AppState, params: &DomainConfigParams) -> AppResult<ActionReport> {
    let (report, detail) = execute(app, params, &params.import_request()).await?;
    let import_results = detail.as_ref().and_then(|d| {
        d.pointer("/result/Import/import-results")
            .or_else(|| d.pointer("/Import/import-results"))
    });

    match import_results {
        Some(results) => Ok(report.with_results(import_sections(results))),
        None => Ok(report),
    }
}

async fn save(app: &AppState, params: &DomainConfigParams) -> AppResult<ActionReport> {
    if !app.directory.save_needed(&params.name).await? {
        debug!(domain = %params.name, "域没有未保存的修改");
        return Ok(ActionReport::unchanged(&app.messages.immutable));
    }

    let request = ActionRequest::without_parameters(&params.name, params.state.action_name());
    execute(app, params, &request).await.map(|(report, _)| report)
}

/// 文件存储写入是同步接口，不经过操作队列
async fn store(app: &AppState, params: &DomainConfigParams) -> AppResult<ActionReport> {
    let output_path = params.output_path.as_deref().unwrap_or_default();
    let file_name = output_path.rsplit('/').next().unwrap_or(output_path);
    let body = json!({
        "file": {
            "name": file_name,
            "content": params.input_file.as_deref().unwrap_or_default(),
        }
    });

    let path = filestore_path(&params.name, output_path);
    let response = app.transport.request(Method::PUT, &path, Some(&body)).await?;

    if matches!(response.http_status, 200 | 201) {
        let msg = response
            .body
            .get("result")
            .map(status_text)
            .unwrap_or_else(|| "File has been created.".to_string());
        return Ok(ActionReport::changed(msg));
    }

    let context = ErrorContext::new(
        MODULE_NAME,
        params.state.as_str(),
        &params.name,
        FILESTORE_ACTION,
    )
    .with_target(output_path);
    let raw = match response.device_error().map(device_error_text) {
        Some(text) if !text.is_empty() => text,
        _ => format!("HTTP {} {}: {}", response.http_status, response.http_reason, response.body),
    };
    Err(AppError::device_rejection(hard_failure_message(&context, &raw)))
}
