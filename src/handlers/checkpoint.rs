use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::{
    error::{AppError, AppResult},
    handlers::{AppState, finish_task},
    models::{ActionReport, ActionRequest, TaskResult},
    services::ErrorContext,
};

pub const MODULE_NAME: &str = "idg_domain_chkpoint";

/// 检查点的期望状态
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum CheckpointState {
    /// 检查点存在
    #[default]
    Present,
    /// 检查点不存在
    Absent,
    /// 域回滚到检查点
    Restored,
}

impl CheckpointState {
    pub fn as_str(self) -> &'static str {
        match self {
            CheckpointState::Present => "present",
            CheckpointState::Absent => "absent",
            CheckpointState::Restored => "restored",
        }
    }

    pub fn action_name(self) -> &'static str {
        match self {
            CheckpointState::Present => "SaveCheckpoint",
            CheckpointState::Absent => "RemoveCheckpoint",
            CheckpointState::Restored => "RollbackCheckpoint",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointParams {
    pub domain: String,
    pub name: String,
    #[serde(default)]
    pub state: CheckpointState,
}

impl CheckpointParams {
    pub fn validate(&self) -> AppResult<()> {
        if self.domain.trim().is_empty() {
            return Err(AppError::validation("domain 不能为空"));
        }
        if self.name.trim().is_empty() {
            return Err(AppError::validation("检查点名称不能为空"));
        }
        Ok(())
    }

    fn request(&self) -> ActionRequest {
        let mut parameters = Map::new();
        parameters.insert("ChkName".to_string(), JsonValue::String(self.name.clone()));
        ActionRequest::new(&self.domain, self.state.action_name(), parameters)
    }
}

/// 使检查点达到期望状态
pub async fn apply(app: &AppState, params: &CheckpointParams) -> AppResult<ActionReport> {
    params.validate()?;
    app.directory
        .ensure_exists(&params.domain, params.state.as_str())
        .await?;

    let request = params.request();
    let context = ErrorContext::for_request(MODULE_NAME, params.state.as_str(), &request)
        .with_target(&params.name);

    let completion = app.executor.run(&request, &context).await?;
    Ok(app.report(completion))
}

pub async fn run(app: &AppState, params: &CheckpointParams) -> TaskResult {
    let target = TaskResult::target(Some(params.name.as_str()), Some(params.domain.as_str()));
    let context = ErrorContext::new(
        MODULE_NAME,
        params.state.as_str(),
        &params.domain,
        params.state.action_name(),
    )
    .with_target(&params.name);
    finish_task(&context, target, apply(app, params)).await
}
