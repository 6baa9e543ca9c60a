pub mod checkpoint;
pub mod domain_config;
pub mod domain_discovery;

use std::{future::Future, sync::Arc};
use tracing::{Instrument, error, info, info_span};
use uuid::Uuid;

use crate::{
    config::{Config, MessageConfig},
    error::AppResult,
    models::{ActionReport, TaskResult},
    services::{
        ActionCompletion, ActionExecutor, DomainDirectory, ErrorClassifier, ErrorContext,
        IdgClient, Transport, error_classifier::task_failure_message,
    },
};

pub use checkpoint::{CheckpointParams, CheckpointState};
pub use domain_config::{DomainConfigParams, DomainConfigState};

/// 任务模块共享的运行时状态
#[derive(Clone)]
pub struct AppState {
    pub executor: ActionExecutor,
    pub directory: DomainDirectory,
    pub transport: Arc<dyn Transport>,
    pub messages: MessageConfig,
}

impl AppState {
    /// 使用给定传输构建（测试中传入脚本化传输）
    pub fn new(config: &Config, transport: Arc<dyn Transport>) -> Self {
        let classifier = ErrorClassifier::with_extra_conditions(&config.classifier.extra_conditions);
        Self {
            executor: ActionExecutor::new(transport.clone(), config.polling.clone(), classifier),
            directory: DomainDirectory::new(transport.clone()),
            transport,
            messages: config.messages.clone(),
        }
    }

    /// 按连接配置创建 HTTP 客户端
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let client = IdgClient::new(&config.connection)?;
        Ok(Self::new(config, Arc::new(client)))
    }

    /// 把操作结论转换为步骤结果
    pub fn report(&self, completion: ActionCompletion) -> ActionReport {
        match completion {
            ActionCompletion::Applied { msg, .. } => ActionReport::changed(msg),
            ActionCompletion::Unchanged => ActionReport::unchanged(&self.messages.immutable),
        }
    }
}

/// 在带 run_id 的 span 中执行任务，并把结果或错误合并进结果记录
///
/// 失败信息总是带上 `context` 中的模块、域、操作与期望状态。
pub async fn finish_task<F>(context: &ErrorContext, target: TaskResult, work: F) -> TaskResult
where
    F: Future<Output = AppResult<ActionReport>>,
{
    let run_id = Uuid::new_v4();
    let span = info_span!(
        "task",
        module = %context.module,
        domain = %context.domain,
        state = %context.state,
        %run_id
    );

    async move {
        info!("任务开始");
        match work.await {
            Ok(report) => {
                info!(changed = report.changed, msg = %report.msg, "任务完成");
                target.with_report(report)
            }
            Err(e) => {
                error!(error = %e, transport = e.is_transport(), "任务失败");
                target.with_failure(task_failure_message(context, &e))
            }
        }
    }
    .instrument(span)
    .await
}
