use crate::{
    error::{AppError, AppResult},
    handlers::{AppState, finish_task},
    models::{ActionReport, TaskResult},
    services::ErrorContext,
};

pub const MODULE_NAME: &str = "idg_domain_discovery";

/// 域列表总是从 default 域读取
const DISCOVERY_DOMAIN: &str = "default";

/// 列出设备上已配置的域，不修改设备
pub async fn discover(app: &AppState) -> AppResult<Vec<String>> {
    app.directory.list_domains().await
}

pub async fn run(app: &AppState) -> TaskResult {
    let mut domains = None;
    let work = async {
        let names = discover(app).await?;
        let report = ActionReport::unchanged(names.join(", "));
        domains = Some(names);
        Ok::<_, AppError>(report)
    };

    let context = ErrorContext::new(MODULE_NAME, "discovered", DISCOVERY_DOMAIN, "list-domains");
    let result = finish_task(&context, TaskResult::default(), work).await;
    TaskResult { domains, ..result }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Config,
        services::{idg_client::URI_DOMAIN_LIST, transport::scripted::ScriptedTransport},
    };
    use reqwest::Method;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_discovery_lists_domains() {
        let transport = Arc::new(ScriptedTransport::new().on(
            Method::GET,
            URI_DOMAIN_LIST,
            200,
            json!({"domain": [{"name": "default"}, {"name": "test"}]}),
        ));
        let app = AppState::new(&Config::default(), transport);

        let result = run(&app).await;

        assert!(!result.changed);
        assert!(!result.is_failed());
        assert_eq!(
            result.domains,
            Some(vec!["default".to_string(), "test".to_string()])
        );
        assert_eq!(result.msg, "default, test");
    }

    #[tokio::test]
    async fn test_discovery_failure() {
        let transport = Arc::new(ScriptedTransport::new().on(
            Method::GET,
            URI_DOMAIN_LIST,
            500,
            json!({"error": "Internal error"}),
        ));
        let app = AppState::new(&Config::default(), transport);

        let result = run(&app).await;

        assert!(result.is_failed());
        assert!(result.domains.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_device_names_the_task() {
        let transport = Arc::new(ScriptedTransport::new().unreachable(Method::GET, URI_DOMAIN_LIST));
        let app = AppState::new(&Config::default(), transport);

        let result = run(&app).await;

        assert!(result.is_failed());
        assert!(result.msg.contains(MODULE_NAME), "{}", result.msg);
        assert!(result.msg.contains("list-domains"));
        assert!(result.msg.contains("传输错误"));
    }
}
