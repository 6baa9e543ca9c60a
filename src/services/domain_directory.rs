use reqwest::Method;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use crate::{
    error::{AppError, AppResult},
    models::OneOrMany,
    services::{
        idg_client::{URI_DOMAIN_LIST, URI_DOMAIN_STATUS},
        transport::Transport,
    },
};

#[derive(Debug, Deserialize)]
struct DomainListBody {
    domain: OneOrMany<DomainEntry>,
}

#[derive(Debug, Deserialize)]
struct DomainEntry {
    name: String,
}

#[derive(Debug, Deserialize)]
struct DomainStatusBody {
    #[serde(rename = "DomainStatus")]
    domain_status: OneOrMany<DomainStatusEntry>,
}

#[derive(Debug, Deserialize)]
struct DomainStatusEntry {
    #[serde(rename = "Domain")]
    domain: String,
    #[serde(rename = "SaveNeeded", default)]
    save_needed: Option<String>,
}

/// 设备上的域目录查询
#[derive(Clone)]
pub struct DomainDirectory {
    transport: Arc<dyn Transport>,
}

impl DomainDirectory {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// 已配置的域名称，保持设备返回的顺序
    pub async fn list_domains(&self) -> AppResult<Vec<String>> {
        let response = self
            .transport
            .request(Method::GET, URI_DOMAIN_LIST, None)
            .await?;

        if !response.is_ok() {
            return Err(AppError::protocol_violation(
                "default",
                "list-domains",
                response.http_status,
                format!("无法获取域列表: {}", response.body),
            ));
        }

        let body: DomainListBody = serde_json::from_value(response.body)?;
        let names: Vec<String> = body.domain.into_iter().map(|d| d.name).collect();

        debug!(count = names.len(), "已获取域列表");
        Ok(names)
    }

    /// 域不存在时返回 `PreconditionUnmet`，不向设备提交任何操作
    pub async fn ensure_exists(&self, domain: &str, state: &str) -> AppResult<()> {
        let domains = self.list_domains().await?;
        if domains.iter().any(|d| d == domain) {
            return Ok(());
        }
        Err(AppError::precondition_unmet(format!(
            "无法达到 '{}' 状态: 域 {} 不存在",
            state, domain
        )))
    }

    /// 域是否有未保存的修改；SaveNeeded 为 "off" 以外的值都视为需要保存
    pub async fn save_needed(&self, domain: &str) -> AppResult<bool> {
        let response = self
            .transport
            .request(Method::GET, URI_DOMAIN_STATUS, None)
            .await?;

        if !response.is_ok() {
            return Err(AppError::protocol_violation(
                domain,
                "domain-status",
                response.http_status,
                format!("无法获取域状态: {}", response.body),
            ));
        }

        let body: DomainStatusBody = serde_json::from_value(response.body)?;
        let entry = body
            .domain_status
            .into_iter()
            .find(|s| s.domain == domain)
            .ok_or_else(|| {
                AppError::protocol_violation(domain, "domain-status", 200, "域状态中缺少该域")
            })?;

        let save_needed = entry
            .save_needed
            .is_some_and(|v| !v.trim().eq_ignore_ascii_case("off"));

        debug!(domain, save_needed, "已获取域保存状态");
        Ok(save_needed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::transport::scripted::ScriptedTransport;
    use serde_json::json;

    fn directory(transport: ScriptedTransport) -> DomainDirectory {
        DomainDirectory::new(Arc::new(transport))
    }

    #[tokio::test]
    async fn test_single_domain_object() {
        let dir = directory(ScriptedTransport::new().on(
            Method::GET,
            URI_DOMAIN_LIST,
            200,
            json!({"domain": {"name": "default"}}),
        ));
        assert_eq!(dir.list_domains().await.unwrap(), vec!["default"]);
    }

    #[tokio::test]
    async fn test_domain_list_and_existence() {
        let dir = directory(ScriptedTransport::new().on(
            Method::GET,
            URI_DOMAIN_LIST,
            200,
            json!({"domain": [{"name": "default"}, {"name": "test"}]}),
        ));

        assert_eq!(dir.list_domains().await.unwrap(), vec!["default", "test"]);
        assert!(dir.ensure_exists("test", "present").await.is_ok());

        let err = dir.ensure_exists("prod", "present").await.unwrap_err();
        assert!(matches!(err, AppError::PreconditionUnmet(ref m) if m.contains("prod")));
    }

    #[tokio::test]
    async fn test_domain_list_failure_is_protocol_violation() {
        let dir = directory(ScriptedTransport::new().on(
            Method::GET,
            URI_DOMAIN_LIST,
            401,
            json!({"error": "Authentication failure"}),
        ));
        let err = dir.list_domains().await.unwrap_err();
        assert!(matches!(err, AppError::ProtocolViolation { status: 401, .. }));
    }

    #[tokio::test]
    async fn test_save_needed() {
        let dir = directory(ScriptedTransport::new().on(
            Method::GET,
            URI_DOMAIN_STATUS,
            200,
            json!({"DomainStatus": [
                {"Domain": "default", "SaveNeeded": "off"},
                {"Domain": "test", "SaveNeeded": "on"}
            ]}),
        ));

        assert!(dir.save_needed("test").await.unwrap());
        assert!(!dir.save_needed("default").await.unwrap());
        assert!(matches!(
            dir.save_needed("prod").await.unwrap_err(),
            AppError::ProtocolViolation { .. }
        ));
    }

    #[tokio::test]
    async fn test_save_needed_single_entry() {
        let dir = directory(ScriptedTransport::new().on(
            Method::GET,
            URI_DOMAIN_STATUS,
            200,
            json!({"DomainStatus": {"Domain": "default", "SaveNeeded": "on"}}),
        ));
        assert!(dir.save_needed("default").await.unwrap());
    }
}
