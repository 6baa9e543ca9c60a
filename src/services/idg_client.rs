use reqwest::{
    Client, Method,
    header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue},
};
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::{
    config::IdgConnectionConfig,
    error::{AppError, AppResult},
    models::ActionResponse,
    services::transport::Transport,
};

/// 域配置列表
pub const URI_DOMAIN_LIST: &str = "/mgmt/domains/config/";
/// 所有域的状态（含 SaveNeeded）
pub const URI_DOMAIN_STATUS: &str = "/mgmt/status/default/DomainStatus";

/// 域的操作队列
pub fn action_queue_path(domain: &str) -> String {
    format!("/mgmt/actionqueue/{}", domain)
}

/// 域文件存储中的文件路径，空格编码为 %20
pub fn filestore_path(domain: &str, file_path: &str) -> String {
    let file_path = file_path.trim_start_matches('/').replace(' ', "%20");
    format!("/mgmt/filestore/{}/{}", domain, file_path)
}

/// IDG REST 管理接口客户端
#[derive(Debug, Clone)]
pub struct IdgClient {
    http: Client,
    base_url: String,
    user: String,
    password: String,
}

impl IdgClient {
    pub fn new(cfg: &IdgConnectionConfig) -> AppResult<Self> {
        Self::new_with_base_url(cfg, cfg.base_url())
    }

    /// 使用指定的 base_url 创建客户端（测试或经由网关访问时使用）
    pub fn new_with_base_url(cfg: &IdgConnectionConfig, base_url: String) -> AppResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut builder = Client::builder()
            .default_headers(headers)
            .user_agent(cfg.http_agent.as_str())
            .timeout(cfg.request_timeout())
            .danger_accept_invalid_certs(!cfg.validate_certs);
        if !cfg.use_proxy {
            builder = builder.no_proxy();
        }

        let http = builder
            .build()
            .map_err(|e| AppError::config(format!("创建HTTP客户端失败: {}", e)))?;

        Ok(Self {
            http,
            base_url,
            user: cfg.user.clone(),
            password: cfg.password.clone(),
        })
    }

    /// 设备返回的 href 可能是绝对地址，也可能是相对路径
    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let base = self.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{}/{}", base, path)
    }
}

#[async_trait::async_trait]
impl Transport for IdgClient {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&JsonValue>,
    ) -> AppResult<ActionResponse> {
        let url = self.url(path);
        debug!(%method, %url, "IDG 请求");

        let mut request = self
            .http
            .request(method, &url)
            .basic_auth(&self.user, Some(&self.password));
        if let Some(body) = body {
            request = request.json(body);
        }

        let resp = request.send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        debug!(%status, len = text.len(), "IDG 响应");
        if text.len() < 1000 {
            debug!("IDG 响应内容: {}", text);
        } else {
            debug!(
                "IDG 响应内容（前500字符）: {}...",
                text.chars().take(500).collect::<String>()
            );
        }

        let body = if text.trim().is_empty() {
            JsonValue::Null
        } else {
            serde_json::from_str(&text).unwrap_or(JsonValue::String(text))
        };

        Ok(ActionResponse {
            http_status: status.as_u16(),
            http_reason: status.canonical_reason().unwrap_or("").to_string(),
            body,
        })
    }
}
