use serde::{Deserialize, Serialize};
use std::time::Duration;

/// IDG 管理接口连接配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdgConnectionConfig {
    /// 设备主机名或IP
    pub server: String,
    /// REST 管理接口端口
    pub server_port: u16,
    /// 基本认证用户名
    pub user: String,
    /// 基本认证密码
    pub password: String,
    /// 是否校验设备证书
    pub validate_certs: bool,
    /// 是否使用环境变量中的代理设置
    pub use_proxy: bool,
    /// 单次请求超时（秒），不是整个轮询的超时
    pub timeout_secs: u64,
    /// 客户端标识（User-Agent）
    pub http_agent: String,
}

impl Default for IdgConnectionConfig {
    fn default() -> Self {
        Self {
            server: "localhost".to_string(),
            server_port: 5554,
            user: "admin".to_string(),
            password: String::new(),
            validate_certs: true,
            use_proxy: true,
            timeout_secs: 15,
            http_agent: format!("idgctl/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl IdgConnectionConfig {
    /// 验证配置的有效性
    pub fn validate(&self) -> Result<(), String> {
        if self.server.trim().is_empty() {
            return Err("IDG server 不能为空".to_string());
        }

        if self.server.contains("://") {
            return Err("IDG server 只填写主机名，不要包含协议前缀".to_string());
        }

        if self.server_port == 0 {
            return Err("IDG 端口不能为0".to_string());
        }

        if self.user.is_empty() {
            return Err("IDG 用户名不能为空".to_string());
        }

        if self.timeout_secs == 0 {
            return Err("请求超时必须大于0".to_string());
        }

        Ok(())
    }

    /// 设备管理接口根地址
    pub fn base_url(&self) -> String {
        format!("https://{}:{}", self.server, self.server_port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// 异步操作轮询配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// 两次轮询之间的间隔（毫秒）
    pub interval_ms: u64,
    /// 整个轮询过程的超时（秒）
    pub timeout_secs: u64,
    /// 表示"仍在执行"的状态值，其余值一律视为终态
    pub in_progress_markers: Vec<String>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: 2000,
            timeout_secs: 300, // 大域的导入/导出可能需要数分钟
            in_progress_markers: vec![
                "pending".to_string(),
                "processing".to_string(),
                "in progress".to_string(),
            ],
        }
    }
}

impl PollingConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.interval_ms == 0 {
            return Err("轮询间隔必须大于0".to_string());
        }

        if self.timeout_secs == 0 {
            return Err("轮询超时必须大于0".to_string());
        }

        if self.interval_ms > self.timeout_secs.saturating_mul(1000) {
            return Err("轮询间隔不应大于轮询超时".to_string());
        }

        if self.in_progress_markers.iter().all(|m| m.trim().is_empty()) {
            return Err("至少需要一个进行中状态标记".to_string());
        }

        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// 判断设备返回的状态是否仍在执行中（忽略大小写）
    pub fn is_in_progress(&self, status: &str) -> bool {
        let status = status.trim();
        self.in_progress_markers
            .iter()
            .any(|m| m.trim().eq_ignore_ascii_case(status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_config_default() {
        let config = IdgConnectionConfig::default();
        assert_eq!(config.server_port, 5554);
        assert!(config.validate_certs);
        assert!(config.http_agent.starts_with("idgctl/"));
    }

    #[test]
    fn test_connection_config_validation() {
        let mut config = IdgConnectionConfig::default();
        assert!(config.validate().is_ok());

        config.server = "https://idghost".to_string();
        assert!(config.validate().is_err());

        config.server = "".to_string();
        assert!(config.validate().is_err());

        config.server = "idghost".to_string();
        config.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_base_url() {
        let config = IdgConnectionConfig {
            server: "idghost".to_string(),
            ..IdgConnectionConfig::default()
        };
        assert_eq!(config.base_url(), "https://idghost:5554");
    }

    #[test]
    fn test_in_progress_markers() {
        let config = PollingConfig::default();
        assert!(config.is_in_progress("pending"));
        assert!(config.is_in_progress("Processing"));
        assert!(config.is_in_progress(" in progress "));
        assert!(!config.is_in_progress("completed"));
        assert!(!config.is_in_progress("error"));
    }

    #[test]
    fn test_polling_config_validation() {
        let mut config = PollingConfig::default();
        assert!(config.validate().is_ok());

        config.interval_ms = 0;
        assert!(config.validate().is_err());

        config.interval_ms = 10_000;
        config.timeout_secs = 5;
        assert!(config.validate().is_err());

        config.timeout_secs = 60;
        config.in_progress_markers = vec![" ".to_string()];
        assert!(config.validate().is_err());
    }
}
