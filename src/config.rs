use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub mod idg;

pub use idg::{IdgConnectionConfig, PollingConfig};

/// 应用程序配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub connection: IdgConnectionConfig,
    pub polling: PollingConfig,
    pub messages: MessageConfig,
    pub classifier: ClassifierConfig,
}

/// 错误分类器配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// 在内置提示语之外补充的"已处于期望状态"提示语
    pub extra_conditions: Vec<IdempotentCondition>,
}

/// 某个操作的幂等提示语，`{name}` 会被替换为操作目标
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdempotentCondition {
    pub action: String,
    pub template: String,
}

/// 返回给调用方的固定提示语
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageConfig {
    /// 设备已处于期望状态、未做任何修改时的提示
    pub immutable: String,
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self {
            immutable: "资源已处于期望状态，未做任何修改".to_string(),
        }
    }
}

impl Config {
    /// 从配置文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| AppError::config(format!("解析配置文件失败: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// 验证配置有效性
    pub fn validate(&self) -> AppResult<()> {
        if let Err(e) = self.connection.validate() {
            return Err(AppError::config(format!("连接配置无效: {}", e)));
        }

        if let Err(e) = self.polling.validate() {
            return Err(AppError::config(format!("轮询配置无效: {}", e)));
        }

        if self.messages.immutable.trim().is_empty() {
            return Err(AppError::config("messages.immutable 不能为空"));
        }

        for condition in &self.classifier.extra_conditions {
            if condition.action.trim().is_empty() || condition.template.trim().is_empty() {
                return Err(AppError::config(
                    "classifier.extra_conditions 的 action 与 template 不能为空",
                ));
            }
        }

        Ok(())
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> AppResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::config(format!("序列化配置失败: {}", e)))?;

        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.connection.server_port, 5554);
        assert_eq!(config.polling.timeout_secs, 300);
        assert!(!config.messages.immutable.is_empty());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.connection.server_port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load_config() {
        let mut original_config = Config::default();
        original_config.connection.server = "idghost".to_string();
        original_config.polling.interval_ms = 500;
        let temp_file = NamedTempFile::new().unwrap();

        original_config.save_to_file(temp_file.path()).unwrap();

        let loaded_config = Config::from_file(temp_file.path()).unwrap();

        assert_eq!(loaded_config.connection.server, "idghost");
        assert_eq!(loaded_config.polling.interval_ms, 500);
        assert_eq!(
            original_config.messages.immutable,
            loaded_config.messages.immutable
        );
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            "[connection]\nserver = \"idg01\"\n\n[polling]\ntimeout_secs = 900\n"
        )
        .unwrap();

        let config = Config::from_file(temp_file.path()).unwrap();
        assert_eq!(config.connection.server, "idg01");
        assert_eq!(config.connection.server_port, 5554);
        assert_eq!(config.polling.timeout_secs, 900);
        assert_eq!(config.polling.interval_ms, 2000);
    }

    #[test]
    fn test_extra_conditions_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            "[[classifier.extra_conditions]]\naction = \"SaveCheckpoint\"\ntemplate = \"Checkpoint '{{name}}' exists\"\n"
        )
        .unwrap();

        let config = Config::from_file(temp_file.path()).unwrap();
        assert_eq!(config.classifier.extra_conditions.len(), 1);
        assert_eq!(
            config.classifier.extra_conditions[0].template,
            "Checkpoint '{name}' exists"
        );
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "[polling]\ninterval_ms = 0\n").unwrap();

        let err = Config::from_file(temp_file.path()).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
