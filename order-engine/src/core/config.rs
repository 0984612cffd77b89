use std::path::PathBuf;

use thiserror::Error;

use crate::auth::{JwtConfig, JwtError};

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error("JWT configuration error: {0}")]
    Jwt(#[from] JwtError),
}

/// 服务配置
///
/// # 环境变量
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | ./data | 工作目录 (数据库、日志) |
/// | HTTP_PORT | 3000 | HTTP 服务端口 |
/// | DB_FILE | orders.redb | 数据库文件名 (相对工作目录) |
/// | ENVIRONMENT | development | 运行环境 |
/// | NOTIFY_QUEUE_CAPACITY | 1024 | 通知队列容量 |
/// | AUDIT_QUEUE_CAPACITY | 1024 | 审计队列容量 |
/// | LOG_LEVEL | info | 日志级别 (RUST_LOG 优先) |
/// | LOG_DIR | - | 日志目录，存在时按天滚动写文件 |
/// | LOG_JSON | false | JSON 格式日志 |
/// | NOTIFY_WEBHOOK_URL | - | 外部通知 webhook，未设置时只写日志 |
/// | JWT_SECRET / JWT_ISSUER / JWT_AUDIENCE | - | 见 [`JwtConfig`] |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/orders HTTP_PORT=8080 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录
    pub work_dir: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// 数据库文件名
    pub db_file: String,
    /// JWT 认证配置
    pub jwt: JwtConfig,
    /// 运行环境: development | staging | production
    pub environment: String,
    pub notify_queue_capacity: usize,
    pub audit_queue_capacity: usize,
    pub log_level: String,
    pub log_dir: Option<String>,
    pub log_json: bool,
    pub notify_webhook_url: Option<String>,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        Err(_) => Ok(default),
    }
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = env_or("ENVIRONMENT", "development");
        let is_production = environment == "production";

        let notify_queue_capacity = env_parse("NOTIFY_QUEUE_CAPACITY", 1024usize)?;
        let audit_queue_capacity = env_parse("AUDIT_QUEUE_CAPACITY", 1024usize)?;
        // mpsc::channel panics on zero capacity
        if notify_queue_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                key: "NOTIFY_QUEUE_CAPACITY",
                value: "0".to_string(),
            });
        }
        if audit_queue_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                key: "AUDIT_QUEUE_CAPACITY",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            work_dir: env_or("WORK_DIR", "./data"),
            http_port: env_parse("HTTP_PORT", 3000u16)?,
            db_file: env_or("DB_FILE", "orders.redb"),
            jwt: JwtConfig::from_env(is_production)?,
            environment,
            notify_queue_capacity,
            audit_queue_capacity,
            log_level: env_or("LOG_LEVEL", "info"),
            log_dir: env_opt("LOG_DIR"),
            log_json: env_parse("LOG_JSON", false)?,
            notify_webhook_url: env_opt("NOTIFY_WEBHOOK_URL"),
        })
    }

    /// 使用自定义值覆盖部分配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16) -> Result<Self, ConfigError> {
        let mut config = Self::from_env()?;
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        Ok(config)
    }

    /// 数据库文件完整路径
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join(&self.db_file)
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_path_joins_work_dir() {
        let mut config = Config::with_overrides("/tmp/orders-test", 0).unwrap();
        config.db_file = "x.redb".to_string();
        assert_eq!(config.db_path(), PathBuf::from("/tmp/orders-test/x.redb"));
        assert_eq!(config.http_port, 0);
    }

    #[test]
    fn test_env_parse_reports_key() {
        // SAFETY: test-local variable name not read by any other test
        unsafe { std::env::set_var("ORDER_ENGINE_TEST_PORT", "not-a-port") };
        let err = env_parse::<u16>("ORDER_ENGINE_TEST_PORT", 1).unwrap_err();
        assert!(err.to_string().contains("ORDER_ENGINE_TEST_PORT"));
        assert_eq!(env_parse::<u16>("ORDER_ENGINE_TEST_UNSET", 7).unwrap(), 7);
    }
}
