//! 配置系统
//! 从环境变量加载所有配置，使用 Secret 包装敏感信息

use axum::http::HeaderName;
use config::{Config, ConfigError, Environment};
use secrecy::Secret;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 监听地址，例如 "0.0.0.0:3000"
    pub addr: String,
    /// 优雅关闭超时时间（秒）
    pub graceful_shutdown_timeout_secs: u64,
}

/// 存储后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// 进程内存储，重启丢失
    Memory,
    /// PostgreSQL
    Postgres,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// 数据库连接 URL（使用 Secret 包装，防止日志泄露）
    pub url: Option<Secret<String>>,
    /// 最大连接数
    pub max_connections: u32,
    /// 最小连接数
    pub min_connections: u32,
    /// 获取连接超时时间（秒）
    pub acquire_timeout_secs: u64,
    /// 空闲连接超时时间（秒）
    pub idle_timeout_secs: u64,
    /// 连接最大生命周期（秒）
    pub max_lifetime_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别: trace, debug, info, warn, error
    pub level: String,
    /// 日志格式: json, pretty
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TenancyConfig {
    /// 租户请求头名称
    pub header: String,
    /// 创建和上传请求未携带租户头时使用的租户
    pub default_tenant: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// 上传请求体上限（字节）
    pub max_bytes: usize,
    /// 单个文件最多导入的行数
    pub max_rows: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub tenancy: TenancyConfig,
    pub upload: UploadConfig,
}

impl AppConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut settings = Config::builder();

        // 添加默认配置
        settings = settings
            .set_default("server.addr", "0.0.0.0:3000")?
            .set_default("server.graceful_shutdown_timeout_secs", 30)?
            .set_default("store.backend", "memory")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.acquire_timeout_secs", 30)?
            .set_default("database.idle_timeout_secs", 600)?
            .set_default("database.max_lifetime_secs", 1800)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "json")?
            .set_default("tenancy.header", "powerpayTenantId")?
            .set_default("tenancy.default_tenant", "default")?
            .set_default("upload.max_bytes", 5 * 1024 * 1024)?
            .set_default("upload.max_rows", 10_000)?;

        // 从环境变量加载配置（前缀为 RBAC_）
        settings = settings.add_source(
            Environment::with_prefix("RBAC")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = settings.build()?.try_deserialize()?;

        // 验证配置
        config.validate()?;

        Ok(config)
    }

    /// 验证配置合法性
    pub fn validate(&self) -> Result<(), ConfigError> {
        // 验证端口范围
        if let Some(port_str) = self.server.addr.split(':').next_back() {
            if let Ok(port) = port_str.parse::<u16>() {
                // 0 表示随机端口
                if port != 0 && port < 1024 {
                    return Err(ConfigError::Message("Server port should be >= 1024".to_string()));
                }
            }
        }

        // 验证日志级别
        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                    self.logging.level
                )))
            }
        }

        // 验证日志格式
        match self.logging.format.to_lowercase().as_str() {
            "json" | "pretty" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid log format: {}. Must be one of: json, pretty",
                    self.logging.format
                )))
            }
        }

        // 验证数据库连接池配置
        if self.database.max_connections < self.database.min_connections {
            return Err(ConfigError::Message(
                "max_connections must be >= min_connections".to_string(),
            ));
        }

        if self.store.backend == StoreBackend::Postgres && self.database.url.is_none() {
            return Err(ConfigError::Message(
                "database.url is required when store.backend is postgres".to_string(),
            ));
        }

        // 验证租户配置
        if HeaderName::from_bytes(self.tenancy.header.as_bytes()).is_err() {
            return Err(ConfigError::Message(format!(
                "Invalid tenant header name: {:?}",
                self.tenancy.header
            )));
        }

        if self.tenancy.default_tenant.trim().is_empty() {
            return Err(ConfigError::Message("tenancy.default_tenant must not be empty".to_string()));
        }

        // 验证上传限制
        if self.upload.max_rows < 1 {
            return Err(ConfigError::Message("upload.max_rows must be >= 1".to_string()));
        }

        if self.upload.max_bytes < 1024 {
            return Err(ConfigError::Message("upload.max_bytes must be >= 1024".to_string()));
        }

        Ok(())
    }
}
