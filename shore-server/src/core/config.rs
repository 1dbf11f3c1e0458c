use std::path::{Path, PathBuf};

/// 服务器配置 - 所有配置项
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | DATA_DIR | ./data | 订单快照等数据文件目录 |
/// | PORT / HTTP_PORT | 5000 | HTTP 服务端口（托管平台注入 PORT 优先） |
/// | ENVIRONMENT | development | 运行环境 |
/// | ALLOWED_ORIGINS | (空 = 全放行) | 逗号分隔的 CORS 来源白名单 |
///
/// # 示例
///
/// ```ignore
/// DATA_DIR=/data/shore PORT=8080 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 数据目录，存放 orders.json 快照
    pub data_dir: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// 运行环境: development | staging | production
    pub environment: String,
    /// CORS 来源白名单（空表示允许任意来源）
    pub allowed_origins: Vec<String>,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        let port_var = std::env::var("PORT").or_else(|_| std::env::var("HTTP_PORT"));
        Self {
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".into()),
            http_port: port_var.ok().and_then(|p| p.parse().ok()).unwrap_or(5000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            allowed_origins: std::env::var("ALLOWED_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        }
    }

    /// 使用自定义值覆盖部分配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(data_dir: impl Into<String>, http_port: u16) -> Self {
        let mut config = Self::from_env();
        config.data_dir = data_dir.into();
        config.http_port = http_port;
        config
    }

    /// 订单快照文件路径
    pub fn orders_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join("orders.json")
    }

    /// 确保数据目录存在
    pub fn ensure_data_dir(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.data_dir)
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 是否开发环境
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
