//! 配置模块
//!
//! 支持从 JSON 文件加载系统配置

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,
    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,
    /// 工作线程数（0 表示使用 CPU 核心数）
    #[serde(default)]
    pub workers: usize,
}

/// 行情数据源配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// 请求超时时间（秒）
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// 连接超时时间（秒）
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// 日 K 线接口
    #[serde(default = "default_chart_url")]
    pub chart_url: String,
    /// 基本面接口
    #[serde(default = "default_summary_url")]
    pub summary_url: String,
    /// 代码搜索接口
    #[serde(default = "default_search_url")]
    pub search_url: String,
    /// 获取 cookie 的地址
    #[serde(default = "default_cookie_url")]
    pub cookie_url: String,
    /// 获取 crumb 的地址
    #[serde(default = "default_crumb_url")]
    pub crumb_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// 看板配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// 未指定区间时历史数据的起始日
    #[serde(default = "default_history_start")]
    pub history_start: NaiveDate,
    /// 默认选中的代码
    #[serde(default = "default_symbol")]
    pub default_symbol: String,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// 日志级别: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// 配置加载记录
#[derive(Debug, Default)]
pub struct LoadReport {
    /// 成功加载的文件，None 表示使用默认值
    pub source: Option<String>,
    /// 解析失败的文件及原因
    pub failures: Vec<(String, String)>,
}

impl LoadReport {
    pub fn log(&self) {
        for (path, error) in &self.failures {
            log::warn!("加载配置文件 {} 失败: {}", path, error);
        }
        match &self.source {
            Some(path) => log::info!("从 {} 加载配置成功", path),
            None => log::info!("使用默认配置"),
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// 服务器配置
    #[serde(default)]
    pub server: ServerConfig,
    /// 数据源配置
    #[serde(default)]
    pub provider: ProviderConfig,
    /// 看板配置
    #[serde(default)]
    pub dashboard: DashboardConfig,
    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

// 默认值函数
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_timeout() -> u64 { 15 }
fn default_connect_timeout() -> u64 { 5 }
fn default_chart_url() -> String { "https://query2.finance.yahoo.com/v8/finance/chart".to_string() }
fn default_summary_url() -> String { "https://query2.finance.yahoo.com/v10/finance/quoteSummary".to_string() }
fn default_search_url() -> String { "https://query2.finance.yahoo.com/v1/finance/search".to_string() }
fn default_cookie_url() -> String { "https://fc.yahoo.com".to_string() }
fn default_crumb_url() -> String { "https://query2.finance.yahoo.com/v1/test/getcrumb".to_string() }
fn default_user_agent() -> String { "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36".to_string() }
fn default_history_start() -> NaiveDate { NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default() }
fn default_symbol() -> String { "AAPL".to_string() }
fn default_log_level() -> String { "info".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: 0,
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            chart_url: default_chart_url(),
            summary_url: default_summary_url(),
            search_url: default_search_url(),
            cookie_url: default_cookie_url(),
            crumb_url: default_crumb_url(),
            user_agent: default_user_agent(),
        }
    }
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            history_start: default_history_start(),
            default_symbol: default_symbol(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl AppConfig {
    /// 从 JSON 文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// 加载配置，优先使用 DASHBOARD_CONFIG 指定的文件，其次默认路径，失败则使用默认值
    ///
    /// 日志级别来自配置本身，加载过程记录在 LoadReport 中，由调用方在日志初始化后输出
    pub fn load() -> (Self, LoadReport) {
        let explicit = env::var("DASHBOARD_CONFIG").ok();
        let config_paths = explicit
            .iter()
            .map(String::as_str)
            .chain(["config.json", "config/config.json"]);
        Self::load_from(config_paths)
    }

    /// 依次尝试给定路径，使用第一个能成功解析的文件
    pub fn load_from<'a>(paths: impl IntoIterator<Item = &'a str>) -> (Self, LoadReport) {
        let mut report = LoadReport::default();

        for path in paths {
            if !Path::new(path).exists() {
                continue;
            }
            match Self::from_file(path) {
                Ok(config) => {
                    report.source = Some(path.to_string());
                    return (config, report);
                }
                Err(e) => report.failures.push((path.to_string(), format!("{:#}", e))),
            }
        }

        (Self::default(), report)
    }

    /// 获取服务器绑定地址
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
