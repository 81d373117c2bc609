use std::path::PathBuf;
use std::time::Duration;

/// 账本服务配置
///
/// # 环境变量
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | /var/lib/loyalty | 工作目录 (数据库、日志) |
/// | DATABASE_PATH | {WORK_DIR}/loyalty.db | SQLite 数据库文件 |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_JSON | production 时为 true | JSON 日志输出 |
/// | LOG_RETENTION_DAYS | 14 | 应用日志保留天数 |
/// | ENVIRONMENT | development | 运行环境 |
/// | EXPIRY_SWEEP_INTERVAL_SECS | 3600 | 奖励过期扫描间隔 (秒) |
/// | SHUTDOWN_TIMEOUT_MS | 10000 | 关闭超时 (毫秒) |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/loyalty EXPIRY_SWEEP_INTERVAL_SECS=600 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录
    pub work_dir: String,
    /// SQLite 数据库路径
    pub database_path: String,
    pub log_level: String,
    pub log_json: bool,
    pub log_retention_days: i64,
    /// 运行环境: development | staging | production
    pub environment: String,
    /// 过期扫描间隔 (秒)，最小 1
    pub expiry_sweep_interval_secs: u64,
    /// 关闭超时时间 (毫秒)
    pub shutdown_timeout_ms: u64,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 未设置或无法解析的值使用默认值
    pub fn from_env() -> Self {
        let work_dir = std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/loyalty".into());
        let environment =
            std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());
        let database_path = std::env::var("DATABASE_PATH").unwrap_or_else(|_| {
            PathBuf::from(&work_dir)
                .join("loyalty.db")
                .to_string_lossy()
                .into_owned()
        });
        let log_json = std::env::var("LOG_JSON")
            .ok()
            .and_then(|v| parse_bool(&v))
            .unwrap_or(environment == "production");

        Self {
            work_dir,
            database_path,
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_json,
            log_retention_days: env_parse("LOG_RETENTION_DAYS").unwrap_or(14),
            environment,
            expiry_sweep_interval_secs: env_parse::<u64>("EXPIRY_SWEEP_INTERVAL_SECS")
                .unwrap_or(3600)
                .max(1),
            shutdown_timeout_ms: env_parse("SHUTDOWN_TIMEOUT_MS").unwrap_or(10_000),
        }
    }

    /// Directory for rotating log files
    pub fn log_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("logs")
    }

    pub fn expiry_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.expiry_sweep_interval_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            work_dir: "/var/lib/loyalty".into(),
            database_path: "/var/lib/loyalty/loyalty.db".into(),
            log_level: "info".into(),
            log_json: false,
            log_retention_days: 14,
            environment: "development".into(),
            expiry_sweep_interval_secs: 3600,
            shutdown_timeout_ms: 10_000,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
