use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;
use tracing::level_filters::LevelFilter;

use crate::error::{Result, SearxngMcpError};
use crate::model::SafeSearch;

const DEFAULT_LOG_FILE: &str = "searxng-mcp.log";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_LOG_TO_STDERR: bool = true;
const DEFAULT_LOG_TRUNCATE: bool = true;
const DEFAULT_LOG_MAX_AGE_HOURS: f64 = 24.0;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// 日志配置，启动时读取一次，之后不再变更。
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub log_dir: Option<PathBuf>,
    pub log_file: PathBuf,
    pub log_level: LevelFilter,
    pub log_to_stderr: bool,
    pub log_truncate: bool,
    pub log_max_age_hours: f64,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            log_dir: None,
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            log_level: LevelFilter::INFO,
            log_to_stderr: DEFAULT_LOG_TO_STDERR,
            log_truncate: DEFAULT_LOG_TRUNCATE,
            log_max_age_hours: DEFAULT_LOG_MAX_AGE_HOURS,
        }
    }
}

impl LoggerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let level = get("LOG_LEVEL").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

        Ok(Self {
            log_dir: get("LOG_DIR").map(PathBuf::from),
            log_file: get("LOG_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE)),
            log_level: parse_level(&level)?,
            log_to_stderr: parse_bool(get("LOG_TO_STDERR").as_deref(), DEFAULT_LOG_TO_STDERR),
            log_truncate: parse_bool(get("LOG_TRUNCATE").as_deref(), DEFAULT_LOG_TRUNCATE),
            log_max_age_hours: parse_number(
                get("LOG_MAX_AGE_HOURS").as_deref(),
                DEFAULT_LOG_MAX_AGE_HOURS,
            ),
        })
    }

    /// Retention window in milliseconds, or `None` when truncation should not run.
    pub fn max_age_ms(&self) -> Option<f64> {
        if self.log_truncate && self.log_max_age_hours > 0.0 {
            Some(self.log_max_age_hours * 60.0 * 60.0 * 1000.0)
        } else {
            None
        }
    }
}

/// 服务配置：SearXNG 地址及搜索默认值。
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub base_url: Url,
    pub default_safesearch: Option<SafeSearch>,
    pub max_results: Option<usize>,
    pub timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let raw = get("SEARXNG_URL")
            .ok_or_else(|| SearxngMcpError::ConfigError("SEARXNG_URL is required".to_string()))?;
        let normalized = raw.trim_end_matches('/');
        let base_url = Url::parse(normalized).map_err(|e| {
            SearxngMcpError::ConfigError(format!("SEARXNG_URL is not a valid URL: {e}"))
        })?;

        let default_safesearch = match get("SEARXNG_SAFESEARCH") {
            Some(v) => Some(SafeSearch::parse(v.trim()).ok_or_else(|| {
                SearxngMcpError::ConfigError(format!(
                    "SEARXNG_SAFESEARCH must be 0, 1 or 2, got {v:?}"
                ))
            })?),
            None => None,
        };

        let max_results = match get("SEARXNG_MAX_RESULTS") {
            Some(v) => match v.trim().parse::<usize>() {
                Ok(n) if n > 0 => Some(n),
                _ => {
                    return Err(SearxngMcpError::ConfigError(format!(
                        "SEARXNG_MAX_RESULTS must be a positive integer, got {v:?}"
                    )))
                }
            },
            None => None,
        };

        let timeout_secs =
            parse_number(get("SEARXNG_TIMEOUT_SECS").as_deref(), DEFAULT_TIMEOUT_SECS as f64);
        let timeout = Duration::try_from_secs_f64(timeout_secs)
            .ok()
            .filter(|t| !t.is_zero())
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));

        Ok(Self {
            base_url,
            default_safesearch,
            max_results,
            timeout,
        })
    }
}

pub fn parse_bool(value: Option<&str>, fallback: bool) -> bool {
    let Some(value) = value else {
        return fallback;
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => fallback,
    }
}

pub fn parse_number(value: Option<&str>, fallback: f64) -> f64 {
    value
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|n| n.is_finite())
        .unwrap_or(fallback)
}

/// Accepts tracing level names plus `fatal` and `silent`.
pub fn parse_level(value: &str) -> Result<LevelFilter> {
    match value.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok(LevelFilter::TRACE),
        "debug" => Ok(LevelFilter::DEBUG),
        "info" => Ok(LevelFilter::INFO),
        "warn" | "warning" => Ok(LevelFilter::WARN),
        "error" | "fatal" => Ok(LevelFilter::ERROR),
        "silent" | "off" => Ok(LevelFilter::OFF),
        other => Err(SearxngMcpError::ConfigError(format!(
            "unknown LOG_LEVEL: {other}"
        ))),
    }
}
