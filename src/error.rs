use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearxngMcpError>;

#[derive(Debug, Error)]
pub enum SearxngMcpError {
    #[error("{0}")]
    ConfigError(String),

    #[error("无法创建日志目录: {path} - {reason}")]
    LogDirError { path: PathBuf, reason: String },

    #[error("{context} failed with status {status}")]
    RemoteStatus { context: &'static str, status: u16 },

    #[error("SearXNG request failed: {0}")]
    Transport(String),

    #[error("无效请求: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for SearxngMcpError {
    fn from(e: reqwest::Error) -> Self {
        SearxngMcpError::Transport(e.to_string())
    }
}
