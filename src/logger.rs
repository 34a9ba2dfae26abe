//! Process logger: built once at startup and passed explicitly to whoever logs.

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::Dispatch;
use tracing_appender::non_blocking::WorkerGuard;

use crate::config::LoggerConfig;
use crate::error::{Result, SearxngMcpError};
use crate::log_path::{resolve_log_path, HostLogDir, LogDirProvider};
use crate::log_sink::{build_sinks, fan_out, SinkKind};
use crate::retention::{truncate_log_file, TruncateOutcome};

/// Cheap to clone; the sinks are flushed when the last clone is dropped.
#[derive(Clone)]
pub struct Logger {
    inner: Arc<LoggerInner>,
}

struct LoggerInner {
    dispatch: Dispatch,
    path: PathBuf,
    sinks: Vec<SinkKind>,
    _guards: Vec<WorkerGuard>,
}

impl Logger {
    /// Reads `LOG_*` from the environment and detects the default directory from the host.
    pub async fn init() -> Result<Self> {
        let config = LoggerConfig::from_env()?;
        Self::init_with(&config, &HostLogDir::detect()).await
    }

    pub async fn init_with(config: &LoggerConfig, provider: &dyn LogDirProvider) -> Result<Self> {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let path = resolve_log_path(config.log_dir.as_deref(), &config.log_file, &cwd, provider);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SearxngMcpError::LogDirError {
                    path: parent.to_path_buf(),
                    reason: e.to_string(),
                })?;
        }

        let retention = match config.max_age_ms() {
            Some(max_age_ms) => match truncate_log_file(&path, max_age_ms).await {
                Ok(outcome) => Some(outcome),
                Err(e) => {
                    // 结构化日志尚未就绪，只能直接写 stderr
                    eprintln!("Failed to truncate log file {}: {e}", path.display());
                    None
                }
            },
            None => None,
        };

        let sinks = build_sinks(&path, config.log_to_stderr);
        let kinds = sinks.iter().map(|s| s.kind.clone()).collect();
        let (dispatch, guards) = fan_out(sinks, config.log_level);

        let logger = Self {
            inner: Arc::new(LoggerInner {
                dispatch,
                path,
                sinks: kinds,
                _guards: guards,
            }),
        };

        if let Some(TruncateOutcome::Rewritten { kept, dropped }) = retention {
            logger.in_scope(|| {
                tracing::debug!(kept, dropped, max_age_hours = config.log_max_age_hours, "log retention applied")
            });
        }
        Ok(logger)
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub fn sinks(&self) -> &[SinkKind] {
        &self.inner.sinks
    }

    /// Runs `f` with this logger as the current dispatcher, so plain `tracing`
    /// macros inside it land in this logger's sinks.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.inner.dispatch, f)
    }

    pub fn debug(&self, msg: impl Display) {
        self.in_scope(|| tracing::debug!("{msg}"));
    }

    pub fn info(&self, msg: impl Display) {
        self.in_scope(|| tracing::info!("{msg}"));
    }

    pub fn warn(&self, msg: impl Display) {
        self.in_scope(|| tracing::warn!("{msg}"));
    }

    pub fn error(&self, msg: impl Display) {
        self.in_scope(|| tracing::error!("{msg}"));
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("path", &self.inner.path)
            .field("sinks", &self.inner.sinks)
            .finish()
    }
}
