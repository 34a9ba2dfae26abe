use std::env;
use std::path::{Path, PathBuf};

/// Script hosts whose own install directory is never a sensible log location.
const SCRIPT_HOSTS: &[&str] = &["bun", "node", "deno"];

/// Supplies the directory used when no `LOG_DIR` override is configured.
pub trait LogDirProvider: Send + Sync {
    fn default_log_dir(&self) -> PathBuf;
}

/// A fixed directory, mostly for tests and embedding.
#[derive(Debug, Clone)]
pub struct FixedLogDir(pub PathBuf);

impl LogDirProvider for FixedLogDir {
    fn default_log_dir(&self) -> PathBuf {
        self.0.clone()
    }
}

/// Host facts captured once at startup.
#[derive(Debug, Clone)]
pub struct HostLogDir {
    pub executable: Option<PathBuf>,
    pub entry_script: Option<PathBuf>,
    pub cwd: PathBuf,
}

impl HostLogDir {
    pub fn detect() -> Self {
        Self {
            executable: env::current_exe().ok(),
            entry_script: env::args_os().nth(1).map(PathBuf::from),
            cwd: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    fn launched_by_script_host(&self) -> bool {
        self.executable
            .as_deref()
            .and_then(Path::file_stem)
            .and_then(|s| s.to_str())
            .map(|stem| SCRIPT_HOSTS.iter().any(|h| stem.eq_ignore_ascii_case(h)))
            .unwrap_or(false)
    }
}

impl LogDirProvider for HostLogDir {
    fn default_log_dir(&self) -> PathBuf {
        if self.launched_by_script_host() {
            return self
                .entry_script
                .as_deref()
                .and_then(Path::parent)
                .filter(|p| !p.as_os_str().is_empty())
                .map(|p| absolutize(p, &self.cwd))
                .unwrap_or_else(|| self.cwd.clone());
        }

        self.executable
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.cwd.clone())
    }
}

/// Resolves the log file location.
///
/// An absolute `file_name` wins over everything; otherwise it is joined onto the
/// override directory (made absolute against `cwd`) or the provider's default.
pub fn resolve_log_path(
    override_dir: Option<&Path>,
    file_name: &Path,
    cwd: &Path,
    provider: &dyn LogDirProvider,
) -> PathBuf {
    if file_name.is_absolute() {
        return file_name.to_path_buf();
    }

    let dir = match override_dir {
        Some(dir) => absolutize(dir, cwd),
        None => absolutize(&provider.default_log_dir(), cwd),
    };
    dir.join(file_name)
}

fn absolutize(path: &Path, cwd: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}
