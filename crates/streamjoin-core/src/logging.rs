//! Logging init: append to a file under the XDG state dir, or stderr when
//! that is not possible. `RUST_LOG` overrides the default filter.

use anyhow::Result;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

const FILE_FILTER: &str = "info,streamjoin_core=debug,streamjoin=debug";
const STDERR_FILTER: &str = "warn";

/// Where log output ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    File(PathBuf),
    Stderr,
}

/// `~/.local/state/streamjoin/streamjoin.log`.
pub fn log_file_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("streamjoin")?;
    Ok(xdg_dirs.get_state_home().join("streamjoin.log"))
}

fn filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Installs the global subscriber. Never fails: if the log file cannot be
/// opened, output goes to stderr with a quieter filter.
pub fn init() -> LogTarget {
    match init_file() {
        Ok(path) => LogTarget::File(path),
        Err(e) => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter(STDERR_FILTER))
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .try_init();
            tracing::warn!("file logging unavailable, using stderr: {:#}", e);
            LogTarget::Stderr
        }
    }
}

fn init_file() -> Result<PathBuf> {
    let path = log_file_path()?;
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let file = fs::OpenOptions::new().create(true).append(true).open(&path)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter(FILE_FILTER))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    tracing::info!("streamjoin logging to {}", path.display());
    Ok(path)
}
