use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::coordinator::StreamOrder;
use crate::http::{HttpOptions, DEFAULT_REFERER, DEFAULT_USER_AGENT};
use crate::merger::TempPolicy;
use crate::planner::{ChunkPlanner, DEFAULT_MIN_CHUNK_BYTES, DEFAULT_TARGET_CHUNKS};
use crate::retry::RetryPolicy;

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per chunk (including the first).
    pub max_attempts: u32,
    /// Timeout of the first attempt in seconds; attempt n gets n times this.
    pub attempt_timeout_secs: u64,
    /// Backoff unit in seconds; the wait after attempt n is n times this.
    pub backoff_step_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            attempt_timeout_secs: 30,
            backoff_step_secs: 2.0,
            max_delay_secs: 30,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(c: &RetryConfig) -> Self {
        RetryPolicy {
            max_attempts: c.max_attempts.max(1),
            attempt_timeout: Duration::from_secs(c.attempt_timeout_secs.max(1)),
            backoff_step: Duration::from_secs_f64(c.backoff_step_secs.max(0.0)),
            max_delay: Duration::from_secs(c.max_delay_secs),
        }
    }
}

/// Chunk layout parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Number of chunks a large resource is split into.
    pub target_chunks: u64,
    /// Lower bound on chunk size in bytes.
    pub min_chunk_bytes: u64,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            target_chunks: DEFAULT_TARGET_CHUNKS,
            min_chunk_bytes: DEFAULT_MIN_CHUNK_BYTES,
        }
    }
}

impl ChunkingConfig {
    pub fn planner(&self) -> ChunkPlanner {
        ChunkPlanner::new(self.target_chunks, self.min_chunk_bytes)
    }
}

/// Request headers and transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub user_agent: String,
    pub referer: String,
    pub connect_timeout_secs: u64,
    /// Limit for HEAD probes and API lookups.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Optional libcurl receive buffer size in bytes.
    #[serde(default)]
    pub buffer_size: Option<usize>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            referer: DEFAULT_REFERER.to_string(),
            connect_timeout_secs: 15,
            request_timeout_secs: default_request_timeout_secs(),
            buffer_size: None,
        }
    }
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl HttpConfig {
    pub fn options(&self) -> HttpOptions {
        HttpOptions {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs.max(1)),
            request_timeout: Duration::from_secs(self.request_timeout_secs.max(1)),
            buffer_size: self.buffer_size,
        }
    }
}

/// Multiplexer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfig {
    /// ffmpeg program name or path.
    pub ffmpeg: PathBuf,
    /// Keep the elementary files when the merge fails (default: remove them).
    pub keep_temp_on_failure: bool,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            keep_temp_on_failure: false,
        }
    }
}

impl MergeConfig {
    pub fn temp_policy(&self) -> TempPolicy {
        if self.keep_temp_on_failure {
            TempPolicy::Preserve
        } else {
            TempPolicy::Purge
        }
    }
}

/// Global configuration loaded from `~/.config/streamjoin/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamjoinConfig {
    /// Maximum concurrent ranged GETs per stream.
    pub max_concurrent_fetches: usize,
    /// Whether audio is fetched before video or both at once.
    #[serde(default)]
    pub order: StreamOrder,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub merge: MergeConfig,
}

impl Default for StreamjoinConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: 8,
            order: StreamOrder::default(),
            chunking: ChunkingConfig::default(),
            retry: None,
            http: HttpConfig::default(),
            merge: MergeConfig::default(),
        }
    }
}

impl StreamjoinConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
            .as_ref()
            .map(RetryPolicy::from)
            .unwrap_or_default()
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("streamjoin")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<StreamjoinConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = StreamjoinConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: StreamjoinConfig = toml::from_str(&data)?;
    Ok(cfg)
}
