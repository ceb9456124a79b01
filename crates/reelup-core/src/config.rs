use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Default multipart part size (10 MiB).
pub const DEFAULT_PART_SIZE_BYTES: u64 = 10 * 1024 * 1024;

/// What happens to parts already on the backend when a job is discarded.
///
/// Pause and failure always keep parts: the job checkpoint reuses them on resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartRetention {
    /// Leave uploaded parts in place on cancel/remove.
    Retain,
    /// Issue a best-effort abort-multipart call on cancel/remove.
    #[default]
    AbortOnDiscard,
}

/// Session issuer settings (`[session]` in config.toml).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Endpoint that issues bucket/path/credentials for a file.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Organisation sent with every session request.
    #[serde(default)]
    pub org: Option<String>,
    /// Bucket used when `reelup upload` is given none.
    #[serde(default)]
    pub bucket: Option<String>,
    /// Bearer token for the session and status endpoints.
    #[serde(default)]
    pub auth_token: Option<String>,
}

/// Status side channel settings (`[status]` in config.toml).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusConfig {
    #[serde(default)]
    pub endpoint: Option<String>,
}

/// Object storage settings (`[storage]` in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Custom S3-compatible endpoint (None = AWS).
    #[serde(default)]
    pub endpoint: Option<String>,
    pub region: String,
    #[serde(default)]
    pub force_path_style: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            region: "us-east-1".to_string(),
            force_path_style: false,
        }
    }
}

/// Global configuration loaded from `~/.config/reelup/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReelupConfig {
    /// Maximum number of jobs uploading at the same time.
    pub max_concurrent_uploads: usize,
    /// Multipart part size in bytes.
    pub part_size_bytes: u64,
    /// Maximum parts in flight per job.
    pub part_concurrency: usize,
    /// Part cleanup policy for cancelled/removed jobs.
    #[serde(default)]
    pub part_retention: PartRetention,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub status: StatusConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Default for ReelupConfig {
    fn default() -> Self {
        Self {
            max_concurrent_uploads: 3,
            part_size_bytes: DEFAULT_PART_SIZE_BYTES,
            part_concurrency: 4,
            part_retention: PartRetention::default(),
            session: SessionConfig::default(),
            status: StatusConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl ReelupConfig {
    /// Upload budget, never below one.
    pub fn effective_max_concurrent(&self) -> usize {
        self.max_concurrent_uploads.max(1)
    }

    pub fn effective_part_size(&self) -> u64 {
        self.part_size_bytes.max(1)
    }

    pub fn effective_part_concurrency(&self) -> usize {
        self.part_concurrency.max(1)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("reelup")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<ReelupConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = ReelupConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: ReelupConfig = toml::from_str(&data)?;
    Ok(cfg)
}
