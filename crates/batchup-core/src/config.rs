use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// libcurl transfer limits (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurlConfig {
    /// Seconds allowed for the TCP/TLS connect phase.
    pub connect_timeout_secs: u64,
    /// Abort when throughput stays below this many bytes/sec...
    pub low_speed_limit: u32,
    /// ...for this many seconds. Catches transfers that stall without erroring.
    pub low_speed_time_secs: u64,
    /// Hard wall-clock limit for a single upload.
    pub timeout_secs: u64,
    /// Optional send cap in bytes per second per transfer (None = no cap).
    #[serde(default)]
    pub max_send_speed: Option<u64>,
}

impl Default for CurlConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 30,
            low_speed_limit: 1024,
            low_speed_time_secs: 60,
            timeout_secs: 3600,
            max_send_speed: None,
        }
    }
}

/// Global configuration loaded from `~/.config/batchup/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploaderConfig {
    /// Maximum number of uploads in flight at once.
    pub concurrency: usize,
    /// Base URL of the upload server.
    pub server_url: String,
    /// Path of the upload endpoint, joined onto `server_url`.
    pub upload_path: String,
    /// Multipart form field carrying the file.
    pub field_name: String,
    /// Minimum spacing between speed samples, in milliseconds.
    pub speed_sample_ms: u64,
    /// Delay between a terminal outcome and the next admission pass, in milliseconds.
    pub reconcile_delay_ms: u64,
    #[serde(default)]
    pub curl: Option<CurlConfig>,
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self {
            concurrency: 3,
            server_url: "http://127.0.0.1:5150".to_string(),
            upload_path: "/api/upload".to_string(),
            field_name: "file".to_string(),
            speed_sample_ms: 500,
            reconcile_delay_ms: 100,
            curl: None,
        }
    }
}

impl UploaderConfig {
    /// Full endpoint URL (`server_url` joined with `upload_path`).
    pub fn endpoint(&self) -> Result<url::Url> {
        let base = url::Url::parse(&self.server_url)
            .with_context(|| format!("invalid server_url {:?}", self.server_url))?;
        base.join(&self.upload_path)
            .with_context(|| format!("invalid upload_path {:?}", self.upload_path))
    }

    /// Concurrency limit, never below one.
    pub fn concurrency_limit(&self) -> usize {
        self.concurrency.max(1)
    }

    pub fn speed_sample_interval(&self) -> Duration {
        Duration::from_millis(self.speed_sample_ms)
    }

    pub fn reconcile_delay(&self) -> Duration {
        Duration::from_millis(self.reconcile_delay_ms)
    }

    pub fn curl_or_default(&self) -> CurlConfig {
        self.curl.clone().unwrap_or_default()
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("batchup")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<UploaderConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = UploaderConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)
        .with_context(|| format!("read config {}", path.display()))?;
    let cfg: UploaderConfig = toml::from_str(&data)
        .with_context(|| format!("parse config {}", path.display()))?;
    Ok(cfg)
}
