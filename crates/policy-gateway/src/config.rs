use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default = "default_policy_file")]
    pub policy_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            detector: DetectorConfig::default(),
            policy_file: default_policy_file(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// `null` disables the audit trail.
    #[serde(default = "default_audit_path")]
    pub audit_log_path: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            audit_log_path: default_audit_path(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DetectorConfig {
    #[serde(default = "default_detector_url")]
    pub url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl DetectorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            url: default_detector_url(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default-value functions used by serde
// ---------------------------------------------------------------------------

fn default_policy_file() -> PathBuf {
    PathBuf::from("policy.yaml")
}

fn default_listen() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_audit_path() -> Option<PathBuf> {
    Some(PathBuf::from("audit.jsonl"))
}

fn default_detector_url() -> String {
    "http://127.0.0.1:5002".to_string()
}

fn default_timeout_ms() -> u64 {
    5000
}

// ---------------------------------------------------------------------------
// Loader
// ---------------------------------------------------------------------------

/// Load configuration from a YAML file, falling back to defaults when the
/// file does not exist.
pub fn load(path: &Path) -> anyhow::Result<Config> {
    if !path.exists() {
        warn!(
            path = %path.display(),
            "configuration file not found; using defaults"
        );
        return Ok(Config::default());
    }

    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

    let config: Config = serde_yml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("failed to parse config file {}: {e}", path.display()))?;

    if config.detector.timeout_ms == 0 {
        anyhow::bail!("detector.timeout_ms must be greater than zero");
    }

    Ok(config)
}
